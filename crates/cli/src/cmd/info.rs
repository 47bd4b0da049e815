use anyhow::Result;
use serde::Serialize;

use mortar_lib::config::Settings;
use mortar_lib::platform::Platform;

use crate::output::{OutputFormat, print_json, print_stat};

#[derive(Serialize)]
struct Info {
  version: &'static str,
  platform: String,
  os: &'static str,
  arch: &'static str,
  verbosity: &'static str,
  tool_paths: Vec<String>,
}

pub fn cmd_info(output: OutputFormat, settings: &Settings) -> Result<()> {
  let platform = Platform::current();
  let info = Info {
    version: env!("CARGO_PKG_VERSION"),
    platform: platform.triple(),
    os: platform.os.as_str(),
    arch: platform.arch.as_str(),
    verbosity: settings.verbosity.as_str(),
    tool_paths: settings
      .tools
      .paths
      .iter()
      .map(|p| p.display().to_string())
      .collect(),
  };

  if output.is_json() {
    return print_json(&info);
  }

  println!("mortar {}", info.version);
  println!();
  print_stat("Platform", &info.platform);
  print_stat("OS", info.os);
  print_stat("Arch", info.arch);
  print_stat("Verbosity", info.verbosity);
  if !info.tool_paths.is_empty() {
    print_stat("Tool paths", &info.tool_paths.join(", "));
  }

  Ok(())
}
