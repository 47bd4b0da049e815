//! Implementation of the `mortar tasks` command.
//!
//! Evaluates the build script without running anything and lists the
//! registered tasks with their descriptions.

use std::path::Path;

use anyhow::{Context, Result, bail};
use owo_colors::{OwoColorize, Stream};

use mortar_lib::args::Arguments;
use mortar_lib::config::Settings;
use mortar_lib::host::{HostMode, HostOptions, ScriptHost};

use super::apply_target;
use crate::output::{OutputFormat, print_info, print_json};

/// Evaluate `script` in inspect mode; `run_target` only records the target.
///
/// `target` reaches the script the same way `mortar run --target` does.
pub(crate) fn inspect(script: &Path, target: Option<&str>, settings: Settings) -> Result<ScriptHost> {
  if !script.is_file() {
    bail!("build script not found: {}", script.display());
  }

  let mut arguments = Arguments::new();
  apply_target(&mut arguments, target, &settings);

  let host = ScriptHost::new(
    script,
    HostOptions {
      mode: HostMode::Inspect,
      arguments,
      settings,
      ..HostOptions::default()
    },
  )
  .context("Failed to prepare build script")?;

  host
    .run()
    .with_context(|| format!("Failed to evaluate build script: {}", script.display()))?;
  Ok(host)
}

pub fn cmd_tasks(script: &Path, output: OutputFormat, settings: Settings) -> Result<()> {
  let host = inspect(script, None, settings)?;
  let tasks = host.describe()?;

  if output.is_json() {
    return print_json(&tasks);
  }

  if tasks.is_empty() {
    print_info("No tasks registered.");
    return Ok(());
  }

  let width = tasks.iter().map(|t| t.name.len()).max().unwrap_or(0) + 2;
  println!("{:<width$}{}", "Task".bold(), "Description".bold(), width = width);
  println!("{}", "-".repeat(width + 40));
  for task in &tasks {
    println!(
      "{:<width$}{}",
      task.name,
      task
        .description
        .as_deref()
        .unwrap_or("")
        .if_supports_color(Stream::Stdout, |s| s.dimmed()),
      width = width
    );
  }

  Ok(())
}
