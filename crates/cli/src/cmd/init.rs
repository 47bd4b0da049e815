//! Implementation of the `mortar init` command.
//!
//! Scaffolds a build directory with a starter `build.lua` and LuaLS type
//! definitions for the script globals.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use mortar_lib::init::{InitOptions, init};

use crate::output::symbols;

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if `build.lua` already exists (without `--force`) or if
/// there are permission issues.
pub fn cmd_init(path: &Path, force: bool) -> Result<()> {
  let options = InitOptions {
    dir: path.to_path_buf(),
    force,
  };

  let result = init(&options).context("Failed to initialize build directory")?;

  println!(
    "{} {}",
    symbols::SUCCESS.green(),
    "Initialized mortar build!".green().bold()
  );
  println!();
  println!("  {} Directory:        {}", symbols::INFO.cyan(), result.dir.display());
  println!(
    "  {} Build script:     {}",
    symbols::INFO.cyan(),
    result.build_lua.display()
  );
  println!(
    "  {} LuaLS config:     {}",
    symbols::INFO.cyan(),
    result.luarc_json.display()
  );
  println!(
    "  {} Type definitions: {}",
    symbols::INFO.cyan(),
    result.types_dir.display()
  );
  println!();
  println!("{}", "Next steps:".bold());
  println!(
    "  1. Edit {} to define your tasks",
    result.build_lua.display().to_string().cyan()
  );
  println!(
    "  2. Run: {}",
    format!("mortar run {}", result.build_lua.display()).cyan()
  );

  Ok(())
}
