//! Implementation of the `mortar run` command.
//!
//! Runs a build script. The script registers tasks and calls `run_target`,
//! which executes the requested target and everything it depends on.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::debug;

use mortar_lib::args::Arguments;
use mortar_lib::config::Settings;
use mortar_lib::host::{HostMode, HostOptions, ScriptHost};

use super::apply_target;
use crate::output::{OutputFormat, print_info, print_json, print_report, print_success, print_warning};

pub struct RunOptions {
  pub script: PathBuf,
  pub target: Option<String>,
  pub dry_run: bool,
  pub exclusive: bool,
  /// Raw `KEY=VALUE` script arguments.
  pub arguments: Vec<String>,
  pub timeout: Option<Duration>,
  pub working_dir: Option<PathBuf>,
  pub output: OutputFormat,
}

/// Execute the run command.
///
/// `--target`, or else `script.default_target` from the settings, is handed to
/// the script as the `target` argument.
pub fn cmd_run(options: RunOptions, mut settings: Settings) -> Result<()> {
  if !options.script.is_file() {
    bail!("build script not found: {}", options.script.display());
  }

  let mut arguments = Arguments::parse(&options.arguments).context("Invalid script argument")?;
  apply_target(&mut arguments, options.target.as_deref(), &settings);

  if let Some(timeout) = options.timeout {
    // Sub-second timeouts round up so they never disable the limit.
    settings.process.timeout_secs = Some(timeout.as_secs_f64().ceil() as u64);
  }

  let mode = if options.dry_run { HostMode::DryRun } else { HostMode::Run };
  let json = options.output.is_json();

  if options.dry_run && !json {
    print_info("Performing dry run...");
    print_info("Tasks will not be executed.");
    println!();
  }

  debug!(script = %options.script.display(), arguments = arguments.len(), "starting run");

  let host = ScriptHost::new(
    &options.script,
    HostOptions {
      mode,
      arguments,
      exclusive: options.exclusive,
      settings,
      working_dir: options.working_dir,
    },
  )
  .context("Failed to prepare build script")?;

  let outcome = host
    .run()
    .with_context(|| format!("Build script failed: {}", options.script.display()))?;

  if json {
    return print_json(&outcome.reports);
  }

  if outcome.reports.is_empty() {
    print_warning("The build script did not call run_target; no tasks were run.");
  }

  for report in &outcome.reports {
    println!();
    print_report(report);
  }

  if options.dry_run {
    println!();
    print_info("This was a dry run. No tasks were actually executed.");
  } else {
    println!();
    print_success("Build succeeded.");
  }

  Ok(())
}
