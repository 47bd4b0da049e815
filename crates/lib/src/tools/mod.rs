//! Generic tool runner.
//!
//! Locates an executable, spawns it with an argument list and fails when it
//! exits with a non-zero code. This is the only way build scripts run
//! external programs.

pub mod locator;
pub mod process;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tracing::error;

use crate::config::Settings;

pub use locator::ToolLocator;
pub use process::{ProcessOutput, ProcessSettings, run_process};

#[derive(Debug, Error)]
pub enum ToolError {
  #[error("could not locate executable '{0}'")]
  NotFound(String),

  #[error("failed to start '{tool}': {source}")]
  Spawn { tool: String, source: io::Error },

  #[error("'{tool}' timed out after {}s", after.as_secs_f64())]
  Timeout { tool: String, after: Duration },

  #[error("'{tool}' exited with code {code}")]
  NonZeroExit { tool: String, code: i32, stderr: String },

  #[error("'{tool}' was terminated by a signal")]
  Terminated { tool: String },

  #[error("failed to create process runtime: {0}")]
  Runtime(#[source] io::Error),
}

/// Runs external tools synchronously.
///
/// Owns a single-threaded tokio runtime so callers (the engine and script
/// callbacks) stay synchronous. Must not be used from inside another runtime.
pub struct ToolRunner {
  locator: ToolLocator,
  runtime: Runtime,
  working_dir: PathBuf,
  default_timeout: Option<Duration>,
}

impl ToolRunner {
  pub fn new(locator: ToolLocator, working_dir: impl Into<PathBuf>) -> Result<Self, ToolError> {
    let runtime = Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(ToolError::Runtime)?;
    Ok(Self {
      locator,
      runtime,
      working_dir: working_dir.into(),
      default_timeout: None,
    })
  }

  /// Build a runner from merged settings.
  pub fn from_settings(settings: &Settings, working_dir: impl Into<PathBuf>) -> Result<Self, ToolError> {
    let runner = Self::new(ToolLocator::new(&settings.tools), working_dir)?;
    Ok(runner.with_default_timeout(settings.process.timeout()))
  }

  pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.default_timeout = timeout;
    self
  }

  /// Locate `tool` and run it to completion.
  ///
  /// A relative `cwd` is resolved against the runner's working directory.
  pub fn run(&self, tool: &str, settings: &ProcessSettings) -> Result<ProcessOutput, ToolError> {
    let program = self.locator.locate(tool)?;

    let mut settings = settings.clone();
    settings.cwd = Some(match settings.cwd.take() {
      Some(cwd) if cwd.is_relative() => self.working_dir.join(cwd),
      Some(cwd) => cwd,
      None => self.working_dir.clone(),
    });
    if settings.timeout.is_none() {
      settings.timeout = self.default_timeout;
    }

    let output = self.runtime.block_on(run_process(&program, &settings))?;
    if settings.allow_failure {
      return Ok(output);
    }

    match output.code {
      Some(0) => Ok(output),
      Some(code) => {
        error!(tool, code, "tool failed");
        Err(ToolError::NonZeroExit {
          tool: tool.to_string(),
          code,
          stderr: output.stderr,
        })
      }
      None => Err(ToolError::Terminated { tool: tool.to_string() }),
    }
  }
}
