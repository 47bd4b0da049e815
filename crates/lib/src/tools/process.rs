//! Spawning external processes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::ToolError;

/// How a process is spawned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSettings {
  pub args: Vec<String>,
  /// Variables added to (or overriding) the inherited environment.
  pub env: BTreeMap<String, String>,
  pub cwd: Option<PathBuf>,
  /// Kill the process when it runs longer than this.
  pub timeout: Option<Duration>,
  /// Do not echo the process output to the log.
  pub silent: bool,
  /// Return the output of a failing process instead of an error.
  pub allow_failure: bool,
}

impl ProcessSettings {
  pub fn new<I, S>(args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      args: args.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
  /// Exit code; `None` when the process was terminated by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

/// Run `program` to completion and capture its output.
///
/// The exit code is not checked here; see [`ToolRunner::run`](super::ToolRunner::run).
pub async fn run_process(program: &Path, settings: &ProcessSettings) -> Result<ProcessOutput, ToolError> {
  let tool = program.display().to_string();
  info!(tool = %tool, args = ?settings.args, "executing");

  let mut command = Command::new(program);
  command
    .args(&settings.args)
    .envs(&settings.env)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  if let Some(ref dir) = settings.cwd {
    command.current_dir(dir);
  }

  debug!(tool = %tool, cwd = ?settings.cwd, "spawning process");

  let output = match settings.timeout {
    Some(duration) => timeout(duration, command.output())
      .await
      .map_err(|_| ToolError::Timeout {
        tool: tool.clone(),
        after: duration,
      })?,
    None => command.output().await,
  }
  .map_err(|source| ToolError::Spawn {
    tool: tool.clone(),
    source,
  })?;

  let result = ProcessOutput {
    code: output.status.code(),
    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
  };

  if !settings.silent {
    for line in result.stdout.lines() {
      info!("{line}");
    }
    for line in result.stderr.lines() {
      warn!("{line}");
    }
  }

  debug!(tool = %tool, code = ?result.code, "process exited");
  Ok(result)
}
