//! Settings.
//!
//! Settings are merged in order: built-in defaults, then `mortar.toml` next to
//! the build script, then `MORTAR_*` environment variables. The CLI applies
//! its own flags last.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{CONFIG_FILE_NAME, ENV_PREFIX};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },

  #[error("invalid value '{value}' for {key}: {reason}")]
  InvalidValue { key: String, value: String, reason: String },
}

/// How much the build reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
  Quiet,
  Minimal,
  #[default]
  Normal,
  Verbose,
  Diagnostic,
}

impl Verbosity {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Quiet => "quiet",
      Self::Minimal => "minimal",
      Self::Normal => "normal",
      Self::Verbose => "verbose",
      Self::Diagnostic => "diagnostic",
    }
  }

  /// The `tracing` level directive this verbosity maps to.
  pub fn filter_directive(&self) -> &'static str {
    match self {
      Self::Quiet => "error",
      Self::Minimal => "warn",
      Self::Normal => "info",
      Self::Verbose => "debug",
      Self::Diagnostic => "trace",
    }
  }
}

impl fmt::Display for Verbosity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Verbosity {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "quiet" | "q" => Ok(Self::Quiet),
      "minimal" | "m" => Ok(Self::Minimal),
      "normal" | "n" => Ok(Self::Normal),
      "verbose" | "v" => Ok(Self::Verbose),
      "diagnostic" | "diag" | "d" => Ok(Self::Diagnostic),
      other => Err(format!("unknown verbosity '{other}'")),
    }
  }
}

/// Where the tool runner looks for executables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
  /// Extra directories searched before `PATH`.
  pub paths: Vec<PathBuf>,
  /// Explicit tool name -> executable path registrations.
  pub registered: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
  /// Default timeout for spawned tools; none when unset.
  pub timeout_secs: Option<u64>,
}

impl ProcessConfig {
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout_secs.map(Duration::from_secs)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
  /// Target used when none is given on the command line.
  pub default_target: Option<String>,
}

/// Merged settings for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub verbosity: Verbosity,
  pub tools: ToolSettings,
  pub process: ProcessConfig,
  pub script: ScriptSettings,
}

impl Settings {
  /// Load settings for a script living in `dir`.
  pub fn load(dir: &Path) -> Result<Self, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    let mut settings = if path.is_file() {
      Self::from_file(&path)?
    } else {
      Self::default()
    };
    settings.apply_env()?;
    Ok(settings)
  }

  /// Parse a settings file. Relative tool paths are resolved against its directory.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    if let Some(base) = path.parent() {
      settings.tools.resolve_relative(base);
    }

    debug!(path = %path.display(), "loaded settings file");
    Ok(settings)
  }

  /// Apply `MORTAR_*` environment overrides.
  ///
  /// - `MORTAR_VERBOSITY`
  /// - `MORTAR_TOOL_PATHS` (platform path-list syntax, prepended)
  /// - `MORTAR_TIMEOUT_SECS`
  /// - `MORTAR_DEFAULT_TARGET`
  pub fn apply_env(&mut self) -> Result<(), ConfigError> {
    if let Some(value) = env_var("VERBOSITY") {
      self.verbosity = value.parse().map_err(|reason| ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}VERBOSITY"),
        value: value.clone(),
        reason,
      })?;
    }

    if let Some(value) = env::var_os(format!("{ENV_PREFIX}TOOL_PATHS")) {
      let mut paths: Vec<PathBuf> = env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()).collect();
      paths.append(&mut self.tools.paths);
      self.tools.paths = paths;
    }

    if let Some(value) = env_var("TIMEOUT_SECS") {
      let secs = value.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}TIMEOUT_SECS"),
        value: value.clone(),
        reason: e.to_string(),
      })?;
      self.process.timeout_secs = Some(secs);
    }

    if let Some(value) = env_var("DEFAULT_TARGET") {
      self.script.default_target = Some(value);
    }

    Ok(())
  }
}

impl ToolSettings {
  fn resolve_relative(&mut self, base: &Path) {
    for path in &mut self.paths {
      if path.is_relative() {
        *path = base.join(&*path);
      }
    }
    for path in self.registered.values_mut() {
      if path.is_relative() {
        *path = base.join(&*path);
      }
    }
  }
}

fn env_var(key: &str) -> Option<String> {
  env::var(format!("{ENV_PREFIX}{key}")).ok().filter(|v| !v.is_empty())
}
