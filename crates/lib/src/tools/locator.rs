//! Resolving tool names to executables.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::trace;

use super::ToolError;
use crate::config::ToolSettings;

/// Finds executables by name.
///
/// Lookup order: explicit registrations, configured tool directories, then
/// the directories on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
  /// Lowercased name -> executable.
  registered: BTreeMap<String, PathBuf>,
  paths: Vec<PathBuf>,
  search_path: Option<OsString>,
}

impl ToolLocator {
  pub fn new(settings: &ToolSettings) -> Self {
    let mut locator = Self {
      paths: settings.paths.clone(),
      ..Self::default()
    }
    .with_search_path(env::var_os("PATH"));
    for (name, path) in &settings.registered {
      locator.register(name, path.clone());
    }
    locator
  }

  /// Replace the `PATH` value searched last.
  pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
    self.search_path = search_path;
    self
  }

  pub fn register(&mut self, name: &str, path: PathBuf) {
    self.registered.insert(name.to_lowercase(), path);
  }

  pub fn locate(&self, tool: &str) -> Result<PathBuf, ToolError> {
    if tool.trim().is_empty() {
      return Err(ToolError::NotFound(tool.to_string()));
    }

    if let Some(path) = self.registered.get(&tool.to_lowercase()) {
      trace!(tool, path = %path.display(), "using registered tool");
      return Ok(path.clone());
    }

    let as_path = Path::new(tool);
    if as_path.components().count() > 1 || as_path.is_absolute() {
      return Ok(as_path.to_path_buf());
    }

    let search = self.search_path.iter().flat_map(|value| env::split_paths(value));
    for dir in self.paths.iter().cloned().chain(search) {
      for candidate in candidates(&dir, tool) {
        if is_executable(&candidate) {
          trace!(tool, path = %candidate.display(), "located tool");
          return Ok(candidate);
        }
      }
    }

    Err(ToolError::NotFound(tool.to_string()))
  }
}

#[cfg(windows)]
fn candidates(dir: &Path, tool: &str) -> Vec<PathBuf> {
  if Path::new(tool).extension().is_some() {
    return vec![dir.join(tool)];
  }
  let exts = env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
  exts
    .split(';')
    .filter(|ext| !ext.is_empty())
    .map(|ext| dir.join(format!("{tool}{ext}")))
    .collect()
}

#[cfg(not(windows))]
fn candidates(dir: &Path, tool: &str) -> Vec<PathBuf> {
  vec![dir.join(tool)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;

  path
    .metadata()
    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
  path.is_file()
}
