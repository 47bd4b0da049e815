//! Scaffold a new build directory.
//!
//! `mortar init` writes:
//! - `build.lua`, a starter script with a few tasks
//! - `.luarc.json` for LuaLS IDE integration
//! - `.mortar/types/globals.d.lua` with type definitions for the script globals

mod templates;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::consts::DEFAULT_SCRIPT;

pub use templates::{BUILD_LUA_TEMPLATE, GLOBALS_D_LUA, LUARC_JSON_TEMPLATE};

#[derive(Debug, Error)]
pub enum InitError {
  #[error("file already exists: {} (use --force to overwrite)", path.display())]
  PathExists { path: PathBuf },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },

  #[error("failed to canonicalize path {}: {source}", path.display())]
  Canonicalize { path: PathBuf, source: std::io::Error },
}

pub struct InitOptions {
  /// Directory to scaffold; created when missing
  pub dir: PathBuf,
  /// Overwrite existing files
  pub force: bool,
}

/// Paths written by [`init`].
#[derive(Debug)]
pub struct InitResult {
  pub dir: PathBuf,
  pub build_lua: PathBuf,
  pub luarc_json: PathBuf,
  pub types_dir: PathBuf,
}

fn write(path: &Path, content: &str) -> Result<(), InitError> {
  fs::write(path, content).map_err(|source| InitError::WriteFile {
    path: path.to_path_buf(),
    source,
  })
}

/// Write the starter files into `options.dir`.
///
/// # Errors
///
/// Fails when `build.lua` or `.luarc.json` already exist (unless forced), or
/// when a directory or file cannot be written.
pub fn init(options: &InitOptions) -> Result<InitResult, InitError> {
  fs::create_dir_all(&options.dir).map_err(|source| InitError::CreateDir {
    path: options.dir.clone(),
    source,
  })?;

  let dir = dunce::canonicalize(&options.dir).map_err(|source| InitError::Canonicalize {
    path: options.dir.clone(),
    source,
  })?;

  let build_lua = dir.join(DEFAULT_SCRIPT);
  let luarc_json = dir.join(".luarc.json");
  let types_dir = dir.join(".mortar").join("types");

  if !options.force {
    for path in [&build_lua, &luarc_json] {
      if path.exists() {
        return Err(InitError::PathExists { path: path.clone() });
      }
    }
  }

  fs::create_dir_all(&types_dir).map_err(|source| InitError::CreateDir {
    path: types_dir.clone(),
    source,
  })?;

  write(&build_lua, BUILD_LUA_TEMPLATE)?;

  // Forward slashes keep the JSON valid on Windows
  let types_path = types_dir.to_string_lossy().replace('\\', "/");
  write(&luarc_json, &LUARC_JSON_TEMPLATE.replace("{types_path}", &types_path))?;
  write(&types_dir.join("globals.d.lua"), GLOBALS_D_LUA)?;

  info!(dir = %dir.display(), "initialized build directory");

  Ok(InitResult {
    dir,
    build_lua,
    luarc_json,
    types_dir,
  })
}
