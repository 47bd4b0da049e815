//! The `fs` table: path manipulation and file system helpers.
//!
//! Relative paths given to the file helpers are resolved against the build's
//! working directory, not the process's current directory.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use mlua::prelude::*;
use tracing::debug;

/// Lexically normalize a path (resolve `.` and `..` without touching the file system).
pub fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::ParentDir => {
        let at_parent = matches!(normalized.components().next_back(), Some(Component::ParentDir) | None);
        if at_parent || !normalized.pop() {
          normalized.push("..");
        }
      }
      Component::CurDir => {}
      _ => normalized.push(component),
    }
  }
  normalized
}

/// Resolve `path` against `base` when it is relative.
pub fn resolve(base: &Path, path: &str) -> PathBuf {
  let path = Path::new(path);
  if path.is_absolute() {
    normalize(path)
  } else {
    normalize(&base.join(path))
  }
}

/// Delete everything inside `dir`, creating it when missing.
pub fn clean_dir(dir: &Path) -> io::Result<()> {
  if !dir.exists() {
    return fs::create_dir_all(dir);
  }
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if path.is_dir() {
      fs::remove_dir_all(&path)?;
    } else {
      fs::remove_file(&path)?;
    }
  }
  Ok(())
}

fn display(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

fn io_error(op: &str, path: &Path, err: io::Error) -> LuaError {
  LuaError::external(format!("{op} '{}': {err}", path.display()))
}

/// Create the `fs` table.
pub fn create_fs_helpers(lua: &Lua, working_dir: PathBuf) -> LuaResult<LuaTable> {
  let fs_table = lua.create_table()?;

  // fs.join(...) - Join multiple path segments
  fs_table.set(
    "join",
    lua.create_function(|_, segments: LuaMultiValue| {
      let mut result = PathBuf::new();
      for segment in segments {
        if let LuaValue::String(s) = segment {
          result.push(s.to_str()?.as_ref());
        }
      }
      Ok(display(&result))
    })?,
  )?;

  fs_table.set(
    "dirname",
    lua.create_function(|_, path: String| Ok(Path::new(&path).parent().map(display).unwrap_or_default()))?,
  )?;

  fs_table.set(
    "basename",
    lua.create_function(|_, path: String| {
      Ok(
        Path::new(&path)
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // fs.extname(path) - extension including the dot
  fs_table.set(
    "extname",
    lua.create_function(|_, path: String| {
      Ok(
        Path::new(&path)
          .extension()
          .map(|e| format!(".{}", e.to_string_lossy()))
          .unwrap_or_default(),
      )
    })?,
  )?;

  fs_table.set(
    "is_absolute",
    lua.create_function(|_, path: String| Ok(Path::new(&path).is_absolute()))?,
  )?;

  fs_table.set(
    "normalize",
    lua.create_function(|_, path: String| Ok(display(&normalize(Path::new(&path)))))?,
  )?;

  let base = working_dir.clone();
  fs_table.set(
    "absolute",
    lua.create_function(move |_, path: String| Ok(display(&resolve(&base, &path))))?,
  )?;

  let base = working_dir.clone();
  fs_table.set(
    "exists",
    lua.create_function(move |_, path: String| Ok(resolve(&base, &path).exists()))?,
  )?;

  let base = working_dir.clone();
  fs_table.set(
    "is_dir",
    lua.create_function(move |_, path: String| Ok(resolve(&base, &path).is_dir()))?,
  )?;

  // fs.mkdir(path) - create a directory and its parents
  let base = working_dir.clone();
  fs_table.set(
    "mkdir",
    lua.create_function(move |_, path: String| {
      let path = resolve(&base, &path);
      fs::create_dir_all(&path).map_err(|e| io_error("cannot create directory", &path, e))?;
      Ok(display(&path))
    })?,
  )?;

  // fs.remove(path) - remove a file or directory tree; returns false when nothing existed
  let base = working_dir.clone();
  fs_table.set(
    "remove",
    lua.create_function(move |_, path: String| {
      let path = resolve(&base, &path);
      let result = if path.is_dir() {
        fs::remove_dir_all(&path)
      } else {
        fs::remove_file(&path)
      };
      match result {
        Ok(()) => {
          debug!(path = %path.display(), "removed");
          Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error("cannot remove", &path, e)),
      }
    })?,
  )?;

  let base = working_dir.clone();
  fs_table.set(
    "clean_dir",
    lua.create_function(move |_, path: String| {
      let path = resolve(&base, &path);
      clean_dir(&path).map_err(|e| io_error("cannot clean directory", &path, e))?;
      debug!(path = %path.display(), "cleaned directory");
      Ok(display(&path))
    })?,
  )?;

  // fs.copy(src, dst) - copy a file; a directory destination receives the file by name
  let base = working_dir.clone();
  fs_table.set(
    "copy",
    lua.create_function(move |_, (src, dst): (String, String)| {
      let src = resolve(&base, &src);
      let mut dst = resolve(&base, &dst);
      if dst.is_dir() {
        if let Some(name) = src.file_name() {
          dst.push(name);
        }
      }
      fs::copy(&src, &dst).map_err(|e| io_error("cannot copy", &src, e))?;
      Ok(display(&dst))
    })?,
  )?;

  let base = working_dir.clone();
  fs_table.set(
    "read",
    lua.create_function(move |_, path: String| {
      let path = resolve(&base, &path);
      fs::read_to_string(&path).map_err(|e| io_error("cannot read", &path, e))
    })?,
  )?;

  // fs.write(path, content) - write a file, creating parent directories
  let base = working_dir.clone();
  fs_table.set(
    "write",
    lua.create_function(move |_, (path, content): (String, LuaString)| {
      let path = resolve(&base, &path);
      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("cannot create directory", parent, e))?;
      }
      fs::write(&path, &*content.as_bytes()).map_err(|e| io_error("cannot write", &path, e))?;
      Ok(display(&path))
    })?,
  )?;

  // fs.glob(pattern) - sorted list of matching paths
  let base = working_dir;
  fs_table.set(
    "glob",
    lua.create_function(move |lua, pattern: String| {
      let full = resolve(&base, &pattern);
      let entries = glob::glob(&full.to_string_lossy())
        .map_err(|e| LuaError::external(format!("invalid glob pattern '{pattern}': {e}")))?;

      let mut matches = Vec::new();
      for entry in entries {
        let path = entry.map_err(LuaError::external)?;
        matches.push(display(&path));
      }
      matches.sort();
      lua.create_sequence_from(matches)
    })?,
  )?;

  Ok(fs_table)
}
