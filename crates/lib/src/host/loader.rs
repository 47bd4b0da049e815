//! Loading build scripts.
//!
//! Every script runs in its own environment table that exposes `__dir` (the
//! directory of the script) and falls through to the globals. The directory of
//! the script being loaded is tracked in the registry so `include` can resolve
//! relative paths against the including script.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use tracing::debug;

/// Registry key holding the directory of the script currently being loaded.
const CURRENT_DIR_KEY: &str = "__mortar_current_dir";

/// Canonical paths of every script loaded so far.
pub type LoadedScripts = Rc<RefCell<HashSet<PathBuf>>>;

fn canonicalize(path: &Path) -> LuaResult<PathBuf> {
  dunce::canonicalize(path).map_err(|e| LuaError::external(format!("cannot resolve '{}': {}", path.display(), e)))
}

/// Compile and run `source` as the script at `path`.
///
/// The chunk is named after `path` so errors point at the script.
pub fn exec_source(lua: &Lua, path: &Path, source: &str) -> LuaResult<()> {
  let dir = path.parent().unwrap_or(Path::new(".")).to_string_lossy().into_owned();

  let prev_dir: Option<String> = lua.named_registry_value(CURRENT_DIR_KEY)?;
  lua.set_named_registry_value(CURRENT_DIR_KEY, dir.clone())?;

  let env = lua.create_table()?;
  env.set("__dir", dir)?;

  let mt = lua.create_table()?;
  mt.set("__index", lua.globals())?;
  mt.set("__newindex", lua.globals())?;
  env.set_metatable(Some(mt))?;

  let result = lua
    .load(source)
    .set_name(format!("@{}", path.display()))
    .set_environment(env)
    .exec();

  // Restore even on failure so the original error is not masked.
  let _ = lua.set_named_registry_value(CURRENT_DIR_KEY, prev_dir);

  result
}

/// Load the script at `path` unless it was loaded before.
///
/// Returns `false` when the script had already been loaded.
pub fn load_script(lua: &Lua, path: &Path, loaded: &LoadedScripts) -> LuaResult<bool> {
  let canonical = canonicalize(path)?;
  if !loaded.borrow_mut().insert(canonical.clone()) {
    debug!(script = %canonical.display(), "script already loaded");
    return Ok(false);
  }

  let source = fs::read_to_string(&canonical)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical.display(), e)))?;

  debug!(script = %canonical.display(), "loading script");
  exec_source(lua, &canonical, &source)?;
  Ok(true)
}

/// Resolve a path given to `include` against the including script's directory.
fn resolve_include(lua: &Lua, path: &str) -> LuaResult<PathBuf> {
  let path = Path::new(path);
  if path.is_absolute() {
    return Ok(path.to_path_buf());
  }
  let current: Option<String> = lua.named_registry_value(CURRENT_DIR_KEY)?;
  Ok(match current {
    Some(dir) => Path::new(&dir).join(path),
    None => path.to_path_buf(),
  })
}

/// Register the `include(path)` global.
pub fn register_include(lua: &Lua, loaded: LoadedScripts) -> LuaResult<()> {
  let include = lua.create_function(move |lua, path: String| {
    let resolved = resolve_include(lua, &path)?;
    load_script(lua, &resolved, &loaded)
  })?;
  lua.globals().set("include", include)
}

/// Let `require` find modules next to the main script.
pub fn extend_package_path(lua: &Lua, script_dir: &Path) -> LuaResult<()> {
  let package: LuaTable = lua.globals().get("package")?;
  let path: String = package.get("path")?;
  let dir = script_dir.to_string_lossy();
  package.set("path", format!("{dir}/?.lua;{dir}/?/init.lua;{path}"))
}
