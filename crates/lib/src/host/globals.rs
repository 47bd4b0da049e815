//! Globals available to build scripts.
//!
//! - `task(name)` and the lifecycle hooks `setup`, `teardown`, `task_setup`, `task_teardown`
//! - `run_target(name)`
//! - `argument(name [, default])`, `has_argument(name)`, `env(name [, default])`
//! - `log.error/warning/info/verbose/debug(fmt, ...)`
//! - `exec(tool [, args [, opts]])`
//! - `fs` and `context` tables, `include(path)`

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use mlua::prelude::*;
use tracing::{debug, error, info, trace, warn};

use super::context;
use super::helpers::fs::create_fs_helpers;
use super::loader::{LoadedScripts, register_include};
use super::task::LuaTaskBuilder;
use super::{HostMode, HostState};
use crate::engine;
use crate::platform::Platform;
use crate::tools::ProcessSettings;

/// Register every script global.
pub fn register_globals(lua: &Lua, state: &Rc<HostState>, loaded: LoadedScripts) -> LuaResult<()> {
  register_task_api(lua, state)?;
  register_lifecycle(lua, state)?;
  register_arguments(lua, state)?;
  register_log(lua)?;
  register_exec(lua, state)?;
  lua
    .globals()
    .set("fs", create_fs_helpers(lua, state.working_dir.clone())?)?;
  register_context(lua, state)?;
  register_include(lua, loaded)?;
  Ok(())
}

fn register_task_api(lua: &Lua, state: &Rc<HostState>) -> LuaResult<()> {
  let globals = lua.globals();

  let st = state.clone();
  globals.set(
    "task",
    lua.create_function(move |_, name: String| {
      let registered = st
        .engine_mut()?
        .register_task(&name)
        .map_err(LuaError::external)?
        .name()
        .to_string();
      Ok(LuaTaskBuilder::new(registered, st.clone()))
    })?,
  )?;

  let st = state.clone();
  globals.set(
    "run_target",
    lua.create_function(move |lua, target: Option<String>| st.run_target(lua, &target.unwrap_or_default()))?,
  )?;

  Ok(())
}

fn register_lifecycle(lua: &Lua, state: &Rc<HostState>) -> LuaResult<()> {
  let globals = lua.globals();

  // setup(fn(ctx)) - the returned value is handed to every action
  let st = state.clone();
  globals.set(
    "setup",
    lua.create_function(move |_, func: LuaFunction| {
      let data = st.setup_data.clone();
      st.engine_mut()?
        .register_setup(Box::new(move |ctx: &engine::SetupContext<'_>| {
          let value = func.call::<LuaValue>(context::SetupContext::from(ctx))?;
          *data.borrow_mut() = value;
          Ok(())
        }))
        .map_err(LuaError::external)
    })?,
  )?;

  let st = state.clone();
  globals.set(
    "teardown",
    lua.create_function(move |_, func: LuaFunction| {
      st.engine_mut()?
        .register_teardown(Box::new(move |ctx: &engine::TeardownContext<'_>| {
          func.call::<()>(context::TeardownContext::from(ctx))?;
          Ok(())
        }))
        .map_err(LuaError::external)
    })?,
  )?;

  let st = state.clone();
  globals.set(
    "task_setup",
    lua.create_function(move |_, func: LuaFunction| {
      st.engine_mut()?
        .register_task_setup(Box::new(move |ctx: &engine::TaskSetupContext<'_>| {
          func.call::<()>(context::TaskSetupContext::from(ctx))?;
          Ok(())
        }))
        .map_err(LuaError::external)
    })?,
  )?;

  let st = state.clone();
  globals.set(
    "task_teardown",
    lua.create_function(move |_, func: LuaFunction| {
      st.engine_mut()?
        .register_task_teardown(Box::new(move |ctx: &engine::TaskTeardownContext<'_>| {
          func.call::<()>(context::TaskTeardownContext::from(ctx))?;
          Ok(())
        }))
        .map_err(LuaError::external)
    })?,
  )?;

  Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" | "on" => Some(true),
    "false" | "0" | "no" | "off" => Some(false),
    _ => None,
  }
}

/// Convert a raw argument to the type of its default.
fn convert_argument(lua: &Lua, name: &str, raw: &str, default: &LuaValue) -> LuaResult<LuaValue> {
  let invalid = |expected: &str| LuaError::external(format!("argument '{name}' has invalid value '{raw}' (expected {expected})"));
  match default {
    LuaValue::Boolean(_) => parse_bool(raw).map(LuaValue::Boolean).ok_or_else(|| invalid("boolean")),
    LuaValue::Integer(_) => raw
      .trim()
      .parse()
      .map(LuaValue::Integer)
      .map_err(|_| invalid("integer")),
    LuaValue::Number(_) => raw
      .trim()
      .parse()
      .map(LuaValue::Number)
      .map_err(|_| invalid("number")),
    _ => lua.create_string(raw).map(LuaValue::String),
  }
}

fn register_arguments(lua: &Lua, state: &Rc<HostState>) -> LuaResult<()> {
  let globals = lua.globals();

  let st = state.clone();
  globals.set(
    "argument",
    lua.create_function(move |lua, (name, default): (String, LuaValue)| {
      if default.is_nil() {
        let raw = st.arguments.require(&name).map_err(LuaError::external)?;
        return lua.create_string(raw).map(LuaValue::String);
      }
      match st.arguments.get(&name) {
        Some(raw) => convert_argument(lua, &name, raw, &default),
        None => Ok(default),
      }
    })?,
  )?;

  let st = state.clone();
  globals.set(
    "has_argument",
    lua.create_function(move |_, name: String| Ok(st.arguments.has(&name)))?,
  )?;

  globals.set(
    "env",
    lua.create_function(|lua, (name, default): (String, LuaValue)| match std::env::var(&name) {
      Ok(value) => lua.create_string(&value).map(LuaValue::String),
      Err(_) => Ok(default),
    })?,
  )?;

  Ok(())
}

/// `tostring` a single value, `string.format` several.
fn format_message(lua: &Lua, args: LuaMultiValue) -> LuaResult<String> {
  if args.len() > 1 {
    let string: LuaTable = lua.globals().get("string")?;
    let format: LuaFunction = string.get("format")?;
    return format.call::<String>(args);
  }
  match args.into_iter().next() {
    Some(value) => lua.globals().get::<LuaFunction>("tostring")?.call::<String>(value),
    None => Ok(String::new()),
  }
}

fn register_log(lua: &Lua) -> LuaResult<()> {
  let log = lua.create_table()?;

  for level in ["error", "warning", "info", "verbose", "debug"] {
    log.set(
      level,
      lua.create_function(move |lua, args: LuaMultiValue| {
        let message = format_message(lua, args)?;
        match level {
          "error" => error!("{message}"),
          "warning" => warn!("{message}"),
          "info" => info!("{message}"),
          "verbose" => debug!("{message}"),
          _ => trace!("{message}"),
        }
        Ok(())
      })?,
    )?;
  }

  lua.globals().set("log", log)
}

fn process_settings(args: Option<Vec<String>>, opts: Option<LuaTable>) -> LuaResult<ProcessSettings> {
  let mut settings = ProcessSettings::new(args.unwrap_or_default());
  let Some(opts) = opts else {
    return Ok(settings);
  };

  if let Some(env) = opts.get::<Option<LuaTable>>("env")? {
    for pair in env.pairs::<String, String>() {
      let (key, value) = pair?;
      settings.env.insert(key, value);
    }
  }
  settings.cwd = opts.get::<Option<String>>("cwd")?.map(PathBuf::from);
  if let Some(secs) = opts.get::<Option<f64>>("timeout")? {
    settings.timeout =
      Some(Duration::try_from_secs_f64(secs).map_err(|e| LuaError::external(format!("invalid timeout {secs}: {e}")))?);
  }
  settings.allow_failure = opts.get::<Option<bool>>("allow_failure")?.unwrap_or(false);
  settings.silent = opts.get::<Option<bool>>("silent")?.unwrap_or(false);
  Ok(settings)
}

fn register_exec(lua: &Lua, state: &Rc<HostState>) -> LuaResult<()> {
  let st = state.clone();
  let exec = lua.create_function(
    move |lua, (tool, args, opts): (String, Option<Vec<String>>, Option<LuaTable>)| {
      let settings = process_settings(args, opts)?;
      let output = st.runner.run(&tool, &settings).map_err(LuaError::external)?;

      let result = lua.create_table()?;
      result.set("code", output.code)?;
      result.set("stdout", output.stdout)?;
      result.set("stderr", output.stderr)?;
      Ok(result)
    },
  )?;
  lua.globals().set("exec", exec)
}

fn register_context(lua: &Lua, state: &Rc<HostState>) -> LuaResult<()> {
  let platform = Platform::current();
  let ctx = lua.create_table()?;

  ctx.set("platform", platform.triple())?;
  ctx.set("os", platform.os.as_str())?;
  ctx.set("arch", platform.arch.as_str())?;
  ctx.set("script_dir", state.script_dir.to_string_lossy().into_owned())?;
  ctx.set("working_dir", state.working_dir.to_string_lossy().into_owned())?;
  ctx.set("dry_run", state.mode == HostMode::DryRun)?;

  lua.globals().set("context", ctx)
}
