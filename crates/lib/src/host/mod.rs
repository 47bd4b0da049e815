//! Script host.
//!
//! Compiles and runs a Lua build script against a fresh [`Engine`]. The script
//! registers tasks through the globals in [`globals`] and calls
//! `run_target(name)`, which runs the engine in the host's [`HostMode`].

mod context;
mod globals;
pub mod helpers;
mod loader;
mod task;

use std::cell::{Cell, RefCell, RefMut};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::args::Arguments;
use crate::config::Settings;
use crate::engine::{
  DefaultStrategy, DryRunStrategy, Engine, EngineError, ExecutionStrategy, Report, RunSettings, TaskDescription,
};
use crate::tools::{ToolError, ToolRunner};

use loader::LoadedScripts;
use task::SetupData;

#[derive(Debug, Error)]
pub enum HostError {
  #[error("cannot read script {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to compile {}: {message}", script.display())]
  Compile { script: PathBuf, message: String },

  #[error("error in script {}: {source}", script.display())]
  Script { script: PathBuf, source: LuaError },

  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error("failed to initialize script runtime: {0}")]
  Runtime(#[from] LuaError),

  #[error("tasks cannot be inspected while a target is running")]
  Busy,
}

/// What `run_target` does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostMode {
  /// Run tasks.
  #[default]
  Run,
  /// List the tasks that would run.
  DryRun,
  /// Only register tasks; `run_target` records the target and returns an empty report.
  Inspect,
}

#[derive(Debug, Clone, Default)]
pub struct HostOptions {
  pub mode: HostMode,
  pub arguments: Arguments,
  /// Run only the target, without its dependencies.
  pub exclusive: bool,
  pub settings: Settings,
  /// Base for relative paths in `fs` and `exec`; defaults to the script's directory.
  pub working_dir: Option<PathBuf>,
}

/// Result of running a script.
#[derive(Debug, Clone, Default)]
pub struct ScriptOutcome {
  /// One report per `run_target` call, in call order.
  pub reports: Vec<Report>,
}

/// Shared state behind the script globals.
pub(crate) struct HostState {
  engine: RefCell<Engine>,
  pub(crate) mode: HostMode,
  run_settings: RunSettings,
  pub(crate) arguments: Arguments,
  pub(crate) script_dir: PathBuf,
  pub(crate) working_dir: PathBuf,
  pub(crate) runner: ToolRunner,
  pub(crate) setup_data: SetupData,
  running: Cell<bool>,
  reports: RefCell<Vec<Report>>,
  requested_target: RefCell<Option<String>>,
}

impl HostState {
  /// Mutable engine access for registration; fails while a target runs.
  pub(crate) fn engine_mut(&self) -> LuaResult<RefMut<'_, Engine>> {
    self
      .engine
      .try_borrow_mut()
      .map_err(|_| LuaError::external("cannot register or modify tasks while a target is running"))
  }

  fn run_target(&self, lua: &Lua, target: &str) -> LuaResult<LuaValue> {
    if self.running.get() {
      return Err(LuaError::external("run_target cannot be called while a target is running"));
    }

    if self.mode == HostMode::Inspect {
      *self.requested_target.borrow_mut() = Some(target.to_string());
      return context::report_to_lua(lua, &Report::new());
    }

    let engine = self
      .engine
      .try_borrow()
      .map_err(|_| LuaError::external("cannot run a target while tasks are being registered"))?;

    let mut strategy: Box<dyn ExecutionStrategy> = match self.mode {
      HostMode::DryRun => Box::new(DryRunStrategy::new()),
      _ => Box::new(DefaultStrategy),
    };

    self.running.set(true);
    let result = engine.run_target(target, strategy.as_mut(), self.run_settings);
    self.running.set(false);

    let report = result.map_err(LuaError::external)?;
    let value = context::report_to_lua(lua, &report)?;
    self.reports.borrow_mut().push(report);
    Ok(value)
  }
}

/// A build script bound to its own Lua session and engine.
pub struct ScriptHost {
  lua: Lua,
  state: Rc<HostState>,
  loaded: LoadedScripts,
  script: PathBuf,
}

impl ScriptHost {
  /// Prepare a session for the script at `script`. The file is read by [`ScriptHost::run`].
  pub fn new(script: impl AsRef<Path>, options: HostOptions) -> Result<Self, HostError> {
    let script = absolute(script.as_ref());
    let script_dir = script.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let working_dir = options
      .working_dir
      .map(|dir| absolute(&dir))
      .unwrap_or_else(|| script_dir.clone());

    let runner = ToolRunner::from_settings(&options.settings, &working_dir)?;

    let state = Rc::new(HostState {
      engine: RefCell::new(Engine::new()),
      mode: options.mode,
      run_settings: RunSettings {
        exclusive: options.exclusive,
      },
      arguments: options.arguments,
      script_dir: script_dir.clone(),
      working_dir,
      runner,
      setup_data: SetupData::new(RefCell::new(LuaValue::Nil)),
      running: Cell::new(false),
      reports: RefCell::new(Vec::new()),
      requested_target: RefCell::new(None),
    });

    let lua = Lua::new();
    let loaded = LoadedScripts::default();
    loader::extend_package_path(&lua, &script_dir)?;
    globals::register_globals(&lua, &state, loaded.clone())?;

    Ok(Self {
      lua,
      state,
      loaded,
      script,
    })
  }

  pub fn script(&self) -> &Path {
    &self.script
  }

  pub fn mode(&self) -> HostMode {
    self.state.mode
  }

  /// Read and run the script file.
  pub fn run(&self) -> Result<ScriptOutcome, HostError> {
    let source = fs::read_to_string(&self.script).map_err(|source| HostError::Read {
      path: self.script.clone(),
      source,
    })?;
    self.loaded.borrow_mut().insert(canonical(&self.script));
    self.run_source(&source)
  }

  /// Run `source` as if it were the script file.
  pub fn run_source(&self, source: &str) -> Result<ScriptOutcome, HostError> {
    info!(script = %self.script.display(), mode = ?self.state.mode, "running build script");

    loader::exec_source(&self.lua, &self.script, source).map_err(|err| self.script_error(err))?;

    let reports = std::mem::take(&mut *self.state.reports.borrow_mut());
    debug!(runs = reports.len(), "build script finished");
    Ok(ScriptOutcome { reports })
  }

  /// Registered tasks with descriptions, in registration order.
  pub fn describe(&self) -> Result<Vec<TaskDescription>, HostError> {
    let engine = self.state.engine.try_borrow().map_err(|_| HostError::Busy)?;
    Ok(engine.describe())
  }

  /// Dependency tree of `target`, or of every root task.
  pub fn tree(&self, target: Option<&str>) -> Result<String, HostError> {
    let engine = self.state.engine.try_borrow().map_err(|_| HostError::Busy)?;
    Ok(engine.tree(target)?)
  }

  /// Target passed to `run_target` while inspecting.
  pub fn requested_target(&self) -> Option<String> {
    self.state.requested_target.borrow().clone()
  }

  fn script_error(&self, err: LuaError) -> HostError {
    match err {
      LuaError::SyntaxError { message, .. } => HostError::Compile {
        script: self.script.clone(),
        message,
      },
      source => HostError::Script {
        script: self.script.clone(),
        source,
      },
    }
  }
}

fn absolute(path: &Path) -> PathBuf {
  if path.is_absolute() {
    return path.to_path_buf();
  }
  env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
}

fn canonical(path: &Path) -> PathBuf {
  dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
