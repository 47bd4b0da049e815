//! Error and context types shared by the task engine.
//!
//! Callbacks registered on the engine (actions, criteria, lifecycle hooks and
//! error handlers) all receive one of the context structs defined here and
//! report failure through [`ActionError`].

use std::fmt;
use std::time::Duration;

use mlua::prelude::LuaError;
use thiserror::Error;

use super::graph::GraphError;

/// Failure raised by a callback registered on the engine.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
  /// The callback is a script function and raised a Lua error.
  #[error("{0}")]
  Lua(#[from] LuaError),

  /// A plain failure message.
  #[error("{0}")]
  Message(String),

  /// Several actions of a task failed while errors were deferred.
  #[error("{}", AggregateDisplay(.0))]
  Aggregate(Vec<ActionError>),
}

impl ActionError {
  /// Create an error from a message.
  pub fn msg(message: impl Into<String>) -> Self {
    Self::Message(message.into())
  }
}

struct AggregateDisplay<'a>(&'a [ActionError]);

impl fmt::Display for AggregateDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "task failed with the following errors:")?;
    for (i, err) in self.0.iter().enumerate() {
      write!(f, "\n  {}. {}", i + 1, err)?;
    }
    Ok(())
  }
}

/// Errors produced while registering tasks or running a target.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("task name cannot be empty")]
  EmptyTaskName,

  #[error("another task with the name '{0}' has already been added")]
  DuplicateTask(String),

  #[error("task not found: {0}")]
  TaskNotFound(String),

  /// A per-task handler that may only be set once was set again.
  #[error("there can only be one {kind} per task (task '{task}')")]
  HandlerAlreadySet { task: String, kind: &'static str },

  /// A global lifecycle callback that may only be set once was set again.
  #[error("there can only be one {0} action")]
  LifecycleAlreadySet(&'static str),

  #[error("no target specified")]
  NoTarget,

  #[error("the target '{0}' was not found")]
  TargetNotFound(String),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("setup failed: {0}")]
  SetupFailed(#[source] ActionError),

  #[error("teardown failed: {0}")]
  TeardownFailed(#[source] ActionError),

  #[error("task setup failed for task '{task}': {source}")]
  TaskSetupFailed { task: String, source: ActionError },

  #[error("task teardown failed for task '{task}': {source}")]
  TaskTeardownFailed { task: String, source: ActionError },

  #[error("could not evaluate criteria of task '{task}': {source}")]
  CriteriaFailed { task: String, source: ActionError },

  #[error("task '{task}' failed: {source}")]
  TaskFailed { task: String, source: ActionError },
}

/// Public view of a task handed to callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
  pub name: String,
  pub description: Option<String>,
}

/// Context passed to task actions, criteria, error handlers and finally handlers.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
  pub task: &'a TaskInfo,
}

/// Context passed to the global setup callback.
#[derive(Debug, Clone, Copy)]
pub struct SetupContext<'a> {
  /// The target being run.
  pub target: &'a str,
  /// Every task that will be considered, in execution order.
  pub tasks: &'a [TaskInfo],
}

/// Context passed to the global teardown callback.
#[derive(Debug, Clone, Copy)]
pub struct TeardownContext<'a> {
  pub successful: bool,
  pub error: Option<&'a str>,
}

/// Context passed to the per-task setup callback.
#[derive(Debug, Clone, Copy)]
pub struct TaskSetupContext<'a> {
  pub task: &'a TaskInfo,
  pub skipped: bool,
}

/// Context passed to the per-task teardown callback.
#[derive(Debug, Clone, Copy)]
pub struct TaskTeardownContext<'a> {
  pub task: &'a TaskInfo,
  pub duration: Duration,
  pub skipped: bool,
  /// Error text when one of the task's actions failed, even if it was handled.
  pub error: Option<&'a str>,
}

impl TaskTeardownContext<'_> {
  pub fn threw_exception(&self) -> bool {
    self.error.is_some()
  }
}

pub type ActionFn = Box<dyn Fn(&ActionContext<'_>) -> Result<(), ActionError>>;
pub type ExpandFn = Box<dyn Fn(&ActionContext<'_>) -> Result<Vec<ActionFn>, ActionError>>;
pub type CriterionFn = Box<dyn Fn(&ActionContext<'_>) -> Result<bool, ActionError>>;
pub type ErrorHandlerFn = Box<dyn Fn(&ActionError, &ActionContext<'_>) -> Result<(), ActionError>>;
pub type ErrorReporterFn = Box<dyn Fn(&ActionError) -> Result<(), ActionError>>;
pub type FinallyFn = Box<dyn Fn(&ActionContext<'_>) -> Result<(), ActionError>>;
pub type SetupFn = Box<dyn Fn(&SetupContext<'_>) -> Result<(), ActionError>>;
pub type TeardownFn = Box<dyn Fn(&TeardownContext<'_>) -> Result<(), ActionError>>;
pub type TaskSetupFn = Box<dyn Fn(&TaskSetupContext<'_>) -> Result<(), ActionError>>;
pub type TaskTeardownFn = Box<dyn Fn(&TaskTeardownContext<'_>) -> Result<(), ActionError>>;

/// Settings that change how a target is run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSettings {
  /// Run only the target, ignoring its dependencies.
  pub exclusive: bool,
}
