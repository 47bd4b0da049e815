//! Task definitions.
//!
//! A [`Task`] is a named unit of build work. It holds its dependency edges,
//! run criteria, actions and error policy. Tasks are created through
//! [`Engine::register_task`](super::Engine::register_task) and configured with
//! the chainable setters below.

use std::fmt;

use tracing::warn;

use super::types::{
  ActionContext, ActionError, ActionFn, CriterionFn, EngineError, ErrorHandlerFn, ErrorReporterFn, ExpandFn, FinallyFn,
  TaskInfo,
};

/// Key under which task names are compared; task names are case-insensitive.
pub fn name_key(name: &str) -> String {
  name.to_lowercase()
}

/// True when `a` and `b` name the same task.
pub fn same_name(a: &str, b: &str) -> bool {
  a == b || name_key(a) == name_key(b)
}

/// An edge declared by a task towards another task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDependency {
  pub name: String,
  /// Missing required tasks fail graph construction; missing optional ones are ignored.
  pub required: bool,
}

/// A run criterion: a predicate plus an optional message shown when it fails.
pub struct Criterion {
  predicate: CriterionFn,
  message: Option<String>,
}

impl Criterion {
  pub fn new(predicate: CriterionFn, message: Option<String>) -> Self {
    Self { predicate, message }
  }

  /// Evaluate the predicate.
  pub fn evaluate(&self, ctx: &ActionContext<'_>) -> Result<bool, ActionError> {
    (self.predicate)(ctx)
  }

  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }
}

impl fmt::Debug for Criterion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Criterion").field("message", &self.message).finish()
  }
}

/// One step of a task body.
pub enum TaskStep {
  /// A single action.
  Action(ActionFn),
  /// Produces actions when the task executes (lazily evaluated for-each items).
  Expand(ExpandFn),
}

/// A named unit of build work.
pub struct Task {
  info: TaskInfo,
  dependencies: Vec<TaskDependency>,
  dependees: Vec<TaskDependency>,
  criteria: Vec<Criterion>,
  steps: Vec<TaskStep>,
  error_handler: Option<ErrorHandlerFn>,
  error_reporter: Option<ErrorReporterFn>,
  finally_handler: Option<FinallyFn>,
  defer_errors: bool,
}

impl Task {
  pub(crate) fn new(name: impl Into<String>) -> Self {
    Self {
      info: TaskInfo {
        name: name.into(),
        description: None,
      },
      dependencies: Vec::new(),
      dependees: Vec::new(),
      criteria: Vec::new(),
      steps: Vec::new(),
      error_handler: None,
      error_reporter: None,
      finally_handler: None,
      defer_errors: false,
    }
  }

  pub fn name(&self) -> &str {
    &self.info.name
  }

  pub fn description(&self) -> Option<&str> {
    self.info.description.as_deref()
  }

  pub fn info(&self) -> &TaskInfo {
    &self.info
  }

  pub fn dependencies(&self) -> &[TaskDependency] {
    &self.dependencies
  }

  pub fn dependees(&self) -> &[TaskDependency] {
    &self.dependees
  }

  pub fn criteria(&self) -> &[Criterion] {
    &self.criteria
  }

  pub fn error_handler(&self) -> Option<&ErrorHandlerFn> {
    self.error_handler.as_ref()
  }

  pub fn error_reporter(&self) -> Option<&ErrorReporterFn> {
    self.error_reporter.as_ref()
  }

  pub fn finally_handler(&self) -> Option<&FinallyFn> {
    self.finally_handler.as_ref()
  }

  /// A task without actions only groups its dependencies.
  pub fn is_delegated(&self) -> bool {
    self.steps.is_empty()
  }

  /// Returns true if `name` refers to this task (names are case-insensitive).
  pub fn is_named(&self, name: &str) -> bool {
    same_name(&self.info.name, name)
  }

  pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
    self.info.description = Some(description.into());
    self
  }

  /// Declare that this task runs after `name`.
  pub fn depends_on(&mut self, name: impl Into<String>, required: bool) -> &mut Self {
    let name = name.into();
    if !self.dependencies.iter().any(|d| same_name(&d.name, &name)) {
      self.dependencies.push(TaskDependency { name, required });
    }
    self
  }

  /// Declare that `name` runs after this task.
  pub fn dependee_of(&mut self, name: impl Into<String>, required: bool) -> &mut Self {
    let name = name.into();
    if !self.dependees.iter().any(|d| same_name(&d.name, &name)) {
      self.dependees.push(TaskDependency { name, required });
    }
    self
  }

  pub fn with_criteria(&mut self, predicate: CriterionFn, message: Option<String>) -> &mut Self {
    self.criteria.push(Criterion::new(predicate, message));
    self
  }

  pub fn does(&mut self, action: ActionFn) -> &mut Self {
    self.steps.push(TaskStep::Action(action));
    self
  }

  /// Add actions computed when the task runs.
  pub fn does_expanded(&mut self, expand: ExpandFn) -> &mut Self {
    self.steps.push(TaskStep::Expand(expand));
    self
  }

  pub fn on_error(&mut self, handler: ErrorHandlerFn) -> Result<&mut Self, EngineError> {
    if self.error_handler.is_some() {
      return Err(self.already_set("error handler"));
    }
    self.error_handler = Some(handler);
    Ok(self)
  }

  /// Swallow action failures; the task is reported as failed and the run goes on.
  pub fn continue_on_error(&mut self) -> Result<&mut Self, EngineError> {
    self.on_error(Box::new(|err, ctx| {
      warn!(task = %ctx.task.name, error = %err, "continuing after task error");
      Ok(())
    }))
  }

  pub fn report_error(&mut self, reporter: ErrorReporterFn) -> Result<&mut Self, EngineError> {
    if self.error_reporter.is_some() {
      return Err(self.already_set("error reporter"));
    }
    self.error_reporter = Some(reporter);
    Ok(self)
  }

  pub fn finally(&mut self, handler: FinallyFn) -> Result<&mut Self, EngineError> {
    if self.finally_handler.is_some() {
      return Err(self.already_set("finally handler"));
    }
    self.finally_handler = Some(handler);
    Ok(self)
  }

  pub fn defer_on_error(&mut self) -> &mut Self {
    self.defer_errors = true;
    self
  }

  fn already_set(&self, kind: &'static str) -> EngineError {
    EngineError::HandlerAlreadySet {
      task: self.info.name.clone(),
      kind,
    }
  }

  /// Run every action of the task in order.
  ///
  /// Without deferral the first failure stops the task. With deferral all
  /// actions run and the collected failures are returned together.
  pub fn execute(&self, ctx: &ActionContext<'_>) -> Result<(), ActionError> {
    let mut errors = Vec::new();

    for step in &self.steps {
      match step {
        TaskStep::Action(action) => self.invoke(action, ctx, &mut errors)?,
        TaskStep::Expand(expand) => match expand(ctx) {
          Ok(actions) => {
            for action in &actions {
              self.invoke(action, ctx, &mut errors)?;
            }
          }
          Err(err) if self.defer_errors => errors.push(err),
          Err(err) => return Err(err),
        },
      }
    }

    match errors.len() {
      0 => Ok(()),
      1 => Err(errors.remove(0)),
      _ => Err(ActionError::Aggregate(errors)),
    }
  }

  fn invoke(&self, action: &ActionFn, ctx: &ActionContext<'_>, errors: &mut Vec<ActionError>) -> Result<(), ActionError> {
    match action(ctx) {
      Ok(()) => Ok(()),
      Err(err) if self.defer_errors => {
        errors.push(err);
        Ok(())
      }
      Err(err) => Err(err),
    }
  }
}

impl fmt::Debug for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Task")
      .field("name", &self.info.name)
      .field("description", &self.info.description)
      .field("dependencies", &self.dependencies)
      .field("dependees", &self.dependees)
      .field("criteria", &self.criteria.len())
      .field("steps", &self.steps.len())
      .field("defer_errors", &self.defer_errors)
      .finish()
  }
}
