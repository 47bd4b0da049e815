//! Execution strategies.
//!
//! The engine decides *what* runs and in which order; a strategy decides how
//! each callback is actually invoked. [`DefaultStrategy`] calls everything,
//! [`DryRunStrategy`] only lists the tasks that would run.

use tracing::{debug, info};

use super::task::{Criterion, Task};
use super::types::{
  ActionContext, ActionError, ErrorHandlerFn, ErrorReporterFn, FinallyFn, SetupContext, SetupFn, TaskSetupContext,
  TaskSetupFn, TaskTeardownContext, TaskTeardownFn, TeardownContext, TeardownFn,
};

/// Invokes the callbacks of a run.
pub trait ExecutionStrategy {
  /// Dry runs record every task with zero duration and skip lifecycle entries in the report.
  fn is_dry_run(&self) -> bool {
    false
  }

  fn setup(&mut self, action: &SetupFn, ctx: &SetupContext<'_>) -> Result<(), ActionError>;

  fn teardown(&mut self, action: &TeardownFn, ctx: &TeardownContext<'_>) -> Result<(), ActionError>;

  fn task_setup(&mut self, action: &TaskSetupFn, ctx: &TaskSetupContext<'_>) -> Result<(), ActionError>;

  fn task_teardown(&mut self, action: &TaskTeardownFn, ctx: &TaskTeardownContext<'_>) -> Result<(), ActionError>;

  /// Run the actions of a task.
  fn execute(&mut self, task: &Task, ctx: &ActionContext<'_>) -> Result<(), ActionError>;

  /// Called when a criterion prevents a task from running.
  fn skip(&mut self, task: &Task, criterion: &Criterion);

  fn report_error(&mut self, reporter: &ErrorReporterFn, err: &ActionError) -> Result<(), ActionError>;

  fn handle_error(
    &mut self,
    handler: &ErrorHandlerFn,
    err: &ActionError,
    ctx: &ActionContext<'_>,
  ) -> Result<(), ActionError>;

  fn invoke_finally(&mut self, handler: &FinallyFn, ctx: &ActionContext<'_>) -> Result<(), ActionError>;
}

/// Runs every callback.
#[derive(Debug, Default)]
pub struct DefaultStrategy;

impl ExecutionStrategy for DefaultStrategy {
  fn setup(&mut self, action: &SetupFn, ctx: &SetupContext<'_>) -> Result<(), ActionError> {
    info!("executing custom setup action");
    action(ctx)
  }

  fn teardown(&mut self, action: &TeardownFn, ctx: &TeardownContext<'_>) -> Result<(), ActionError> {
    info!("executing custom teardown action");
    action(ctx)
  }

  fn task_setup(&mut self, action: &TaskSetupFn, ctx: &TaskSetupContext<'_>) -> Result<(), ActionError> {
    debug!(task = %ctx.task.name, "executing custom task setup action");
    action(ctx)
  }

  fn task_teardown(&mut self, action: &TaskTeardownFn, ctx: &TaskTeardownContext<'_>) -> Result<(), ActionError> {
    debug!(task = %ctx.task.name, "executing custom task teardown action");
    action(ctx)
  }

  fn execute(&mut self, task: &Task, ctx: &ActionContext<'_>) -> Result<(), ActionError> {
    info!("========================================");
    info!("{}", task.name());
    info!("========================================");
    task.execute(ctx)
  }

  fn skip(&mut self, task: &Task, criterion: &Criterion) {
    match criterion.message() {
      Some(message) => info!(task = %task.name(), "skipping task: {message}"),
      None => info!(task = %task.name(), "skipping task"),
    }
  }

  fn report_error(&mut self, reporter: &ErrorReporterFn, err: &ActionError) -> Result<(), ActionError> {
    reporter(err)
  }

  fn handle_error(
    &mut self,
    handler: &ErrorHandlerFn,
    err: &ActionError,
    ctx: &ActionContext<'_>,
  ) -> Result<(), ActionError> {
    debug!(task = %ctx.task.name, "executing custom error handler");
    handler(err, ctx)
  }

  fn invoke_finally(&mut self, handler: &FinallyFn, ctx: &ActionContext<'_>) -> Result<(), ActionError> {
    debug!(task = %ctx.task.name, "executing finally handler");
    handler(ctx)
  }
}

/// Lists the tasks that would run without invoking any callback.
#[derive(Debug, Default)]
pub struct DryRunStrategy {
  counter: usize,
}

impl DryRunStrategy {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of tasks listed so far.
  pub fn executed(&self) -> usize {
    self.counter
  }
}

impl ExecutionStrategy for DryRunStrategy {
  fn is_dry_run(&self) -> bool {
    true
  }

  fn setup(&mut self, _action: &SetupFn, _ctx: &SetupContext<'_>) -> Result<(), ActionError> {
    Ok(())
  }

  fn teardown(&mut self, _action: &TeardownFn, _ctx: &TeardownContext<'_>) -> Result<(), ActionError> {
    Ok(())
  }

  fn task_setup(&mut self, _action: &TaskSetupFn, _ctx: &TaskSetupContext<'_>) -> Result<(), ActionError> {
    Ok(())
  }

  fn task_teardown(&mut self, _action: &TaskTeardownFn, _ctx: &TaskTeardownContext<'_>) -> Result<(), ActionError> {
    Ok(())
  }

  fn execute(&mut self, task: &Task, _ctx: &ActionContext<'_>) -> Result<(), ActionError> {
    self.counter += 1;
    info!("{}. {}", self.counter, task.name());
    Ok(())
  }

  fn skip(&mut self, task: &Task, _criterion: &Criterion) {
    debug!(task = %task.name(), "task would be skipped");
  }

  fn report_error(&mut self, _reporter: &ErrorReporterFn, _err: &ActionError) -> Result<(), ActionError> {
    Ok(())
  }

  fn handle_error(
    &mut self,
    _handler: &ErrorHandlerFn,
    _err: &ActionError,
    _ctx: &ActionContext<'_>,
  ) -> Result<(), ActionError> {
    Ok(())
  }

  fn invoke_finally(&mut self, _handler: &FinallyFn, _ctx: &ActionContext<'_>) -> Result<(), ActionError> {
    Ok(())
  }
}
