//! Task engine.
//!
//! This module owns the task registry and runs targets. A run:
//! 1. Resolves the target and its dependencies into an execution order
//! 2. Runs the global setup callback
//! 3. Evaluates each task's criteria and executes it (or skips it)
//! 4. Contains task failures according to each task's error policy
//! 5. Always runs the global teardown callback once setup was attempted

pub mod graph;
pub mod report;
pub mod strategy;
pub mod task;
pub mod types;

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

pub use graph::{GraphError, TaskGraph};
pub use report::{EntryCategory, Report, ReportEntry, TaskStatus};
pub use strategy::{DefaultStrategy, DryRunStrategy, ExecutionStrategy};
pub use task::{Criterion, Task, TaskDependency};
pub use types::{
  ActionContext, ActionError, ActionFn, CriterionFn, EngineError, ErrorHandlerFn, ErrorReporterFn, ExpandFn, FinallyFn,
  RunSettings, SetupContext, SetupFn, TaskInfo, TaskSetupContext, TaskSetupFn, TaskTeardownContext, TaskTeardownFn,
  TeardownContext, TeardownFn,
};

/// Summary of a registered task for listings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TaskDescription {
  pub name: String,
  pub description: Option<String>,
  pub dependencies: Vec<String>,
}

/// Task registry and runner.
#[derive(Default)]
pub struct Engine {
  tasks: Vec<Task>,
  setup: Option<SetupFn>,
  teardown: Option<TeardownFn>,
  task_setup: Option<TaskSetupFn>,
  task_teardown: Option<TaskTeardownFn>,
}

impl Engine {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a new task and return it for configuration.
  pub fn register_task(&mut self, name: &str) -> Result<&mut Task, EngineError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(EngineError::EmptyTaskName);
    }
    if self.find(name).is_some() {
      return Err(EngineError::DuplicateTask(name.to_string()));
    }

    debug!(task = name, "registering task");
    self.tasks.push(Task::new(name));
    let idx = self.tasks.len() - 1;
    Ok(&mut self.tasks[idx])
  }

  /// Registered tasks, in registration order.
  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  pub fn find(&self, name: &str) -> Option<&Task> {
    self.tasks.iter().find(|t| t.is_named(name))
  }

  pub fn task_mut(&mut self, name: &str) -> Result<&mut Task, EngineError> {
    self
      .tasks
      .iter_mut()
      .find(|t| t.is_named(name))
      .ok_or_else(|| EngineError::TaskNotFound(name.to_string()))
  }

  pub fn register_setup(&mut self, action: SetupFn) -> Result<(), EngineError> {
    set_once(&mut self.setup, action, "setup")
  }

  pub fn register_teardown(&mut self, action: TeardownFn) -> Result<(), EngineError> {
    set_once(&mut self.teardown, action, "teardown")
  }

  pub fn register_task_setup(&mut self, action: TaskSetupFn) -> Result<(), EngineError> {
    set_once(&mut self.task_setup, action, "task setup")
  }

  pub fn register_task_teardown(&mut self, action: TaskTeardownFn) -> Result<(), EngineError> {
    set_once(&mut self.task_teardown, action, "task teardown")
  }

  /// List every task with its description and direct dependencies.
  pub fn describe(&self) -> Vec<TaskDescription> {
    self
      .tasks
      .iter()
      .map(|task| TaskDescription {
        name: task.name().to_string(),
        description: task.description().map(str::to_string),
        dependencies: task.dependencies().iter().map(|d| d.name.clone()).collect(),
      })
      .collect()
  }

  /// Render the dependency tree of `target`, or of every task nothing depends on.
  pub fn tree(&self, target: Option<&str>) -> Result<String, EngineError> {
    let graph = TaskGraph::build(&self.tasks)?;
    let mut out = String::new();

    match target {
      Some(target) => {
        let task = self
          .find(target)
          .ok_or_else(|| EngineError::TargetNotFound(target.to_string()))?;
        graph.render_tree(task.name(), &mut out)?;
      }
      None => {
        for task in &self.tasks {
          if !graph.has_dependents(task.name())? {
            graph.render_tree(task.name(), &mut out)?;
          }
        }
      }
    }

    Ok(out)
  }

  /// Run `target` and everything it depends on.
  pub fn run_target(
    &self,
    target: &str,
    strategy: &mut dyn ExecutionStrategy,
    settings: RunSettings,
  ) -> Result<Report, EngineError> {
    let target = target.trim();
    if target.is_empty() {
      return Err(EngineError::NoTarget);
    }
    let target_task = self
      .find(target)
      .ok_or_else(|| EngineError::TargetNotFound(target.to_string()))?;

    let graph = TaskGraph::build(&self.tasks)?;
    let order = if settings.exclusive {
      vec![target_task]
    } else {
      graph
        .traverse(target_task.name())?
        .iter()
        .filter_map(|name| self.find(name))
        .collect()
    };

    info!(target = %target_task.name(), tasks = order.len(), "running target");

    let mut report = Report::new();
    let result = self.run_tasks(target_task.name(), &order, strategy, &mut report);
    self.run_teardown(strategy, &mut report, result)?;
    Ok(report)
  }

  fn run_tasks(
    &self,
    target: &str,
    order: &[&Task],
    strategy: &mut dyn ExecutionStrategy,
    report: &mut Report,
  ) -> Result<(), EngineError> {
    if let Some(setup) = &self.setup {
      let infos: Vec<TaskInfo> = order.iter().map(|t| t.info().clone()).collect();
      let ctx = SetupContext { target, tasks: &infos };
      let start = Instant::now();
      strategy.setup(setup, &ctx).map_err(EngineError::SetupFailed)?;
      if !strategy.is_dry_run() {
        report.add("Setup", EntryCategory::Setup, start.elapsed());
      }
    }

    for task in order {
      let ctx = ActionContext { task: task.info() };
      match self.failed_criterion(task, &ctx)? {
        Some(criterion) => self.skip_task(task, criterion, strategy, report)?,
        None => self.execute_task(task, &ctx, strategy, report)?,
      }
    }

    Ok(())
  }

  /// Return the first criterion that does not hold.
  fn failed_criterion<'t>(&self, task: &'t Task, ctx: &ActionContext<'_>) -> Result<Option<&'t Criterion>, EngineError> {
    for criterion in task.criteria() {
      let holds = criterion.evaluate(ctx).map_err(|source| EngineError::CriteriaFailed {
        task: task.name().to_string(),
        source,
      })?;
      if !holds {
        return Ok(Some(criterion));
      }
    }
    Ok(None)
  }

  fn skip_task(
    &self,
    task: &Task,
    criterion: &Criterion,
    strategy: &mut dyn ExecutionStrategy,
    report: &mut Report,
  ) -> Result<(), EngineError> {
    self.perform_task_setup(task, true, strategy)?;
    strategy.skip(task, criterion);
    report.add_skipped(task.name());
    self.perform_task_teardown(task, Duration::ZERO, true, None, strategy)
  }

  fn execute_task(
    &self,
    task: &Task,
    ctx: &ActionContext<'_>,
    strategy: &mut dyn ExecutionStrategy,
    report: &mut Report,
  ) -> Result<(), EngineError> {
    self.perform_task_setup(task, false, strategy)?;

    let start = Instant::now();
    let mut error_text = None;
    let mut result = match strategy.execute(task, ctx) {
      Ok(()) => Ok(()),
      Err(err) => {
        error!(task = %task.name(), error = %err, "an error occurred when executing task '{}'", task.name());
        error_text = Some(err.to_string());
        self.handle_task_error(task, err, ctx, strategy)
      }
    };

    if let Some(handler) = task.finally_handler() {
      if let Err(err) = strategy.invoke_finally(handler, ctx) {
        if result.is_ok() {
          result = Err(EngineError::TaskFailed {
            task: task.name().to_string(),
            source: err,
          });
        } else {
          warn!(task = %task.name(), error = %err, "finally handler failed");
        }
      }
    }

    let duration = if strategy.is_dry_run() { Duration::ZERO } else { start.elapsed() };
    if result.is_err() || error_text.is_some() {
      report.add_failed(task.name(), duration);
    } else if task.is_delegated() && !strategy.is_dry_run() {
      report.add_delegated(task.name(), duration);
    } else {
      report.add(task.name(), EntryCategory::Task, duration);
    }

    let teardown = self.perform_task_teardown(task, duration, false, error_text.as_deref(), strategy);
    match (result, teardown) {
      (Err(err), Err(teardown_err)) => {
        error!(task = %task.name(), error = %teardown_err, "task teardown failed after task error");
        Err(err)
      }
      (result, teardown) => result.and(teardown),
    }
  }

  /// Report the error, then hand it to the task's error handler if it has one.
  fn handle_task_error(
    &self,
    task: &Task,
    err: ActionError,
    ctx: &ActionContext<'_>,
    strategy: &mut dyn ExecutionStrategy,
  ) -> Result<(), EngineError> {
    if let Some(reporter) = task.error_reporter() {
      if let Err(report_err) = strategy.report_error(reporter, &err) {
        warn!(task = %task.name(), error = %report_err, "error reporter failed");
      }
    }

    let Some(handler) = task.error_handler() else {
      return Err(EngineError::TaskFailed {
        task: task.name().to_string(),
        source: err,
      });
    };

    strategy
      .handle_error(handler, &err, ctx)
      .map_err(|source| EngineError::TaskFailed {
        task: task.name().to_string(),
        source,
      })
  }

  fn perform_task_setup(
    &self,
    task: &Task,
    skipped: bool,
    strategy: &mut dyn ExecutionStrategy,
  ) -> Result<(), EngineError> {
    let Some(action) = &self.task_setup else {
      return Ok(());
    };
    let ctx = TaskSetupContext {
      task: task.info(),
      skipped,
    };
    strategy
      .task_setup(action, &ctx)
      .map_err(|source| EngineError::TaskSetupFailed {
        task: task.name().to_string(),
        source,
      })
  }

  fn perform_task_teardown(
    &self,
    task: &Task,
    duration: Duration,
    skipped: bool,
    error: Option<&str>,
    strategy: &mut dyn ExecutionStrategy,
  ) -> Result<(), EngineError> {
    let Some(action) = &self.task_teardown else {
      return Ok(());
    };
    let ctx = TaskTeardownContext {
      task: task.info(),
      duration,
      skipped,
      error,
    };
    strategy
      .task_teardown(action, &ctx)
      .map_err(|source| EngineError::TaskTeardownFailed {
        task: task.name().to_string(),
        source,
      })
  }

  fn run_teardown(
    &self,
    strategy: &mut dyn ExecutionStrategy,
    report: &mut Report,
    result: Result<(), EngineError>,
  ) -> Result<(), EngineError> {
    let Some(teardown) = &self.teardown else {
      return result;
    };

    let error_text = result.as_ref().err().map(|e| e.to_string());
    let ctx = TeardownContext {
      successful: result.is_ok(),
      error: error_text.as_deref(),
    };

    let start = Instant::now();
    match (strategy.teardown(teardown, &ctx), result) {
      (Ok(()), result) => {
        if !strategy.is_dry_run() {
          report.add("Teardown", EntryCategory::Teardown, start.elapsed());
        }
        result
      }
      (Err(err), Err(original)) => {
        error!(error = %err, "teardown failed after run error");
        Err(original)
      }
      (Err(err), Ok(())) => Err(EngineError::TeardownFailed(err)),
    }
  }
}

fn set_once<T>(slot: &mut Option<T>, value: T, kind: &'static str) -> Result<(), EngineError> {
  if slot.is_some() {
    return Err(EngineError::LifecycleAlreadySet(kind));
  }
  *slot = Some(value);
  Ok(())
}
