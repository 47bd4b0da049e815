//! Engine behaviour through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use mortar_lib::engine::{
  ActionContext, ActionError, DefaultStrategy, DryRunStrategy, Engine, EngineError, RunSettings, TaskStatus,
  TaskTeardownContext, TeardownContext,
};

use super::common::{Journal, fail, record};

fn build_pipeline(journal: &Journal) -> Engine {
  let mut engine = Engine::new();
  engine.register_task("Clean").unwrap().does(record(journal, "Clean"));
  engine
    .register_task("Restore")
    .unwrap()
    .depends_on("Clean", true)
    .does(record(journal, "Restore"));
  engine
    .register_task("Build")
    .unwrap()
    .depends_on("Clean", true)
    .depends_on("Restore", true)
    .does(record(journal, "Build"));
  engine
    .register_task("Test")
    .unwrap()
    .depends_on("Build", true)
    .does(record(journal, "Test"));
  engine.register_task("Default").unwrap().depends_on("Test", true);
  engine
}

#[test]
fn diamond_runs_each_task_once_in_order() {
  let journal = Journal::default();
  let engine = build_pipeline(&journal);

  let report = engine
    .run_target("default", &mut DefaultStrategy, RunSettings::default())
    .unwrap();

  assert_eq!(*journal.borrow(), vec!["Clean", "Restore", "Build", "Test"]);
  let names: Vec<&str> = report.entries().iter().map(|e| e.name.as_str()).collect();
  assert_eq!(names, vec!["Clean", "Restore", "Build", "Test", "Default"]);
  assert_eq!(report.get("default").unwrap().status, TaskStatus::Delegated);
}

#[test]
fn exclusive_runs_only_the_target() {
  let journal = Journal::default();
  let engine = build_pipeline(&journal);

  let report = engine
    .run_target("Build", &mut DefaultStrategy, RunSettings { exclusive: true })
    .unwrap();

  assert_eq!(*journal.borrow(), vec!["Build"]);
  assert_eq!(report.len(), 1);
}

#[test]
fn dry_run_lists_without_executing() {
  let journal = Journal::default();
  let engine = build_pipeline(&journal);

  let mut strategy = DryRunStrategy::new();
  let report = engine
    .run_target("Test", &mut strategy, RunSettings::default())
    .unwrap();

  assert!(journal.borrow().is_empty());
  assert_eq!(strategy.executed(), 4);
  assert_eq!(report.count(TaskStatus::Executed), 4);
  assert!(report.total_duration().is_zero());
}

#[test]
fn handled_failure_lets_the_run_continue() {
  let journal = Journal::default();
  let mut engine = Engine::new();
  engine
    .register_task("Flaky")
    .unwrap()
    .does(fail("network down"))
    .continue_on_error()
    .unwrap();
  engine
    .register_task("Package")
    .unwrap()
    .depends_on("Flaky", true)
    .does(record(&journal, "Package"));

  let report = engine
    .run_target("Package", &mut DefaultStrategy, RunSettings::default())
    .unwrap();

  assert_eq!(report.get("Flaky").unwrap().status, TaskStatus::Failed);
  assert_eq!(report.get("Package").unwrap().status, TaskStatus::Executed);
  assert_eq!(*journal.borrow(), vec!["Package"]);
}

#[test]
fn unhandled_failure_stops_the_run_and_reaches_teardown() {
  let journal = Journal::default();
  let teardown_seen: Rc<RefCell<Option<(bool, Option<String>)>>> = Rc::default();

  let mut engine = Engine::new();
  engine.register_task("Compile").unwrap().does(fail("syntax error"));
  engine
    .register_task("Publish")
    .unwrap()
    .depends_on("Compile", true)
    .does(record(&journal, "Publish"));

  let seen = teardown_seen.clone();
  engine
    .register_teardown(Box::new(move |ctx: &TeardownContext<'_>| {
      *seen.borrow_mut() = Some((ctx.successful, ctx.error.map(str::to_string)));
      Ok(())
    }))
    .unwrap();

  let err = engine
    .run_target("Publish", &mut DefaultStrategy, RunSettings::default())
    .unwrap_err();

  assert!(matches!(err, EngineError::TaskFailed { ref task, .. } if task == "Compile"));
  assert!(journal.borrow().is_empty());

  let (successful, error) = teardown_seen.borrow().clone().unwrap();
  assert!(!successful);
  assert!(error.unwrap().contains("syntax error"));
}

#[test]
fn deferred_errors_are_aggregated() {
  let journal = Journal::default();
  let mut engine = Engine::new();
  engine
    .register_task("Lint")
    .unwrap()
    .does(fail("first"))
    .does(record(&journal, "still runs"))
    .does(fail("second"))
    .defer_on_error();

  let err = engine
    .run_target("Lint", &mut DefaultStrategy, RunSettings::default())
    .unwrap_err();

  assert_eq!(*journal.borrow(), vec!["still runs"]);
  let EngineError::TaskFailed { source, .. } = err else {
    panic!("expected a task failure");
  };
  assert!(matches!(source, ActionError::Aggregate(ref errors) if errors.len() == 2));
}

#[test]
fn finally_and_task_teardown_run_after_failure() {
  let journal = Journal::default();
  let mut engine = Engine::new();

  let finally_journal = journal.clone();
  engine
    .register_task("Deploy")
    .unwrap()
    .does(fail("boom"))
    .finally(Box::new(move |ctx: &ActionContext<'_>| {
      finally_journal.borrow_mut().push(format!("finally {}", ctx.task.name));
      Ok(())
    }))
    .unwrap();

  let teardown_journal = journal.clone();
  engine
    .register_task_teardown(Box::new(move |ctx: &TaskTeardownContext<'_>| {
      teardown_journal
        .borrow_mut()
        .push(format!("teardown {} threw={}", ctx.task.name, ctx.threw_exception()));
      Ok(())
    }))
    .unwrap();

  assert!(
    engine
      .run_target("Deploy", &mut DefaultStrategy, RunSettings::default())
      .is_err()
  );
  assert_eq!(*journal.borrow(), vec!["finally Deploy", "teardown Deploy threw=true"]);
}

#[test]
fn cycles_are_reported() {
  let mut engine = Engine::new();
  engine.register_task("A").unwrap().depends_on("C", true);
  engine.register_task("B").unwrap().depends_on("A", true);
  engine.register_task("C").unwrap().depends_on("B", true);

  let err = engine
    .run_target("A", &mut DefaultStrategy, RunSettings::default())
    .unwrap_err();
  assert!(matches!(err, EngineError::Graph(_)), "unexpected error: {err}");
}

#[test]
fn skipped_criteria_do_not_fail_the_run() {
  let journal = Journal::default();
  let mut engine = Engine::new();
  engine
    .register_task("Sign")
    .unwrap()
    .with_criteria(
      Box::new(|_: &ActionContext<'_>| Ok(false)),
      Some("no certificate".to_string()),
    )
    .does(record(&journal, "Sign"));

  let report = engine
    .run_target("Sign", &mut DefaultStrategy, RunSettings::default())
    .unwrap();

  assert!(journal.borrow().is_empty());
  assert_eq!(report.get("Sign").unwrap().status, TaskStatus::Skipped);
}
