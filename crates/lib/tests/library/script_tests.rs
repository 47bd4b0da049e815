//! Build scripts run end to end through the script host.

use std::fs;

use mortar_lib::args::Arguments;
use mortar_lib::engine::TaskStatus;
use mortar_lib::host::{HostError, HostMode, HostOptions};
use tempfile::TempDir;

use super::common::{mode, script_host};

#[test]
fn script_builds_into_output_dir() {
  let temp = TempDir::new().unwrap();
  fs::create_dir(temp.path().join("src")).unwrap();
  fs::write(temp.path().join("src/a.txt"), "a").unwrap();
  fs::write(temp.path().join("src/b.txt"), "b").unwrap();

  let host = script_host(
    temp.path(),
    r#"
    task("Clean"):does(function() fs.clean_dir("out") end)
    task("Copy")
      :is_dependent_on("Clean")
      :does_for_each(function() return fs.glob("src/*.txt") end, function(file)
        fs.copy(file, "out")
      end)
    task("Default"):is_dependent_on("Copy")
    run_target("Default")
    "#,
    HostOptions::default(),
  );

  let outcome = host.run().unwrap();

  assert_eq!(fs::read_to_string(temp.path().join("out/a.txt")).unwrap(), "a");
  assert_eq!(fs::read_to_string(temp.path().join("out/b.txt")).unwrap(), "b");
  let report = &outcome.reports[0];
  assert_eq!(report.get("Copy").unwrap().status, TaskStatus::Executed);
  assert_eq!(report.get("Default").unwrap().status, TaskStatus::Delegated);
}

#[test]
fn lifecycle_callbacks_run_in_order() {
  let temp = TempDir::new().unwrap();
  let host = script_host(
    temp.path(),
    r#"
    local events = {}
    setup(function(ctx) table.insert(events, "setup " .. ctx.target .. " " .. #ctx.tasks) end)
    task_setup(function(ctx) table.insert(events, "task_setup " .. ctx.task.name) end)
    task_teardown(function(ctx) table.insert(events, "task_teardown " .. ctx.task.name) end)
    teardown(function(ctx)
      table.insert(events, "teardown " .. tostring(ctx.successful))
      fs.write("events.txt", table.concat(events, "\n"))
    end)
    task("A"):does(function() table.insert(events, "A") end)
    task("B"):is_dependent_on("A"):does(function() table.insert(events, "B") end)
    run_target("B")
    "#,
    HostOptions::default(),
  );

  host.run().unwrap();

  let events = fs::read_to_string(temp.path().join("events.txt")).unwrap();
  assert_eq!(
    events,
    "setup B 2\ntask_setup A\nA\ntask_teardown A\ntask_setup B\nB\ntask_teardown B\nteardown true"
  );
}

#[test]
fn error_handlers_receive_the_error() {
  let temp = TempDir::new().unwrap();
  let host = script_host(
    temp.path(),
    r#"
    local seen = {}
    task("Flaky")
      :does(function() error("flaky failure", 0) end)
      :report_error(function(err) table.insert(seen, "reported: " .. err) end)
      :on_error(function(err, ctx) table.insert(seen, "handled " .. ctx.name .. ": " .. err) end)
      :finally(function(ctx) table.insert(seen, "finally " .. ctx.name) end)
    local report = run_target("Flaky")
    assert(report.entries[1].status == "failed")
    fs.write("seen.txt", table.concat(seen, "\n"))
    "#,
    HostOptions::default(),
  );

  host.run().unwrap();

  let seen = fs::read_to_string(temp.path().join("seen.txt")).unwrap();
  assert_eq!(
    seen,
    "reported: flaky failure\nhandled Flaky: flaky failure\nfinally Flaky"
  );
}

#[test]
fn optional_dependencies_may_be_missing() {
  let temp = TempDir::new().unwrap();
  let host = script_host(
    temp.path(),
    r#"
    task("Build"):is_dependent_on("Codegen", { optional = true })
    run_target("Build")
    "#,
    HostOptions::default(),
  );

  assert_eq!(host.run().unwrap().reports.len(), 1);
}

#[test]
fn missing_dependency_is_a_script_error() {
  let temp = TempDir::new().unwrap();
  let host = script_host(
    temp.path(),
    r#"
    task("Build"):is_dependent_on("Codegen")
    run_target("Build")
    "#,
    HostOptions::default(),
  );

  let err = host.run().unwrap_err();
  assert!(matches!(err, HostError::Script { .. }));
  assert!(
    err
      .to_string()
      .contains("task 'Build' is dependent on task 'Codegen' which does not exist")
  );
}

#[test]
fn duplicate_handlers_are_rejected() {
  let temp = TempDir::new().unwrap();
  let host = script_host(
    temp.path(),
    r#"task("Build"):continue_on_error():on_error(function() end)"#,
    HostOptions::default(),
  );

  let err = host.run().unwrap_err();
  assert!(err.to_string().contains("there can only be one error handler per task"));
}

#[test]
fn include_shares_tasks_between_scripts() {
  let temp = TempDir::new().unwrap();
  fs::create_dir(temp.path().join("build")).unwrap();
  fs::write(
    temp.path().join("build/common.lua"),
    r#"task("Clean"):description("Shared clean task")"#,
  )
  .unwrap();

  let host = script_host(
    temp.path(),
    r#"
    include("build/common.lua")
    include("./build/common.lua")
    task("Default"):is_dependent_on("Clean")
    run_target("Default")
    "#,
    mode(HostMode::Inspect),
  );

  host.run().unwrap();
  let tasks = host.describe().unwrap();
  assert_eq!(tasks.len(), 2);
  assert_eq!(tasks[0].description.as_deref(), Some("Shared clean task"));
  assert_eq!(tasks[1].dependencies, vec!["Clean"]);
}

#[test]
fn target_argument_selects_the_target() {
  let temp = TempDir::new().unwrap();
  let mut arguments = Arguments::new();
  arguments.set("target", "Package");

  let host = script_host(
    temp.path(),
    r#"
    task("Default")
    task("Package")
    run_target(argument("target", "Default"))
    "#,
    HostOptions {
      arguments,
      mode: HostMode::Inspect,
      ..HostOptions::default()
    },
  );

  host.run().unwrap();
  assert_eq!(host.requested_target().as_deref(), Some("Package"));
}

#[cfg(unix)]
#[test]
fn exec_captures_tool_output() {
  let temp = TempDir::new().unwrap();
  let host = script_host(
    temp.path(),
    r#"
    local result = exec("sh", { "-c", "echo hello; exit 3" }, { allow_failure = true, silent = true })
    fs.write("result.txt", result.code .. ":" .. result.stdout)
    "#,
    HostOptions::default(),
  );

  host.run().unwrap();
  assert_eq!(
    fs::read_to_string(temp.path().join("result.txt")).unwrap(),
    "3:hello\n"
  );
}

#[cfg(unix)]
#[test]
fn failing_tool_fails_the_task() {
  let temp = TempDir::new().unwrap();
  let host = script_host(
    temp.path(),
    r#"
    task("Build"):does(function() exec("sh", { "-c", "exit 2" }, { silent = true }) end)
    run_target("Build")
    "#,
    HostOptions::default(),
  );

  let message = host.run().unwrap_err().to_string();
  assert!(message.contains("exited with code 2"), "unexpected error: {message}");
}
