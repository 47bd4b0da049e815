//! `mortar run` against fixture build scripts.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn pipeline_runs_dependencies_once_in_order() {
  let env = TestEnv::from_fixture("pipeline.lua");

  env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Total:"));

  assert_eq!(
    env.read_file("journal.txt"),
    "setup:Default\nClean\nRestore\nBuild:Debug\nTest\nteardown:true\n"
  );
}

#[test]
fn arguments_reach_the_script() {
  let env = TestEnv::from_fixture("pipeline.lua");

  env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .args(["-a", "Configuration=Release", "-a", "skip-tests"])
    .assert()
    .success()
    .stdout(predicate::str::contains("skipped"));

  assert_eq!(
    env.read_file("journal.txt"),
    "setup:Default\nClean\nRestore\nBuild:Release\nteardown:true\n"
  );
}

#[test]
fn exclusive_target_skips_dependencies() {
  let env = TestEnv::from_fixture("pipeline.lua");

  env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .args(["--target", "build", "--exclusive"])
    .assert()
    .success();

  assert_eq!(env.read_file("journal.txt"), "setup:Build\nBuild:Debug\nteardown:true\n");
}

#[test]
fn dry_run_invokes_no_callbacks() {
  let env = TestEnv::from_fixture("pipeline.lua");

  env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .arg("--dry-run")
    .assert()
    .success()
    .stderr(predicate::str::contains("1. Clean"))
    .stderr(predicate::str::contains("5. Default"));

  assert!(!env.temp.path().join("journal.txt").exists());
}

#[test]
fn json_output_contains_the_report() {
  let env = TestEnv::from_fixture("pipeline.lua");

  let output = env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .args(["--output", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let entries = reports[0]["entries"].as_array().unwrap();
  let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
  assert_eq!(
    names,
    vec!["Setup", "Clean", "Restore", "Build", "Test", "Default", "Teardown"]
  );
  assert_eq!(entries[0]["category"], "setup");
  assert_eq!(entries[5]["status"], "delegated");
}

#[test]
fn handled_errors_continue_and_fatal_errors_stop() {
  let env = TestEnv::from_fixture("error_policies.lua");

  env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("task 'Broken' failed"))
    .stderr(predicate::str::contains("an error occurred when executing task 'Flaky'"));

  assert_eq!(
    env.read_file("events.txt"),
    "finally:Flaky\nreported:broken build\nteardown:false\n"
  );
}

#[test]
fn tolerated_failure_is_reported() {
  let env = TestEnv::from_fixture("error_policies.lua");

  env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .args(["-t", "Flaky"])
    .assert()
    .success()
    .stdout(predicate::str::contains("(failed)"));
}

#[test]
fn working_dir_changes_relative_paths() {
  let env = TestEnv::from_fixture("pipeline.lua");
  std::fs::create_dir(env.temp.path().join("work")).unwrap();

  env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .args(["--working-dir", "work"])
    .assert()
    .success();

  assert!(env.temp.path().join("work/journal.txt").exists());
}

#[test]
fn include_loads_shared_tasks() {
  let env = TestEnv::empty();
  env.write_file(
    "build/shared.lua",
    r#"task("Shared"):does(function() fs.write("shared.txt", __dir) end)"#,
  );
  env.write_file(
    "build.lua",
    r#"
    include("build/shared.lua")
    task("Default"):is_dependent_on("Shared")
    run_target("Default")
    "#,
  );

  env.mortar_cmd().arg("run").assert().success();
  assert!(env.read_file("shared.txt").ends_with("build"));
}

#[cfg(unix)]
#[test]
fn failing_tool_reports_exit_code() {
  let env = TestEnv::from_fixture("tools.lua");

  env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .args(["-t", "Fail"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("'sh' exited with code 7"));
}
