//! Settings from `mortar.toml`, the environment and the command line.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn default_target_comes_from_settings_file() {
  let env = TestEnv::from_fixture("pipeline.lua");
  env.write_file("mortar.toml", "[script]\ndefault_target = \"Build\"\n");

  env.mortar_cmd().arg("run").arg(&env.script_path).assert().success();

  assert_eq!(
    env.read_file("journal.txt"),
    "setup:Build\nClean\nRestore\nBuild:Debug\nteardown:true\n"
  );
}

#[test]
fn environment_overrides_settings_file() {
  let env = TestEnv::from_fixture("pipeline.lua");
  env.write_file("mortar.toml", "[script]\ndefault_target = \"Build\"\n");

  env
    .mortar_cmd()
    .env("MORTAR_DEFAULT_TARGET", "Clean")
    .arg("run")
    .arg(&env.script_path)
    .assert()
    .success();

  assert_eq!(env.read_file("journal.txt"), "setup:Clean\nClean\nteardown:true\n");
}

#[test]
fn command_line_target_wins() {
  let env = TestEnv::from_fixture("pipeline.lua");

  env
    .mortar_cmd()
    .env("MORTAR_DEFAULT_TARGET", "Clean")
    .arg("run")
    .arg(&env.script_path)
    .args(["-t", "Restore"])
    .assert()
    .success();

  assert_eq!(env.read_file("journal.txt"), "setup:Restore\nClean\nRestore\nteardown:true\n");
}

#[test]
fn quiet_verbosity_hides_task_logs() {
  let env = TestEnv::from_fixture("pipeline.lua");

  env
    .mortar_cmd()
    .args(["--verbosity", "quiet", "run"])
    .arg(&env.script_path)
    .assert()
    .success()
    .stderr(predicate::str::contains("Clean").not());
}

#[test]
fn invalid_verbosity_in_environment_fails() {
  let env = TestEnv::from_fixture("pipeline.lua");

  env
    .mortar_cmd()
    .env("MORTAR_VERBOSITY", "chatty")
    .arg("run")
    .arg(&env.script_path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("MORTAR_VERBOSITY"));
}

#[test]
fn malformed_settings_file_fails() {
  let env = TestEnv::from_fixture("pipeline.lua");
  env.write_file("mortar.toml", "verbosity = [");

  env
    .mortar_cmd()
    .arg("run")
    .arg(&env.script_path)
    .assert()
    .failure()
    .stderr(predicate::str::contains("mortar.toml"));
}

#[cfg(unix)]
#[test]
fn tool_paths_from_settings_are_searched() {
  use std::os::unix::fs::PermissionsExt;

  let env = TestEnv::from_fixture("tools.lua");
  env.write_file("bin/greet", "#!/bin/sh\necho \"hello $1\"\n");
  let greet = env.temp.path().join("bin/greet");
  std::fs::set_permissions(&greet, std::fs::Permissions::from_mode(0o755)).unwrap();
  env.write_file("mortar.toml", "[tools]\npaths = [\"bin\"]\n");

  env.mortar_cmd().arg("run").arg(&env.script_path).assert().success();

  assert_eq!(env.read_file("greeting.txt"), "hello mortar\n");
}

#[cfg(unix)]
#[test]
fn timeout_flag_limits_tools() {
  let env = TestEnv::empty();
  env.write_file(
    "build.lua",
    r#"
    task("Slow"):does(function() exec("sh", { "-c", "sleep 10" }, { silent = true }) end)
    run_target("Slow")
    "#,
  );

  env
    .mortar_cmd()
    .args(["run", "--timeout", "1s"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("timed out after 1s"));
}
