//! Tool location and execution.

use std::collections::BTreeMap;
use std::time::Duration;

use mortar_lib::config::{Settings, ToolSettings};
use mortar_lib::tools::{ProcessSettings, ToolError, ToolLocator, ToolRunner};
use tempfile::TempDir;

#[test]
fn unknown_tool_is_not_found() {
  let temp = TempDir::new().unwrap();
  let locator = ToolLocator::new(&ToolSettings::default()).with_search_path(None);
  let runner = ToolRunner::new(locator, temp.path()).unwrap();

  let err = runner
    .run("definitely-not-a-real-tool", &ProcessSettings::new(Vec::<String>::new()))
    .unwrap_err();
  assert!(matches!(err, ToolError::NotFound(_)));
  assert_eq!(err.to_string(), "could not locate executable 'definitely-not-a-real-tool'");
}

#[cfg(unix)]
mod unix {
  use std::fs;
  use std::os::unix::fs::PermissionsExt;
  use std::path::Path;

  use super::*;

  fn write_tool(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  }

  #[test]
  fn configured_tool_dirs_are_searched() {
    let temp = TempDir::new().unwrap();
    let tools = temp.path().join("tools");
    fs::create_dir(&tools).unwrap();
    write_tool(&tools, "greet", "echo \"hello $1\"");

    let mut settings = Settings::default();
    settings.tools.paths.push(tools);
    let runner = ToolRunner::from_settings(&settings, temp.path()).unwrap();

    let output = runner.run("greet", &ProcessSettings::new(["world"])).unwrap();
    assert_eq!(output.stdout.trim(), "hello world");
    assert_eq!(output.code, Some(0));
  }

  #[test]
  fn registered_tools_win_over_search_paths() {
    let temp = TempDir::new().unwrap();
    write_tool(temp.path(), "pinned", "echo pinned");

    let mut registered = BTreeMap::new();
    registered.insert("sh".to_string(), temp.path().join("pinned"));
    let settings = ToolSettings {
      registered,
      ..ToolSettings::default()
    };

    let locator = ToolLocator::new(&settings);
    assert_eq!(locator.locate("SH").unwrap(), temp.path().join("pinned"));
  }

  #[test]
  fn working_dir_and_env_reach_the_process() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("sub")).unwrap();
    let runner = ToolRunner::new(ToolLocator::new(&ToolSettings::default()), temp.path()).unwrap();

    let mut settings = ProcessSettings::new(["-c", "pwd; echo $GREETING"]);
    settings.cwd = Some("sub".into());
    settings.env.insert("GREETING".to_string(), "hi".to_string());
    settings.silent = true;

    let output = runner.run("sh", &settings).unwrap();
    let mut lines = output.stdout.lines();
    let pwd = lines.next().unwrap();
    assert!(pwd.ends_with("/sub"), "unexpected working directory: {pwd}");
    assert_eq!(lines.next(), Some("hi"));
  }

  #[test]
  fn slow_tools_time_out() {
    let temp = TempDir::new().unwrap();
    let runner = ToolRunner::new(ToolLocator::new(&ToolSettings::default()), temp.path())
      .unwrap()
      .with_default_timeout(Some(Duration::from_millis(200)));

    let mut settings = ProcessSettings::new(["-c", "sleep 5"]);
    settings.silent = true;

    let err = runner.run("sh", &settings).unwrap_err();
    assert!(matches!(err, ToolError::Timeout { .. }), "unexpected error: {err}");
  }

  #[test]
  fn non_zero_exit_fails_unless_allowed() {
    let temp = TempDir::new().unwrap();
    let runner = ToolRunner::new(ToolLocator::new(&ToolSettings::default()), temp.path()).unwrap();

    let mut settings = ProcessSettings::new(["-c", "echo oops >&2; exit 4"]);
    settings.silent = true;

    let err = runner.run("sh", &settings).unwrap_err();
    assert_eq!(err.to_string(), "'sh' exited with code 4");

    settings.allow_failure = true;
    let output = runner.run("sh", &settings).unwrap();
    assert_eq!(output.code, Some(4));
    assert_eq!(output.stderr.trim(), "oops");
  }
}
