//! Shared helpers for library integration tests.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use mortar_lib::engine::{ActionContext, ActionError, ActionFn};
use mortar_lib::host::{HostMode, HostOptions, ScriptHost};

/// Names recorded by actions, in call order.
pub type Journal = Rc<RefCell<Vec<String>>>;

/// An action that appends `label` to the journal.
pub fn record(journal: &Journal, label: &str) -> ActionFn {
  let journal = journal.clone();
  let label = label.to_string();
  Box::new(move |_: &ActionContext<'_>| {
    journal.borrow_mut().push(label.clone());
    Ok(())
  })
}

/// An action that fails with `message`.
pub fn fail(message: &str) -> ActionFn {
  let message = message.to_string();
  Box::new(move |_: &ActionContext<'_>| Err(ActionError::msg(message.clone())))
}

/// Write `build.lua` into `dir` and create a host for it.
pub fn script_host(dir: &Path, source: &str, options: HostOptions) -> ScriptHost {
  let script = dir.join("build.lua");
  std::fs::write(&script, source).unwrap();
  ScriptHost::new(script, options).unwrap()
}

pub fn mode(mode: HostMode) -> HostOptions {
  HostOptions {
    mode,
    ..HostOptions::default()
  }
}
