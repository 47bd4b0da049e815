//! Implementation of the `mortar tree` command.

use std::path::Path;

use anyhow::Result;

use mortar_lib::config::Settings;

use super::tasks::inspect;

/// Print the dependency tree of `target`.
///
/// Without `--target` the tree starts at whatever the script passes to
/// `run_target`; a script that never calls it gets every task nothing depends on.
pub fn cmd_tree(script: &Path, target: Option<&str>, settings: Settings) -> Result<()> {
  let host = inspect(script, target, settings)?;
  let root = target.map(str::to_string).or_else(|| host.requested_target());
  print!("{}", host.tree(root.as_deref())?);
  Ok(())
}
