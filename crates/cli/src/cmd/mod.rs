mod info;
mod init;
mod run;
mod tasks;
mod tree;

pub use info::cmd_info;
pub use init::cmd_init;
pub use run::{RunOptions, cmd_run};
pub use tasks::cmd_tasks;
pub use tree::cmd_tree;

use mortar_lib::args::Arguments;
use mortar_lib::config::Settings;
use mortar_lib::consts::TARGET_ARGUMENT;

/// Hand `--target`, or else `script.default_target`, to the script as the `target` argument.
fn apply_target(arguments: &mut Arguments, target: Option<&str>, settings: &Settings) {
  if let Some(target) = target.or(settings.script.default_target.as_deref()) {
    arguments.set(TARGET_ARGUMENT, target);
  }
}
