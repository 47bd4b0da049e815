mod cmd;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mortar_lib::config::{Settings, Verbosity};
use mortar_lib::consts::DEFAULT_SCRIPT;

use crate::cmd::RunOptions;
use crate::output::{OutputFormat, print_error};

/// mortar - task-based build automation driven by Lua scripts
#[derive(Parser)]
#[command(name = "mortar")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Log verbosity: quiet, minimal, normal, verbose or diagnostic
  #[arg(short, long, global = true)]
  verbosity: Option<Verbosity>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a build script
  Run {
    /// Path to the build script
    #[arg(default_value = DEFAULT_SCRIPT)]
    script: PathBuf,

    /// Target to run, passed to the script as the `target` argument
    #[arg(short, long)]
    target: Option<String>,

    /// List the tasks that would run without executing them
    #[arg(long)]
    dry_run: bool,

    /// Run only the target, ignoring its dependencies
    #[arg(short, long)]
    exclusive: bool,

    /// Script argument as KEY=VALUE (repeatable); a bare KEY is set to "true"
    #[arg(short, long = "arg", value_name = "KEY=VALUE")]
    arguments: Vec<String>,

    /// Default timeout for external tools (e.g. "30s", "5m")
    #[arg(long)]
    timeout: Option<humantime::Duration>,

    /// Base directory for relative paths in the script (default: the script's directory)
    #[arg(short, long)]
    working_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// List the tasks a build script registers
  Tasks {
    /// Path to the build script
    #[arg(default_value = DEFAULT_SCRIPT)]
    script: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Show the task dependency tree
  Tree {
    /// Path to the build script
    #[arg(default_value = DEFAULT_SCRIPT)]
    script: PathBuf,

    /// Only show the tree below this task
    #[arg(short, long)]
    target: Option<String>,
  },

  /// Create a starter build script
  Init {
    /// Directory to initialize
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Overwrite existing files
    #[arg(short, long)]
    force: bool,
  },

  /// Show version, platform and effective settings
  Info {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

impl Commands {
  /// Directory whose `mortar.toml` applies to this command.
  fn settings_dir(&self) -> PathBuf {
    let dir = match self {
      Commands::Run { script, .. } | Commands::Tasks { script, .. } | Commands::Tree { script, .. } => {
        script.parent().map(Path::to_path_buf).unwrap_or_default()
      }
      Commands::Init { dir, .. } => dir.clone(),
      Commands::Info { .. } => PathBuf::new(),
    };
    if dir.as_os_str().is_empty() { PathBuf::from(".") } else { dir }
  }
}

fn init_logging(verbosity: Verbosity) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .with_target(false)
    .init();
}

fn run(cli: Cli) -> Result<()> {
  let settings_dir = cli.command.settings_dir();
  let mut settings = Settings::load(&settings_dir)
    .with_context(|| format!("Failed to load settings from {}", settings_dir.display()))?;
  if let Some(verbosity) = cli.verbosity {
    settings.verbosity = verbosity;
  }

  init_logging(settings.verbosity);

  match cli.command {
    Commands::Run {
      script,
      target,
      dry_run,
      exclusive,
      arguments,
      timeout,
      working_dir,
      output,
    } => cmd::cmd_run(
      RunOptions {
        script,
        target,
        dry_run,
        exclusive,
        arguments,
        timeout: timeout.map(Into::into),
        working_dir,
        output,
      },
      settings,
    ),
    Commands::Tasks { script, output } => cmd::cmd_tasks(&script, output, settings),
    Commands::Tree { script, target } => cmd::cmd_tree(&script, target.as_deref(), settings),
    Commands::Init { dir, force } => cmd::cmd_init(&dir, force),
    Commands::Info { output } => cmd::cmd_info(output, &settings),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}
