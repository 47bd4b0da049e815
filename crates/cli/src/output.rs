//! CLI output formatting utilities.
//!
//! Colored status messages, duration formatting and the run report table.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use mortar_lib::engine::{Report, TaskStatus};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
}

/// Width of the task name column in the report table.
const NAME_WIDTH: usize = 30;
const RULE_WIDTH: usize = 60;

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// One table row; skipped and delegated tasks show their status instead of a duration.
fn report_row(name: &str, status: TaskStatus, duration: Duration) -> String {
  let detail = match status {
    TaskStatus::Executed => format_duration(duration),
    TaskStatus::Failed => format!("{} (failed)", format_duration(duration)),
    TaskStatus::Delegated => "delegated".to_string(),
    TaskStatus::Skipped => "skipped".to_string(),
  };
  format!("{:<width$}{}", name, detail, width = NAME_WIDTH)
}

/// Render a run report as a text table.
pub fn render_report(report: &Report) -> String {
  let rule = "-".repeat(RULE_WIDTH);
  let mut out = String::new();

  out.push_str(&format!("{:<width$}{}\n", "Task", "Duration", width = NAME_WIDTH));
  out.push_str(&rule);
  out.push('\n');
  for entry in report.entries() {
    out.push_str(&report_row(&entry.name, entry.status, entry.duration));
    out.push('\n');
  }
  out.push_str(&rule);
  out.push('\n');
  out.push_str(&format!(
    "{:<width$}{}\n",
    "Total:",
    format_duration(report.total_duration()),
    width = NAME_WIDTH
  ));
  out
}

pub fn print_report(report: &Report) {
  for line in render_report(report).lines() {
    if line.ends_with("(failed)") {
      println!("{}", line.if_supports_color(Stream::Stdout, |s| s.red()));
    } else if line.ends_with("skipped") || line.ends_with("delegated") {
      println!("{}", line.if_supports_color(Stream::Stdout, |s| s.dimmed()));
    } else {
      println!("{}", line);
    }
  }
}
