//! Run report.

use std::time::Duration;

use serde::{Serialize, Serializer};

use super::task::same_name;

/// What happened to a task (or lifecycle step) during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
  Executed,
  Delegated,
  Skipped,
  Failed,
}

impl TaskStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      TaskStatus::Executed => "Executed",
      TaskStatus::Delegated => "Delegated",
      TaskStatus::Skipped => "Skipped",
      TaskStatus::Failed => "Failed",
    }
  }
}

/// Which part of the run an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCategory {
  Setup,
  Task,
  Teardown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
  pub name: String,
  pub category: EntryCategory,
  #[serde(serialize_with = "serialize_secs")]
  pub duration: Duration,
  pub status: TaskStatus,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
  serializer.serialize_f64(duration.as_secs_f64())
}

/// Ordered record of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
  entries: Vec<ReportEntry>,
}

impl Report {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, name: impl Into<String>, category: EntryCategory, duration: Duration) {
    self.push(name, category, duration, TaskStatus::Executed);
  }

  pub fn add_delegated(&mut self, name: impl Into<String>, duration: Duration) {
    self.push(name, EntryCategory::Task, duration, TaskStatus::Delegated);
  }

  pub fn add_skipped(&mut self, name: impl Into<String>) {
    self.push(name, EntryCategory::Task, Duration::ZERO, TaskStatus::Skipped);
  }

  pub fn add_failed(&mut self, name: impl Into<String>, duration: Duration) {
    self.push(name, EntryCategory::Task, duration, TaskStatus::Failed);
  }

  fn push(&mut self, name: impl Into<String>, category: EntryCategory, duration: Duration, status: TaskStatus) {
    self.entries.push(ReportEntry {
      name: name.into(),
      category,
      duration,
      status,
    });
  }

  pub fn entries(&self) -> &[ReportEntry] {
    &self.entries
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Number of entries with the given status.
  pub fn count(&self, status: TaskStatus) -> usize {
    self.entries.iter().filter(|e| e.status == status).count()
  }

  pub fn total_duration(&self) -> Duration {
    self.entries.iter().map(|e| e.duration).sum()
  }

  /// Look up a task entry by name (case-insensitive).
  pub fn get(&self, name: &str) -> Option<&ReportEntry> {
    self.entries.iter().find(|e| same_name(&e.name, name))
  }
}
