//! Context values handed to script callbacks.
//!
//! Each engine context is copied into an owned userdata so the callback can
//! keep it past the call without borrowing engine state.

use mlua::prelude::*;

use crate::engine::{self, Report};

/// The task an action, criterion or handler runs for.
#[derive(Debug, Clone)]
pub struct TaskContext {
  pub name: String,
  pub description: Option<String>,
}

impl From<&engine::TaskInfo> for TaskContext {
  fn from(info: &engine::TaskInfo) -> Self {
    Self {
      name: info.name.clone(),
      description: info.description.clone(),
    }
  }
}

impl From<&engine::ActionContext<'_>> for TaskContext {
  fn from(ctx: &engine::ActionContext<'_>) -> Self {
    ctx.task.into()
  }
}

impl LuaUserData for TaskContext {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("name", |_, this| Ok(this.name.clone()));
    fields.add_field_method_get("description", |_, this| Ok(this.description.clone()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.name.clone()));
  }
}

#[derive(Debug, Clone)]
pub struct SetupContext {
  pub target: String,
  pub tasks: Vec<String>,
}

impl From<&engine::SetupContext<'_>> for SetupContext {
  fn from(ctx: &engine::SetupContext<'_>) -> Self {
    Self {
      target: ctx.target.to_string(),
      tasks: ctx.tasks.iter().map(|t| t.name.clone()).collect(),
    }
  }
}

impl LuaUserData for SetupContext {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("target", |_, this| Ok(this.target.clone()));
    fields.add_field_method_get("tasks", |lua, this| lua.create_sequence_from(this.tasks.clone()));
  }
}

#[derive(Debug, Clone)]
pub struct TeardownContext {
  pub successful: bool,
  pub error: Option<String>,
}

impl From<&engine::TeardownContext<'_>> for TeardownContext {
  fn from(ctx: &engine::TeardownContext<'_>) -> Self {
    Self {
      successful: ctx.successful,
      error: ctx.error.map(str::to_string),
    }
  }
}

impl LuaUserData for TeardownContext {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("successful", |_, this| Ok(this.successful));
    fields.add_field_method_get("error", |_, this| Ok(this.error.clone()));
    fields.add_field_method_get("threw_exception", |_, this| Ok(this.error.is_some()));
  }
}

#[derive(Debug, Clone)]
pub struct TaskSetupContext {
  pub task: TaskContext,
  pub skipped: bool,
}

impl From<&engine::TaskSetupContext<'_>> for TaskSetupContext {
  fn from(ctx: &engine::TaskSetupContext<'_>) -> Self {
    Self {
      task: ctx.task.into(),
      skipped: ctx.skipped,
    }
  }
}

impl LuaUserData for TaskSetupContext {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("task", |_, this| Ok(this.task.clone()));
    fields.add_field_method_get("skipped", |_, this| Ok(this.skipped));
  }
}

#[derive(Debug, Clone)]
pub struct TaskTeardownContext {
  pub task: TaskContext,
  /// Seconds.
  pub duration: f64,
  pub skipped: bool,
  pub error: Option<String>,
}

impl From<&engine::TaskTeardownContext<'_>> for TaskTeardownContext {
  fn from(ctx: &engine::TaskTeardownContext<'_>) -> Self {
    Self {
      task: ctx.task.into(),
      duration: ctx.duration.as_secs_f64(),
      skipped: ctx.skipped,
      error: ctx.error.map(str::to_string),
    }
  }
}

impl LuaUserData for TaskTeardownContext {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("task", |_, this| Ok(this.task.clone()));
    fields.add_field_method_get("duration", |_, this| Ok(this.duration));
    fields.add_field_method_get("skipped", |_, this| Ok(this.skipped));
    fields.add_field_method_get("error", |_, this| Ok(this.error.clone()));
    fields.add_field_method_get("threw_exception", |_, this| Ok(this.error.is_some()));
  }
}

/// Convert a run report into a script table.
///
/// `{ entries = { { name, category, duration, status }, ... }, total_duration }`
pub fn report_to_lua(lua: &Lua, report: &Report) -> LuaResult<LuaValue> {
  let value = lua.to_value(report)?;
  if let LuaValue::Table(ref table) = value {
    table.set("total_duration", report.total_duration().as_secs_f64())?;
  }
  Ok(value)
}
