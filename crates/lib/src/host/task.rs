//! The `task(name)` builder and the wrappers that turn script functions into
//! engine callbacks.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;

use super::HostState;
use super::context::TaskContext;
use crate::engine::{ActionContext, ActionError, ActionFn, CriterionFn, EngineError, ExpandFn, Task};

/// Value returned by the script's `setup` callback, passed to every action.
pub type SetupData = Rc<RefCell<LuaValue>>;

/// Handle returned by `task(name)`; every method configures the registered
/// task and returns the handle again for chaining.
#[derive(Clone)]
pub struct LuaTaskBuilder {
  name: String,
  state: Rc<HostState>,
}

impl LuaTaskBuilder {
  pub(crate) fn new(name: String, state: Rc<HostState>) -> Self {
    Self { name, state }
  }

  fn configure(&self, f: impl FnOnce(&mut Task) -> Result<(), EngineError>) -> LuaResult<Self> {
    let mut engine = self.state.engine_mut()?;
    let task = engine.task_mut(&self.name).map_err(LuaError::external)?;
    f(task).map_err(LuaError::external)?;
    Ok(self.clone())
  }

  fn setup_data(&self) -> SetupData {
    self.state.setup_data.clone()
  }
}

impl LuaUserData for LuaTaskBuilder {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("name", |_, this| Ok(this.name.clone()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("description", |_, this, text: String| {
      this.configure(|task| {
        task.set_description(text);
        Ok(())
      })
    });

    methods.add_method(
      "is_dependent_on",
      |_, this, (other, opts): (LuaValue, Option<LuaTable>)| {
        let name = task_name_of(&other)?;
        let required = !is_optional(opts)?;
        this.configure(|task| {
          task.depends_on(name, required);
          Ok(())
        })
      },
    );

    methods.add_method(
      "is_dependee_of",
      |_, this, (other, opts): (LuaValue, Option<LuaTable>)| {
        let name = task_name_of(&other)?;
        let required = !is_optional(opts)?;
        this.configure(|task| {
          task.dependee_of(name, required);
          Ok(())
        })
      },
    );

    methods.add_method(
      "with_criteria",
      |_, this, (criterion, message): (LuaValue, Option<String>)| {
        let predicate = criterion_fn(criterion)?;
        this.configure(|task| {
          task.with_criteria(predicate, message);
          Ok(())
        })
      },
    );

    methods.add_method("does", |_, this, func: LuaFunction| {
      let action = action_fn(func, this.setup_data());
      this.configure(|task| {
        task.does(action);
        Ok(())
      })
    });

    methods.add_method(
      "does_for_each",
      |_, this, (items, func): (LuaValue, LuaFunction)| {
        let expand = for_each_fn(items, func, this.setup_data())?;
        this.configure(|task| {
          task.does_expanded(expand);
          Ok(())
        })
      },
    );

    methods.add_method("on_error", |_, this, func: LuaFunction| {
      this.configure(|task| {
        task
          .on_error(Box::new(move |err: &ActionError, ctx: &ActionContext<'_>| {
            func.call::<()>((script_message(err), TaskContext::from(ctx)))?;
            Ok(())
          }))
          .map(|_| ())
      })
    });

    methods.add_method("continue_on_error", |_, this, ()| {
      this.configure(|task| task.continue_on_error().map(|_| ()))
    });

    methods.add_method("report_error", |_, this, func: LuaFunction| {
      this.configure(|task| {
        task
          .report_error(Box::new(move |err: &ActionError| {
            func.call::<()>(script_message(err))?;
            Ok(())
          }))
          .map(|_| ())
      })
    });

    methods.add_method("finally", |_, this, func: LuaFunction| {
      this.configure(|task| {
        task
          .finally(Box::new(move |ctx: &ActionContext<'_>| {
            func.call::<()>(TaskContext::from(ctx))?;
            Ok(())
          }))
          .map(|_| ())
      })
    });

    methods.add_method("defer_on_error", |_, this, ()| {
      this.configure(|task| {
        task.defer_on_error();
        Ok(())
      })
    });

    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.name.clone()));
  }
}

/// Error text handed to script handlers, without the Lua traceback.
fn script_message(err: &ActionError) -> String {
  let text = err.to_string();
  match text.split_once("\nstack traceback:") {
    Some((message, _)) => message.to_string(),
    None => text,
  }
}

/// Accept either a task name or a task handle.
fn task_name_of(value: &LuaValue) -> LuaResult<String> {
  match value {
    LuaValue::String(s) => Ok(s.to_str()?.to_string()),
    LuaValue::UserData(ud) => Ok(ud.borrow::<LuaTaskBuilder>()?.name.clone()),
    other => Err(LuaError::external(format!(
      "expected a task name or task, got {}",
      other.type_name()
    ))),
  }
}

fn is_optional(opts: Option<LuaTable>) -> LuaResult<bool> {
  match opts {
    Some(opts) => Ok(opts.get::<Option<bool>>("optional")?.unwrap_or(false)),
    None => Ok(false),
  }
}

/// A task action: `fn(ctx, setup_data)`.
pub(crate) fn action_fn(func: LuaFunction, data: SetupData) -> ActionFn {
  Box::new(move |ctx: &ActionContext<'_>| {
    let data = data.borrow().clone();
    func.call::<()>((TaskContext::from(ctx), data))?;
    Ok(())
  })
}

/// A criterion: a fixed boolean or `fn(ctx) -> bool`.
fn criterion_fn(value: LuaValue) -> LuaResult<CriterionFn> {
  match value {
    LuaValue::Boolean(holds) => Ok(Box::new(move |_: &ActionContext<'_>| Ok(holds))),
    LuaValue::Function(func) => Ok(Box::new(move |ctx: &ActionContext<'_>| {
      Ok(func.call::<bool>(TaskContext::from(ctx))?)
    })),
    other => Err(LuaError::external(format!(
      "criteria must be a boolean or a function, got {}",
      other.type_name()
    ))),
  }
}

enum ItemSource {
  Fixed(Vec<LuaValue>),
  /// `fn(ctx) -> table`, called when the task runs.
  Lazy(LuaFunction),
}

/// One action per item: `fn(item, ctx, setup_data)`.
fn for_each_fn(items: LuaValue, func: LuaFunction, data: SetupData) -> LuaResult<ExpandFn> {
  let source = match items {
    LuaValue::Table(table) => ItemSource::Fixed(table.sequence_values::<LuaValue>().collect::<LuaResult<_>>()?),
    LuaValue::Function(f) => ItemSource::Lazy(f),
    other => {
      return Err(LuaError::external(format!(
        "does_for_each expects a table or a function, got {}",
        other.type_name()
      )));
    }
  };

  Ok(Box::new(move |ctx: &ActionContext<'_>| {
    let items = match &source {
      ItemSource::Fixed(items) => items.clone(),
      ItemSource::Lazy(f) => {
        let table = f.call::<LuaTable>(TaskContext::from(ctx))?;
        table
          .sequence_values::<LuaValue>()
          .collect::<LuaResult<Vec<_>>>()?
      }
    };

    let actions = items
      .into_iter()
      .map(|item| {
        let func = func.clone();
        let data = data.clone();
        Box::new(move |ctx: &ActionContext<'_>| {
          let data = data.borrow().clone();
          func.call::<()>((item.clone(), TaskContext::from(ctx), data))?;
          Ok(())
        }) as ActionFn
      })
      .collect();
    Ok(actions)
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn script_message_drops_traceback() {
    let err = ActionError::msg("boom\nstack traceback:\n\t[C]: in function 'error'");
    assert_eq!(script_message(&err), "boom");
    assert_eq!(script_message(&ActionError::msg("plain")), "plain");
  }
}
