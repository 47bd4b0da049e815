//! Script arguments.
//!
//! Arguments are passed on the command line as `-a key=value` and read by the
//! script through `argument()`/`has_argument()`. Names are case-insensitive.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
  #[error("argument name cannot be empty: '{0}'")]
  EmptyName(String),

  #[error("argument '{0}' was not set")]
  Missing(String),
}

/// Case-insensitive script arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
  /// Lowercased name -> value.
  values: BTreeMap<String, String>,
}

impl Arguments {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set an argument, replacing any previous value.
  pub fn set(&mut self, name: &str, value: impl Into<String>) {
    self.values.insert(name.to_lowercase(), value.into());
  }

  pub fn has(&self, name: &str) -> bool {
    self.values.contains_key(&name.to_lowercase())
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.values.get(&name.to_lowercase()).map(String::as_str)
  }

  /// Value of `name`, or an error naming the missing argument.
  pub fn require(&self, name: &str) -> Result<&str, ArgumentError> {
    self.get(name).ok_or_else(|| ArgumentError::Missing(name.to_string()))
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Parse `key=value` pairs. A bare `key` is a switch and reads as `"true"`.
  pub fn parse<I, S>(pairs: I) -> Result<Self, ArgumentError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut args = Self::new();
    for pair in pairs {
      let (name, value) = parse_pair(pair.as_ref())?;
      args.set(name, value);
    }
    Ok(args)
  }
}

/// Split a single `key=value` pair.
pub fn parse_pair(raw: &str) -> Result<(&str, &str), ArgumentError> {
  let (name, value) = match raw.split_once('=') {
    Some((name, value)) => (name.trim(), value),
    None => (raw.trim(), "true"),
  };
  if name.is_empty() {
    return Err(ArgumentError::EmptyName(raw.to_string()));
  }
  Ok((name, value))
}
