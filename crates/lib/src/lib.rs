//! mortar-lib: build automation driven by Lua scripts
//!
//! - `engine`: tasks, the dependency graph and target execution
//! - `host`: the Lua session that exposes the engine to build scripts
//! - `tools`: locating and running external executables
//! - `config`: settings from `mortar.toml` and the environment

pub mod args;
pub mod config;
pub mod consts;
pub mod engine;
pub mod host;
pub mod init;
pub mod platform;
pub mod tools;
pub mod util;
