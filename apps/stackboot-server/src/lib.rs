//! Stack bootstrap server.
//!
//! Composes the stack registry from static inputs, runs the bootstraps of the
//! current identity and either exits or serves the user API.

pub mod app;
pub mod cli;
pub mod infra;
pub mod stacks;

pub use app::{execute, run};
pub use cli::{Cli, Command};
