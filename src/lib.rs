//! Core of a small Unix shell: parses a command line into an `Expression`
//! and runs it as a pipeline of processes connected by pipes, with optional
//! file redirection at both ends and fire-and-forget background execution.

pub mod builtin;
pub mod config;
pub mod error;
pub mod eval;
pub mod global;
pub mod job;
pub mod logging;
pub mod parser;
pub mod plan;
pub mod search;
pub mod shell;
pub mod spawn;
pub mod types;

pub use error::{Result, ShellError};
pub use eval::{Executor, Outcome};
pub use parser::parse;
pub use types::{Command, Expression};
