//! sproc-core: an interpreter for stored-procedure programs
//!
//! - `interpreter`: scopes, evaluation, control flow, invocation, builtins
//! - `store`: procedure and document stores (memory and Postgres)
//! - `config`, `db`, `application`, `cli`: loading, wiring and the `sproc` binary

pub mod application;
pub mod cli;
pub mod config;
pub mod db;
pub mod interpreter;
pub mod store;

// Re-export main types
pub use application::Application;
pub use config::Config;
pub use interpreter::{ExecError, Interpreter, Program, RunOutcome, Val};
