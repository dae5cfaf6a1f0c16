//! Interpreter core for a small command language.
//!
//! Lines of text such as `remember("x") as "tag"` or `goal: "ship v1" priority: high`
//! are parsed into structured commands and executed against a registry of pluggable
//! collaborators (memory, goals, agent, plugins, ...). When the real collaborators
//! cannot be acquired, deterministic fallbacks are wired instead, so the interpreter
//! always runs.
//!
//! The main entry point is [`Interpreter`]. Collaborator contracts live in [`ports`];
//! their demo implementations in [`fallback`].

pub mod block;
mod builtin;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod features;
mod interpreter;
pub mod lexer;
pub mod parser;
pub mod ports;
pub mod session;

pub use config::InterpreterConfig;
/// Just a convenient re-export of the orchestrating interpreter.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, SystemStatus};
