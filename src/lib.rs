//! Scripted remote file operations over a session that can only move one
//! directory level at a time.
//!
//! A script is a list of shell-like command lines (`ls`, `get`, `put`,
//! `append`, `rename`, `delete`, `cd`, `mkdir`, `rmdir`). Paths in those
//! commands are resolved into single-step moves against a [`RemoteChannel`],
//! and every operation except `cd` leaves the session in the directory it
//! started from.

#[macro_use]
extern crate log;
#[macro_use]
extern crate async_trait;

/// Remote session primitives
pub mod channel;
pub mod command;
pub mod config;
mod error;
pub mod interpreter;
pub mod local;
pub mod navigator;
pub mod path;
pub mod session;
pub mod tokenizer;
pub mod transfer;
mod utils;

pub use channel::{DirectoryEntry, EntryKind, RemoteChannel};
pub use error::{Error, Result};
pub use interpreter::{Interpreter, RunResult};
pub use session::Session;
