//! wakeguard keeps a machine awake for as long as a session or a command
//! runs.
//!
//! - [`cmdline`] encodes an argument vector into one command line that
//!   decodes back byte-for-byte.
//! - [`job`] supervises a whole process tree and reports when it is empty.
//! - [`session`] is the named signal a later `end` uses to stop a `start`.

pub mod cli;
pub mod cmdline;
pub mod commands;
pub mod config;
pub mod job;
pub mod logging;
pub mod power;
pub mod session;
pub mod shutdown;
