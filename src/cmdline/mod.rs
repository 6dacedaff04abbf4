//! Command-line encoding for the child process.
//!
//! The supervisor hands the child a single command-line string and the
//! loader splits it back into `argv`:
//!
//! ```text
//! argv → encode → "prog \"two words\" \"trail\\\\\"" → decode → argv
//! ```
//!
//! The grammar is the backslash/quote convention of the Microsoft C runtime.
//! `encode` must be lossless under `decode` for every argument vector.

mod decode;
mod encode;

use std::ffi::CString;

use thiserror::Error;

pub use decode::decode;
pub use encode::{encode, encode_arg, encoded_len};

/// Errors that can occur when turning a command line into a C `argv`.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("argument {index} contains an interior NUL byte and cannot be passed to a process")]
    EncodingImpossible { index: usize },

    #[error("command line is empty")]
    Empty,
}

/// An encoded command line, owned for the lifetime of one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    line: String,
}

impl CommandLine {
    /// Encode an argument vector.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        Self { line: encode(args) }
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    /// Split the line back into arguments, the way the loader does.
    pub fn args(&self) -> Vec<String> {
        decode(&self.line)
    }

    /// Decode into a NUL-terminated `argv` ready for `execvp`.
    pub fn to_argv(&self) -> Result<Vec<CString>, EncodeError> {
        let args = self.args();
        if args.is_empty() {
            return Err(EncodeError::Empty);
        }
        args.into_iter()
            .enumerate()
            .map(|(index, arg)| {
                CString::new(arg).map_err(|_| EncodeError::EncodingImpossible { index })
            })
            .collect()
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.line)
    }
}
