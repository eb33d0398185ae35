//! CLI error types.

use std::fmt;

use nos_jobs::JobsError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or unreadable configuration or snapshot.
    Config(String),
    /// The program rejected the instruction.
    Program(JobsError),
    /// No key with this name in the keyring.
    UnknownKey(String),
    /// A key with this name already exists.
    KeyExists(String),
    /// Invalid argument.
    InvalidArgument(String),
    /// Output formatting error.
    Format(String),
    /// IO error.
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Program(e) => write!(f, "rejected: {e}"),
            Self::UnknownKey(name) => write!(f, "unknown key: {name}"),
            Self::KeyExists(name) => write!(f, "key already exists: {name}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Program(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<JobsError> for CliError {
    fn from(err: JobsError) -> Self {
        Self::Program(err)
    }
}
