//! Error types for argument editing and format selection.

use thiserror::Error;

/// Errors raised by strict operations on the core types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgsError {
    /// A destructive edit named a flag the command line does not contain.
    #[error("flag not present in command: {0}")]
    FlagNotFound(String),

    /// An output format name was not one of `text`, `none`, `json`, `yaml`.
    #[error("unknown output format: {0}")]
    UnknownFormat(String),
}

/// Convenience alias for results with [`ArgsError`].
pub type Result<T> = std::result::Result<T, ArgsError>;
