//! Error types for command execution and the resource services.
//!
//! Execution failures that happen after the child produced output keep that
//! output, so callers can assert on the CLI's own error message.

use rosacli_core::{ArgsError, CapturedOutput};
use rosacli_parser::ParseError;
use thiserror::Error;

/// Errors that can occur while running the CLI or reflecting its output.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The binary could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// File or pipe I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The child exited unsuccessfully.
    #[error("command exited with {}: {}", exit_label(.code), .output.to_text().trim_end())]
    Exit {
        code: Option<i32>,
        output: CapturedOutput,
    },

    /// The child outlived the configured timeout and was killed.
    #[error("command timed out after {secs}s")]
    Timeout { secs: u64, output: CapturedOutput },

    /// The CLI kept failing to obtain an authentication token.
    #[error("not able to get authentication token after {attempts} attempts")]
    AuthRetryExhausted {
        attempts: u32,
        output: CapturedOutput,
    },

    /// Runner configuration could not be parsed or written.
    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    /// Output could not be reflected into the requested record type.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A command line could not be edited or replayed.
    #[error(transparent)]
    Args(#[from] ArgsError),

    /// A version string is not valid semver.
    #[error("invalid version: {0}")]
    Version(#[from] semver::Error),

    /// The executor cannot run this kind of request.
    #[error("{0} are not supported by this executor")]
    Unsupported(String),

    /// An expected record is missing from otherwise valid output.
    #[error("{0}")]
    NotFound(String),

    /// One or more resources could not be removed during cleanup.
    #[error("{} resource(s) could not be cleaned up: {}", .0.len(), join_errors(.0))]
    Cleanup(Vec<ExecError>),
}

impl ExecError {
    /// Output captured before the failure, when there is any.
    pub fn output(&self) -> Option<&CapturedOutput> {
        match self {
            ExecError::Exit { output, .. }
            | ExecError::Timeout { output, .. }
            | ExecError::AuthRetryExhausted { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Exit code of a failed child, if it exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::Exit { code, .. } => *code,
            _ => None,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

fn join_errors(errors: &[ExecError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`ExecError`].
pub type Result<T> = std::result::Result<T, ExecError>;
