//! Error types for strict parsing and typed reflection.

use rosacli_core::OutputFormat;
use thiserror::Error;

/// Errors from the strict entry points ([`Tree::try_parse`](crate::Tree::try_parse)
/// and the `deserialize` reflectors). The permissive entry points never
/// produce these.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A tree was requested for output captured without a structured format.
    #[error("cannot build a tree from {0} output")]
    Unstructured(OutputFormat),

    /// Parsed values do not fit the requested record type.
    #[error("cannot reflect output into target type: {0}")]
    Reflect(#[source] serde_json::Error),
}

/// Convenience alias for results with [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;
