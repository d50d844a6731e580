//! Output format tags and captured command output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArgsError;

/// Global output format the CLI was asked to produce.
///
/// `Text` is the CLI default (no `--output` flag): human-oriented log lines
/// followed by a table or a `Label: value` block.
///
/// # Examples
///
/// ```
/// use rosacli_core::OutputFormat;
///
/// assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
/// assert_eq!("none".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
/// assert_eq!(OutputFormat::Yaml.flag_value(), Some("yaml"));
/// assert_eq!(OutputFormat::Text.flag_value(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text, the CLI default.
    #[default]
    #[serde(alias = "none")]
    Text,
    /// `--output json`.
    Json,
    /// `--output yaml`.
    Yaml,
}

impl OutputFormat {
    /// Value passed to `--output`, or `None` when no flag is needed.
    pub fn flag_value(self) -> Option<&'static str> {
        match self {
            Self::Text => None,
            Self::Json => Some("json"),
            Self::Yaml => Some("yaml"),
        }
    }

    /// Returns `true` for the structured formats.
    pub fn is_structured(self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ArgsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "none" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(ArgsError::UnknownFormat(other.to_string())),
        }
    }
}

/// Bytes produced by one command invocation plus the format they were
/// captured in.
///
/// Never mutated after construction. Re-parsing the same buffer in another
/// mode is fine since the parsers only borrow it.
///
/// # Examples
///
/// ```
/// use rosacli_core::{CapturedOutput, OutputFormat};
///
/// let out = CapturedOutput::new(b"INFO: done\n".to_vec(), OutputFormat::Text);
/// assert!(out.contains("done"));
/// assert_eq!(out.format(), OutputFormat::Text);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapturedOutput {
    bytes: Vec<u8>,
    format: OutputFormat,
}

impl CapturedOutput {
    pub fn new(bytes: Vec<u8>, format: OutputFormat) -> Self {
        Self { bytes, format }
    }

    /// Text output, the common case for fixtures.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into().into_bytes(), OutputFormat::Text)
    }

    /// Same bytes viewed under another declared format.
    pub fn with_format(&self, format: OutputFormat) -> Self {
        Self::new(self.bytes.clone(), format)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Lossy UTF-8 view of the captured bytes.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Substring check over the lossy text, the most frequent assertion.
    pub fn contains(&self, needle: &str) -> bool {
        self.to_text().contains(needle)
    }
}

impl fmt::Display for CapturedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}
