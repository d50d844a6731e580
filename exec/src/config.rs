//! Runner configuration.
//!
//! Holds everything a [`Runner`](crate::Runner) needs before its first
//! invocation. The struct is YAML-serializable so a suite can keep one file
//! per environment.
//!
//! # Example YAML
//!
//! ```yaml
//! binary: /usr/local/bin/rosa
//! format: json
//! color: never
//! debug: false
//! dir: /tmp/rosa-work
//! env:
//!   OCM_CONFIG: /tmp/ocm.json
//! timeout_secs: 600
//! auth_retry:
//!   attempts: 4
//!   delay_ms: 5000
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rosacli_core::OutputFormat;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Retry policy for the CLI's transient authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AuthRetry {
    /// Retries after the first attempt.
    pub attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for AuthRetry {
    fn default() -> Self {
        Self {
            attempts: 4,
            delay_ms: 5_000,
        }
    }
}

impl AuthRetry {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Configuration for a [`Runner`](crate::Runner).
///
/// Every field has a default, so an empty YAML document is a valid config.
///
/// # Examples
///
/// ```
/// use rosacli_core::OutputFormat;
/// use rosacli_exec::RunnerConfig;
///
/// let config: RunnerConfig = serde_yaml::from_str("format: yaml\ncolor: never\n").unwrap();
/// assert_eq!(config.binary, "rosa");
/// assert_eq!(config.format, OutputFormat::Yaml);
/// assert_eq!(config.auth_retry.attempts, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunnerConfig {
    /// Program to invoke; a bare name is looked up on `PATH`.
    pub binary: String,
    /// Output format requested from the CLI for every invocation.
    pub format: OutputFormat,
    /// Value for `--color`; `auto` leaves the flag off.
    pub color: String,
    /// Adds `--debug` to every invocation.
    pub debug: bool,
    /// Working directory; the process's current directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Extra environment variables for the child, applied in key order.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Kill the child after this many seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub auth_retry: AuthRetry,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            binary: "rosa".to_string(),
            format: OutputFormat::Text,
            color: "auto".to_string(),
            debug: false,
            dir: None,
            env: BTreeMap::new(),
            timeout_secs: None,
            auth_retry: AuthRetry::default(),
        }
    }
}

impl RunnerConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::ExecError::Io) if the file cannot be read, or
    /// [`Config`](crate::ExecError::Config) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
