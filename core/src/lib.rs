//! Core value types for driving the `rosa` command-line tool.
//!
//! This crate holds the pieces every other layer shares:
//!
//! - [`OutputFormat`]: which global output flag (`text`, `json`, `yaml`) was
//!   active when a command ran.
//! - [`CapturedOutput`]: the immutable bytes one invocation produced, tagged
//!   with the format they were captured in.
//! - [`CommandArgs`]: an ordered, editable command line used to replay a
//!   captured invocation with some flags replaced, removed or added.
//!
//! # Example
//!
//! ```
//! use rosacli_core::CommandArgs;
//!
//! let mut cmd = CommandArgs::parse("rosa create cluster --region us-east-1 --sts -y");
//! assert_eq!(cmd.flag_value("--region"), Some("us-east-1"));
//!
//! cmd.delete_flag("--sts").unwrap();
//! assert_eq!(cmd.full_command(), "rosa create cluster --region us-east-1 -y");
//! ```

mod args;
mod error;
mod format;

pub use args::{CommandArgs, is_flag_token, tokenize};
pub use error::{ArgsError, Result};
pub use format::{CapturedOutput, OutputFormat};
