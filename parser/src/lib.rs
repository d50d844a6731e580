//! Parsers and reflectors for `rosa` command output.
//!
//! - [`ParsedText`]: splits plain-text output into the leading log/summary
//!   lines (Tip) and the body (Output).
//! - [`reflect_table`] / [`reflect_rows`]: column-aligned tables to ordered
//!   [`TableRow`]s or typed records.
//! - [`reflect_description`]: `Label: value` blocks to a [`Tree`].
//! - [`Tree`]: JSON/YAML documents with zero-value `dig_*` accessors.
//! - [`extract_aws_commands`]: the follow-up `aws` commands printed by
//!   `--mode manual`, as [`CommandArgs`](rosacli_core::CommandArgs).
//! - [`Parser`]: dispatches a [`CapturedOutput`](rosacli_core::CapturedOutput)
//!   on its declared format.
//!
//! Text parsing is heuristic and permissive. Malformed input degrades to
//! empty structures instead of errors; only the explicit `try_*` and
//! `deserialize` entry points return [`ParseError`].
//!
//! # Example
//!
//! ```
//! use rosacli_parser::ParsedText;
//!
//! let parsed = ParsedText::parse(
//!     "INFO: Machine pool 'mp-1' created successfully on cluster 'c-1'\n\
//!      ID       REPLICAS   INSTANCE TYPE\n\
//!      mp-1     0/3        m5.xlarge\n",
//! );
//! assert!(parsed.tip().starts_with("INFO:"));
//!
//! let row = &parsed.table()[0];
//! assert_eq!(row.get("ID"), Some("mp-1"));
//! assert_eq!(row.get("REPLICAS"), Some("0/3"));
//! assert_eq!(row.get("INSTANCE TYPE"), Some("m5.xlarge"));
//! ```

mod commands;
mod description;
mod error;
mod output;
mod table;
mod text;
mod tree;
pub mod util;

pub use commands::extract_aws_commands;
pub use description::reflect_description;
pub use error::{ParseError, Result};
pub use output::{ParsedOutput, Parser};
pub use table::{TableRow, reflect_rows, reflect_table};
pub use text::{ParsedText, TextRules};
pub use tree::{Segment, Tree, yaml_to_json};
