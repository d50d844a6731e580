//! Tip/Output split for plain-text CLI output.
//!
//! The split is a documented heuristic:
//!
//! 1. A line starting with a log prefix (`INFO:`, `WARN:`, `ERR:`, ...) at
//!    column 0 is always Tip, wherever it appears.
//! 2. The body starts at the first non-log line that looks like a table
//!    header or an unindented `Label: value` line.
//! 3. Every other line before the body start is Tip; everything from the body
//!    start on is Output.
//!
//! With no body start the whole buffer is Tip and Output is empty. Blank lines
//! are dropped from Tip and trimmed from both ends of Output.

use tracing::debug;

use crate::description::reflect_description;
use crate::table::{TableRow, reflect_table};
use crate::tree::Tree;
use crate::util::{LOG_PREFIXES, has_log_prefix, looks_like_table_header, split_label};

/// Rules used to classify text lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRules {
    /// Prefixes that mark a line as a log/summary line.
    pub log_prefixes: Vec<String>,
}

impl Default for TextRules {
    fn default() -> Self {
        Self {
            log_prefixes: LOG_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl TextRules {
    pub fn is_log_line(&self, line: &str) -> bool {
        has_log_prefix(line, &self.log_prefixes)
    }

    fn is_body_start(&self, line: &str) -> bool {
        if self.is_log_line(line) {
            return false;
        }
        looks_like_table_header(line)
            || (!line.starts_with(char::is_whitespace) && split_label(line).is_some())
    }
}

/// Plain-text output split into Tip and Output regions.
///
/// # Examples
///
/// ```
/// use rosacli_parser::ParsedText;
///
/// let text = "\
/// INFO: Machine pool 'mp-1' created successfully on cluster 'c-1'
/// ID       REPLICAS   INSTANCE TYPE
/// mp-1     0/3        m5.xlarge
/// ";
/// let parsed = ParsedText::parse(text);
/// assert!(parsed.tip().contains("INFO: Machine pool 'mp-1' created"));
///
/// let rows = parsed.table();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].get("INSTANCE TYPE"), Some("m5.xlarge"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedText {
    tip: Vec<String>,
    output: Vec<String>,
}

impl ParsedText {
    /// Splits `text` with the default [`TextRules`].
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, &TextRules::default())
    }

    pub fn parse_with(text: &str, rules: &TextRules) -> Self {
        let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        let body_start = lines.iter().position(|line| rules.is_body_start(line));

        let mut tip = Vec::new();
        let mut output = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let in_body = body_start.is_some_and(|start| index >= start);
            if rules.is_log_line(line) || !in_body {
                if !line.is_empty() {
                    tip.push((*line).to_string());
                }
            } else {
                output.push((*line).to_string());
            }
        }

        while output.last().is_some_and(|line| line.is_empty()) {
            output.pop();
        }
        debug!(
            tip_lines = tip.len(),
            output_lines = output.len(),
            body_found = body_start.is_some(),
            "Split text output"
        );
        Self { tip, output }
    }

    /// Applies a string rewrite to the Output region and re-reads it.
    ///
    /// Used to patch known CLI quirks before reflection.
    pub fn with_transform<F>(self, transform: F) -> Self
    where
        F: FnOnce(&str) -> String,
    {
        let rewritten = transform(&self.output());
        Self {
            tip: self.tip,
            output: rewritten.lines().map(|line| line.trim_end().to_string()).collect(),
        }
    }

    /// Tip lines joined with newlines.
    pub fn tip(&self) -> String {
        self.tip.join("\n")
    }

    /// Output lines joined with newlines.
    pub fn output(&self) -> String {
        self.output.join("\n")
    }

    pub fn tip_lines(&self) -> &[String] {
        &self.tip
    }

    pub fn output_lines(&self) -> &[String] {
        &self.output
    }

    /// Reflects the Output region as a table.
    pub fn table(&self) -> Vec<TableRow> {
        reflect_table(&self.output())
    }

    /// Reflects the Output region as a `Label: value` description.
    pub fn description(&self) -> Tree {
        reflect_description(&self.output())
    }
}
