//! Line classification helpers shared by the text, table and description
//! parsers.
//!
//! Everything here is heuristic: the CLI's text output is meant for people,
//! so these rules describe what it usually looks like rather than a grammar.

use std::sync::LazyLock;

use regex::Regex;

/// Log-level prefixes the CLI writes in front of summary lines.
pub const LOG_PREFIXES: &[&str] = &[
    "INFO:", "WARN:", "WARNING:", "ERR:", "ERROR:", "I:", "W:", "E:", "? ",
];

/// `Label: value` with the label ending at the first colon that is followed
/// by whitespace or end of line, so `arn:aws:...` and URLs stay in the value.
static LABEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<label>[^:\s][^:]*?):(?:\s+(?P<value>.*))?$").expect("valid label regex")
});

/// Returns `true` when the line starts with one of `prefixes` at column 0.
///
/// Indented text such as `   E: 5` inside a description body is content,
/// not a log line.
pub fn has_log_prefix(line: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| line.starts_with(prefix.as_str()))
}

/// Returns `true` when the line starts with a default [`LOG_PREFIXES`] entry
/// at column 0.
pub fn is_log_line(line: &str) -> bool {
    LOG_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// Splits a column-aligned line on runs of two or more spaces (or a tab).
///
/// Returns each cell with the char offset where it starts.
pub fn split_columns(line: &str) -> Vec<(usize, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut columns = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }
        let start = i;
        while i < chars.len() {
            if chars[i] == '\t' {
                break;
            }
            if chars[i] == ' ' && chars.get(i + 1).is_some_and(|next| next.is_whitespace()) {
                break;
            }
            if chars[i] == ' ' && i + 1 == chars.len() {
                break;
            }
            i += 1;
        }
        let cell: String = chars[start..i].iter().collect();
        columns.push((start, cell.trim_end().to_string()));
    }
    columns
}

/// Returns `true` when the line looks like a table header row.
///
/// Requires at least two columns, every column starting with an uppercase
/// letter or digit, at least one fully uppercase column, and no column ending
/// in `:` (which would make it a description label). A single uppercase word
/// (`ID`) is deliberately not treated as a header.
pub fn looks_like_table_header(line: &str) -> bool {
    if line.trim().is_empty() || is_log_line(line) {
        return false;
    }
    let columns = split_columns(line);
    if columns.len() < 2 {
        return false;
    }
    let starts_upper = columns.iter().all(|(_, name)| {
        name.chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
    });
    let any_all_upper = columns.iter().any(|(_, name)| {
        name.chars().any(|ch| ch.is_ascii_uppercase())
            && !name.chars().any(|ch| ch.is_lowercase())
    });
    let no_labels = columns.iter().all(|(_, name)| !name.ends_with(':'));
    starts_upper && any_all_upper && no_labels
}

/// Splits `Label: value` into its parts. The value may be empty.
///
/// ```
/// use rosacli_parser::util::split_label;
///
/// assert_eq!(split_label("API URL:   https://api.example.com:6443"),
///            Some(("API URL", "https://api.example.com:6443")));
/// assert_eq!(split_label("Network:"), Some(("Network", "")));
/// assert_eq!(split_label("arn:aws:iam::123:role/x"), None);
/// ```
pub fn split_label(line: &str) -> Option<(&str, &str)> {
    let caps = LABEL_LINE.captures(line.trim_end())?;
    let label = caps.name("label")?.as_str().trim_end();
    let value = caps.name("value").map_or("", |m| m.as_str().trim());
    Some((label, value))
}

/// Returns `true` for an unindented `Label: value` line that is not a log line.
pub fn looks_like_description_line(line: &str) -> bool {
    !line.starts_with(char::is_whitespace) && !is_log_line(line) && split_label(line).is_some()
}

/// Splits a comma-separated cell (`a, b,c`) into trimmed, non-empty parts.
///
/// ```
/// use rosacli_parser::util::parse_comma_separated;
///
/// assert_eq!(parse_comma_separated("4.15.1, 4.15.2,"), vec!["4.15.1", "4.15.2"]);
/// assert!(parse_comma_separated("").is_empty());
/// ```
pub fn parse_comma_separated(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
