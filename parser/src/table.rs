//! Column-aligned table reflection.
//!
//! Column boundaries come from the header line once; every data line is then
//! sliced at the same character offsets, so cells with single embedded spaces
//! stay intact and ragged rows yield empty cells.

use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ParseError, Result};
use crate::util::split_columns;

/// One data row of a reflected table, keyed by header name in column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableRow {
    cells: Vec<(String, String)>,
}

impl TableRow {
    pub fn new(cells: Vec<(String, String)>) -> Self {
        Self { cells }
    }

    /// Cell for `column`, or `None` when the table has no such column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Cell for `column`, empty when absent.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Converts the row into a JSON object with header names as keys.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .cells
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        Value::Object(map)
    }

    /// Maps the row onto a typed record.
    ///
    /// Field names are matched against header names, so records usually
    /// carry `#[serde(rename = "INSTANCE TYPE")]` style attributes.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_value()).map_err(ParseError::Reflect)
    }
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct Column {
    name: String,
    start: usize,
}

fn header_columns(header: &str) -> Vec<Column> {
    let mut seen: Vec<String> = Vec::new();
    split_columns(header)
        .into_iter()
        .map(|(start, label)| {
            let repeats = seen.iter().filter(|name| **name == label).count();
            seen.push(label.clone());
            let name = if repeats == 0 {
                label
            } else {
                format!("{label}_{}", repeats + 1)
            };
            Column { name, start }
        })
        .collect()
}

fn slice_cells(line: &str, columns: &[Column]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let end = columns
                .get(index + 1)
                .map_or(chars.len(), |next| next.start.min(chars.len()));
            if column.start >= end {
                return String::new();
            }
            chars[column.start..end]
                .iter()
                .collect::<String>()
                .trim()
                .to_string()
        })
        .collect()
}

/// Reflects column-aligned `output` into rows.
///
/// The first non-blank line is the header. Blank lines are skipped. A line
/// whose first column is blank but which has other content continues the
/// previous row; its cells are appended with a newline.
///
/// # Examples
///
/// ```
/// use rosacli_parser::reflect_table;
///
/// let rows = reflect_table("ID     AUTOSCALING  LABELS\nmp-1   No           env=dev\nmp-2   Yes\n");
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0].get("LABELS"), Some("env=dev"));
/// assert_eq!(rows[1].get("LABELS"), Some(""));
/// ```
pub fn reflect_table(output: &str) -> Vec<TableRow> {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns = header_columns(header);
    if columns.is_empty() {
        return Vec::new();
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for line in lines {
        let cells = slice_cells(line, &columns);
        let continuation = cells[0].is_empty() && cells.iter().any(|cell| !cell.is_empty());
        match rows.last_mut() {
            Some(previous) if continuation => {
                for (target, extra) in previous.iter_mut().zip(cells) {
                    if extra.is_empty() {
                        continue;
                    }
                    if !target.is_empty() {
                        target.push('\n');
                    }
                    target.push_str(&extra);
                }
            }
            _ => rows.push(cells),
        }
    }

    debug!(columns = columns.len(), rows = rows.len(), "Reflected table");
    rows.into_iter()
        .map(|cells| {
            TableRow::new(
                columns
                    .iter()
                    .map(|column| column.name.clone())
                    .zip(cells)
                    .collect(),
            )
        })
        .collect()
}

/// Reflects `output` as a table and maps every row onto `T`.
pub fn reflect_rows<T: DeserializeOwned>(output: &str) -> Result<Vec<T>> {
    reflect_table(output)
        .iter()
        .map(TableRow::deserialize)
        .collect()
}
