//! `Label: value` reflection for single-record "describe" output.
//!
//! Column-0 labels become entries of an ordered object. Indented lines refine
//! the most recent entry:
//!
//! * `- Key: value` starts a new map item in a list, deeper `Key: value`
//!   lines extend that item;
//! * `- text` adds a string item;
//! * `Key: value` directly under an empty label builds a nested map;
//! * anything else continues the previous value on a new line.
//!
//! A label whose value is a lone `|` takes every following indented line as
//! literal text. Values stay strings; typed records decide how to read them.

use serde_json::{Map, Value};
use tracing::debug;

use crate::tree::Tree;
use crate::util::{is_log_line, split_label};

/// Reflects describe-style `output` into a [`Tree`] whose root is an object.
///
/// # Examples
///
/// ```
/// use rosacli_parser::reflect_description;
///
/// let tree = reflect_description("\
/// Name:       demo
/// Network:
///  - Type:           OVNKubernetes
///  - Machine CIDR:   10.0.0.0/16
/// ");
/// assert_eq!(tree.dig_string(["Name"]), "demo");
/// assert_eq!(tree.dig_string(["Network", "1", "Machine CIDR"]), "10.0.0.0/16");
/// ```
pub fn reflect_description(output: &str) -> Tree {
    let mut root = Map::new();
    let mut current: Option<String> = None;
    let mut literal = false;

    for line in output.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            continue;
        }
        let indented = line.starts_with(char::is_whitespace);
        if !indented && !is_log_line(line) {
            if let Some((label, value)) = split_label(line) {
                let key = unique_key(&root, label);
                literal = value == "|";
                let value = if literal { "" } else { value };
                root.insert(key.clone(), Value::String(value.to_string()));
                current = Some(key);
                continue;
            }
        }
        let Some(entry) = current.as_ref().and_then(|key| root.get_mut(key)) else {
            continue;
        };
        if literal && indented {
            append_line(entry, line.trim_start());
        } else {
            extend_entry(entry, line.trim_start());
        }
    }

    debug!(labels = root.len(), "Reflected description");
    Tree::new(Value::Object(root))
}

fn unique_key(root: &Map<String, Value>, label: &str) -> String {
    if !root.contains_key(label) {
        return label.to_string();
    }
    (2..)
        .map(|n| format!("{label}_{n}"))
        .find(|candidate| !root.contains_key(candidate))
        .unwrap_or_else(|| label.to_string())
}

fn extend_entry(entry: &mut Value, text: &str) {
    if let Some(item) = list_item(text) {
        let item = match split_label(item) {
            Some((key, value)) => {
                let mut map = Map::new();
                map.insert(key.to_string(), Value::String(value.to_string()));
                Value::Object(map)
            }
            None => Value::String(item.to_string()),
        };
        push_item(entry, item);
        return;
    }

    if entry.as_str() == Some("") {
        if let Some((key, value)) = split_label(text) {
            let mut map = Map::new();
            map.insert(key.to_string(), Value::String(value.to_string()));
            *entry = Value::Object(map);
            return;
        }
    }

    if matches!(entry, Value::Array(items) if items.is_empty()) {
        push_item(entry, Value::String(text.to_string()));
        return;
    }

    let target = match entry {
        Value::Array(items) => items.last_mut(),
        other => Some(other),
    };
    match target {
        Some(Value::Object(map)) => match split_label(text) {
            Some((key, value)) => {
                map.insert(key.to_string(), Value::String(value.to_string()));
            }
            None => {
                if let Some((_, last)) = map.iter_mut().next_back() {
                    append_line(last, text);
                }
            }
        },
        Some(value) => append_line(value, text),
        None => {}
    }
}

fn list_item(text: &str) -> Option<&str> {
    if text == "-" {
        return Some("");
    }
    text.strip_prefix("- ").map(str::trim)
}

/// Pushes `item` onto the list held by `entry`, turning a scalar into a list
/// first (an empty string becomes an empty list).
fn push_item(entry: &mut Value, item: Value) {
    let mut items = match entry.take() {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::String(text) if text.is_empty() => Vec::new(),
        other => vec![other],
    };
    items.push(item);
    *entry = Value::Array(items);
}

fn append_line(value: &mut Value, text: &str) {
    if let Value::String(existing) = value {
        if !existing.is_empty() {
            existing.push('\n');
        }
        existing.push_str(text);
    }
}
