//! Generic JSON/YAML trees with zero-value "dig" accessors.
//!
//! Both formats land in a [`serde_json::Value`] (object key order preserved),
//! so callers dig through YAML and JSON output the same way. Lookups never
//! fail: a missing segment or a value of the wrong kind yields the documented
//! zero value (`""`, `false`, `0.0`, `None`).

use rosacli_core::OutputFormat;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{ParseError, Result};
use crate::util::parse_comma_separated;

/// One step of a dig path.
///
/// A key segment that parses as an integer also indexes arrays, so a path
/// read from text (`items.0.name`) works without knowing the tree's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> Segment<'a> {
    /// Splits a dotted path (`aws.kms_key_arn`, `items.0`) into key segments.
    pub fn split_path(path: &'a str) -> Vec<Segment<'a>> {
        path.split('.')
            .filter(|part| !part.is_empty())
            .map(Segment::Key)
            .collect()
    }

    fn lookup<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match (self, value) {
            (Segment::Key(key), Value::Object(map)) => map.get(*key),
            (Segment::Key(key), Value::Array(items)) => {
                key.parse::<usize>().ok().and_then(|index| items.get(index))
            }
            (Segment::Index(index), Value::Array(items)) => items.get(*index),
            (Segment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
            _ => None,
        }
    }
}

impl<'a> From<&'a str> for Segment<'a> {
    fn from(key: &'a str) -> Self {
        Segment::Key(key)
    }
}

impl<'a> From<&'a String> for Segment<'a> {
    fn from(key: &'a String) -> Self {
        Segment::Key(key.as_str())
    }
}

impl From<usize> for Segment<'_> {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// A parsed JSON or YAML document.
///
/// # Examples
///
/// ```
/// use rosacli_core::OutputFormat;
/// use rosacli_parser::Tree;
///
/// let tree = Tree::parse(br#"{"aws":{"kms_key_arn":"arn:aws:kms:us-east-1:1:key/k"}}"#, OutputFormat::Json);
/// assert_eq!(tree.dig_string(["aws", "kms_key_arn"]), "arn:aws:kms:us-east-1:1:key/k");
/// assert_eq!(tree.dig_string(["aws", "missing"]), "");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tree {
    root: Value,
}

impl Tree {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Parses `bytes` in `format`, degrading to an empty (`Null`) tree on any
    /// failure.
    pub fn parse(bytes: &[u8], format: OutputFormat) -> Self {
        Self::try_parse(bytes, format).unwrap_or_else(|err| {
            debug!(%format, error = %err, "Falling back to empty tree");
            Self::default()
        })
    }

    /// Parses `bytes` in `format`, reporting malformed input.
    pub fn try_parse(bytes: &[u8], format: OutputFormat) -> Result<Self> {
        match format {
            OutputFormat::Json => Ok(Self::new(serde_json::from_slice(bytes)?)),
            OutputFormat::Yaml => {
                let value: serde_yaml::Value = serde_yaml::from_slice(bytes)?;
                Ok(Self::new(yaml_to_json(value)))
            }
            OutputFormat::Text => Err(ParseError::Unstructured(format)),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::try_parse(text.as_bytes(), OutputFormat::Json)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::try_parse(text.as_bytes(), OutputFormat::Yaml)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_value(self) -> Value {
        self.root
    }

    pub fn is_null(&self) -> bool {
        self.root.is_null()
    }

    /// Value at `path`, or `None` if any segment is missing.
    pub fn dig_object<'p, P>(&self, path: P) -> Option<&Value>
    where
        P: IntoIterator,
        P::Item: Into<Segment<'p>>,
    {
        path.into_iter().try_fold(&self.root, |value, segment| {
            let segment: Segment<'p> = segment.into();
            segment.lookup(value)
        })
    }

    /// String at `path`; `""` when missing or not a string.
    pub fn dig_string<'p, P>(&self, path: P) -> String
    where
        P: IntoIterator,
        P::Item: Into<Segment<'p>>,
    {
        self.dig_object(path)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Boolean at `path`; `false` when missing or not a boolean.
    pub fn dig_bool<'p, P>(&self, path: P) -> bool
    where
        P: IntoIterator,
        P::Item: Into<Segment<'p>>,
    {
        self.dig_object(path)
            .and_then(Value::as_bool)
            .unwrap_or_default()
    }

    /// Number at `path`; `0.0` when missing or not a number.
    pub fn dig_float<'p, P>(&self, path: P) -> f64
    where
        P: IntoIterator,
        P::Item: Into<Segment<'p>>,
    {
        self.dig_object(path)
            .and_then(Value::as_f64)
            .unwrap_or_default()
    }

    /// Strings at `path`: a string array, or a comma-separated string.
    /// Scalars inside an array are rendered with their JSON text.
    pub fn dig_strings<'p, P>(&self, path: P) -> Vec<String>
    where
        P: IntoIterator,
        P::Item: Into<Segment<'p>>,
    {
        match self.dig_object(path) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Number(_) | Value::Bool(_) => Some(item.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(text)) => parse_comma_separated(text),
            _ => Vec::new(),
        }
    }

    /// Maps the whole tree onto a typed record.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.root.clone()).map_err(ParseError::Reflect)
    }
}

impl From<Value> for Tree {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

/// Converts a YAML value into the JSON model. Non-string mapping keys are
/// stringified; tags are dropped in favour of the tagged value.
pub fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(flag) => Value::Bool(flag),
        serde_yaml::Value::Number(number) => yaml_number(&number),
        serde_yaml::Value::String(text) => Value::String(text),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let map: Map<String, Value> = mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect();
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(number: &serde_yaml::Number) -> Value {
    if let Some(int) = number.as_i64() {
        Value::Number(int.into())
    } else if let Some(uint) = number.as_u64() {
        Value::Number(uint.into())
    } else {
        number
            .as_f64()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(text) => text,
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(flag) => flag.to_string(),
        serde_yaml::Value::Number(number) => number.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}
