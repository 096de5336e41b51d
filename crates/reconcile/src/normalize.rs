//! Normalization of raw declarative input.
//!
//! Operation specs arrive as an untyped mapping. Several keys accept more
//! than one shape (`env` may be a string, a list or a mapping; `domains` a
//! string or a list). Each raw value is first classified into a [`Shape`],
//! then a per-field [`ListShape`] rule turns it into an ordered
//! `Vec<String>` or rejects it.

use crate::error::{Error, Result};
use crate::types::DesiredState;
use serde_json::{Map, Value};

/// Raw operation spec: an ordered string-keyed mapping
pub type RawSpec = Map<String, Value>;

/// Classified shape of a raw value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<'a> {
    /// Key absent or explicitly null
    Missing,
    /// A string, possibly empty
    Text(&'a str),
    /// Number or boolean
    Scalar(&'a Value),
    /// A sequence
    List(&'a [Value]),
    /// A mapping, in key order
    Map(&'a Map<String, Value>),
}

impl<'a> Shape<'a> {
    /// Classify an optional raw value
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::String(s)) => Self::Text(s),
            Some(v @ (Value::Bool(_) | Value::Number(_))) => Self::Scalar(v),
            Some(Value::Array(items)) => Self::List(items),
            Some(Value::Object(map)) => Self::Map(map),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Missing => "nothing",
            Self::Text(_) => "a string",
            Self::Scalar(_) => "a scalar",
            Self::List(_) => "a list",
            Self::Map(_) => "a mapping",
        }
    }
}

/// Which shapes a list-valued field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// A single string becomes a one-element list
    TextOrList,
    /// Only an actual list is accepted
    ListOnly,
    /// Like `TextOrList`, plus mappings rendered as `KEY=VALUE` in key order
    Assignments,
}

impl ListShape {
    fn expected(&self) -> &'static str {
        match self {
            Self::TextOrList => "a string or a list",
            Self::ListOnly => "a list of strings",
            Self::Assignments => "a map, list, or string",
        }
    }
}

/// Render a scalar list item or mapping value as a string
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Normalize a classified value into an ordered list of strings.
///
/// Returns the rejection reason on an unsupported shape.
pub fn normalize_list(shape: Shape<'_>, rule: ListShape) -> std::result::Result<Vec<String>, String> {
    match (shape, rule) {
        (Shape::Missing, _) => Ok(Vec::new()),
        (Shape::Text(s), ListShape::TextOrList | ListShape::Assignments) => Ok(vec![s.to_string()]),
        (Shape::List(items), _) => items
            .iter()
            .map(|item| {
                match item {
                    Value::Null => None,
                    other => scalar_to_string(other),
                }
                .ok_or_else(|| format!("unsupported list item {item}"))
            })
            .collect(),
        (Shape::Map(map), ListShape::Assignments) => map
            .iter()
            .map(|(key, value)| {
                scalar_to_string(value)
                    .map(|v| format!("{key}={v}"))
                    .ok_or_else(|| format!("unsupported value for {key}"))
            })
            .collect(),
        (other, rule) => Err(format!("must be {}, got {}", rule.expected(), other.name())),
    }
}

/// Typed accessors over a raw spec, reporting errors against an operation kind
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    kind: &'static str,
    raw: &'a RawSpec,
}

impl<'a> Fields<'a> {
    /// Accessors reporting errors against `kind`
    pub fn new(kind: &'static str, raw: &'a RawSpec) -> Self {
        Self { kind, raw }
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::validation(self.kind, message)
    }

    /// First of `keys` holding a non-empty value; later keys are aliases
    fn lookup<'k>(&self, keys: &[&'k str]) -> (&'k str, Shape<'a>) {
        for &key in keys {
            let shape = Shape::of(self.raw.get(key));
            let empty = match shape {
                Shape::Missing => true,
                Shape::Text(s) => s.is_empty(),
                Shape::List(items) => items.is_empty(),
                _ => false,
            };
            if !empty {
                return (key, shape);
            }
        }
        (keys.first().copied().unwrap_or_default(), Shape::Missing)
    }

    /// Optional string value; numbers and booleans are stringified
    pub fn string(&self, keys: &[&str]) -> Result<Option<String>> {
        match self.lookup(keys) {
            (_, Shape::Missing) => Ok(None),
            (_, Shape::Text(s)) => Ok(Some(s.to_string())),
            (_, Shape::Scalar(v)) => Ok(scalar_to_string(v)),
            (key, other) => Err(self.invalid(format!("{key} must be a string, got {}", other.name()))),
        }
    }

    /// Required non-empty string value
    pub fn required_string(&self, keys: &[&str], message: &str) -> Result<String> {
        self.string(keys)?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.invalid(message))
    }

    /// Boolean flag, `None` when the key is missing
    pub fn optional_flag(&self, key: &str) -> Result<Option<bool>> {
        match Shape::of(self.raw.get(key)) {
            Shape::Missing => Ok(None),
            Shape::Scalar(Value::Bool(b)) => Ok(Some(*b)),
            other => Err(self.invalid(format!("{key} must be a boolean, got {}", other.name()))),
        }
    }

    /// Boolean flag with a default for a missing key
    pub fn flag(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self.optional_flag(key)?.unwrap_or(default))
    }

    /// Non-negative integer with a default for a missing key
    pub fn count(&self, key: &str, default: u32) -> Result<u32> {
        let parsed = match Shape::of(self.raw.get(key)) {
            Shape::Missing => return Ok(default),
            Shape::Scalar(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Shape::Text(s) => s.trim().parse::<u32>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(format!("{key} must be a non-negative integer")))
    }

    /// The `state` key, `present` when missing.
    ///
    /// An explicit null is rejected instead of being read as the default.
    pub fn state(&self) -> Result<DesiredState> {
        let invalid = || self.invalid("state must be 'present' or 'absent'");
        match self.raw.get("state") {
            None => Ok(DesiredState::Present),
            Some(Value::String(s)) => DesiredState::parse(s).ok_or_else(invalid),
            Some(_) => Err(invalid()),
        }
    }

    /// List-valued field normalized according to `rule`
    pub fn list(&self, keys: &[&str], rule: ListShape) -> Result<Vec<String>> {
        let (key, shape) = self.lookup(keys);
        normalize_list(shape, rule).map_err(|reason| self.invalid(format!("{key} {reason}")))
    }

    /// Raw classified value, for fields with their own shape rules
    pub fn shape(&self, key: &str) -> Shape<'a> {
        Shape::of(self.raw.get(key))
    }
}
