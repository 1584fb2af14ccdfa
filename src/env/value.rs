//! Recursive value tree used for environment values and template contexts.
//!
//! Values parsed from YAML are converted into this closed set of variants so
//! merging and serialization are plain pattern matches.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value as YamlValue;
use thiserror::Error;

/// Ordered map of string keys to values.
pub type ValueMap = BTreeMap<String, Value>;

/// A node in a value tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null.
    #[default]
    Null,
    /// A leaf value.
    Scalar(Scalar),
    /// An ordered sequence of values.
    Sequence(Vec<Value>),
    /// A string-keyed map of values.
    Map(ValueMap),
}

/// Leaf values.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer too large for `i64`.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// String.
    String(String),
}

/// Reasons a parsed tree cannot become a [`Value`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    /// A mapping key was not a string.
    #[error("unexpected type of key in map: expected string, got {0}")]
    NonStringKey(String),

    /// A tagged node (`!tag value`) was found.
    #[error("unsupported tagged value {0}")]
    Tagged(String),
}

impl Value {
    /// Returns the map if this value is one.
    #[must_use]
    pub const fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key when this value is a map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Returns true for an explicit null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string if this value is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl TryFrom<YamlValue> for Value {
    type Error = ValueError;

    fn try_from(raw: YamlValue) -> Result<Self, Self::Error> {
        match raw {
            YamlValue::Null => Ok(Self::Null),
            YamlValue::Bool(b) => Ok(Self::Scalar(Scalar::Bool(b))),
            YamlValue::Number(n) => Ok(Self::Scalar(Scalar::from(&n))),
            YamlValue::String(s) => Ok(Self::Scalar(Scalar::String(s))),
            YamlValue::Sequence(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Sequence),
            YamlValue::Mapping(mapping) => {
                let mut map = ValueMap::new();
                for (key, value) in mapping {
                    let key = match key {
                        YamlValue::String(s) => s,
                        other => return Err(ValueError::NonStringKey(describe(&other))),
                    };
                    map.insert(key, Self::try_from(value)?);
                }
                Ok(Self::Map(map))
            }
            YamlValue::Tagged(tagged) => Err(ValueError::Tagged(tagged.tag.to_string())),
        }
    }
}

fn describe(value: &YamlValue) -> String {
    match value {
        YamlValue::Null => String::from("null"),
        YamlValue::Bool(b) => format!("bool: {b}"),
        YamlValue::Number(n) => format!("number: {n}"),
        YamlValue::String(s) => format!("string: {s}"),
        YamlValue::Sequence(_) => String::from("sequence"),
        YamlValue::Mapping(_) => String::from("mapping"),
        YamlValue::Tagged(t) => format!("tagged: {}", t.tag),
    }
}

impl From<&serde_yaml::Number> for Scalar {
    fn from(n: &serde_yaml::Number) -> Self {
        if let Some(i) = n.as_i64() {
            Self::Int(i)
        } else if let Some(u) = n.as_u64() {
            Self::UInt(u)
        } else {
            Self::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Scalar(scalar) => scalar.serialize(serializer),
            Self::Sequence(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::UInt(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = YamlValue::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::String(s))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Self::Map(map)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_nested_yaml() {
        let yaml: YamlValue = serde_yaml::from_str(
            "a:\n  b: [1, true, x]\n  c: null\nbig: 18446744073709551615\nratio: 0.5\n",
        )
        .unwrap();
        let value = Value::try_from(yaml).unwrap();

        let b = value.get("a").and_then(|a| a.get("b")).unwrap();
        assert_eq!(
            b,
            &Value::Sequence(vec![Value::from(1_i64), Value::from(true), Value::from("x")])
        );
        assert!(value.get("a").and_then(|a| a.get("c")).unwrap().is_null());
        assert_eq!(value.get("big"), Some(&Value::Scalar(Scalar::UInt(u64::MAX))));
        assert_eq!(value.get("ratio"), Some(&Value::Scalar(Scalar::Float(0.5))));
    }

    #[test]
    fn test_rejects_non_string_keys() {
        let yaml: YamlValue = serde_yaml::from_str("1: one\n").unwrap();
        let err = Value::try_from(yaml).unwrap_err();
        assert_eq!(err, ValueError::NonStringKey(String::from("number: 1")));
    }

    #[test]
    fn test_rejects_tagged_nodes() {
        let yaml: YamlValue = serde_yaml::from_str("key: !secret abc\n").unwrap();
        assert!(matches!(Value::try_from(yaml), Err(ValueError::Tagged(_))));
    }

    #[test]
    fn test_serializes_back_to_yaml() {
        let value: Value = serde_yaml::from_str("b: 2\na:\n  - x\n  - null\n").unwrap();
        let text = serde_yaml::to_string(&value).unwrap();
        assert_eq!(text, "a:\n- x\n- null\nb: 2\n");
    }
}
