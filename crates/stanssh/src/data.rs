//! Input-data serialization: numeric values in, JSON out.
//!
//! The remote side only understands JSON-native inputs, so the boundary is
//! strict: a value is a number, a nested sequence of values, or a named
//! mapping of values. Strings, booleans, nulls and non-finite floats are
//! rejected with a `Serialization` error rather than silently encoded.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, StanError};

/// A JSON-native numeric value accepted as Stan input data.
#[derive(Debug, Clone, PartialEq)]
pub enum StanValue {
    Int(i64),
    Real(f64),
    Array(Vec<StanValue>),
    Map(BTreeMap<String, StanValue>),
}

impl StanValue {
    /// Convert a parsed JSON value, rejecting anything non-numeric.
    pub fn try_from_json(value: &Value) -> std::result::Result<Self, String> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(StanValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(StanValue::Real(f))
                } else {
                    Err(format!("number {n} does not fit i64 or f64"))
                }
            }
            Value::Array(items) => items
                .iter()
                .map(Self::try_from_json)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(StanValue::Array),
            Value::Object(fields) => fields
                .iter()
                .map(|(k, v)| Self::try_from_json(v).map(|sv| (k.clone(), sv)))
                .collect::<std::result::Result<BTreeMap<_, _>, _>>()
                .map(StanValue::Map),
            Value::String(_) => Err("strings are not numeric data".to_string()),
            Value::Bool(_) => Err("booleans are not numeric data".to_string()),
            Value::Null => Err("null is not numeric data".to_string()),
        }
    }

    /// Emit as a plain JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            StanValue::Int(i) => Value::from(*i),
            StanValue::Real(f) => Value::from(*f),
            StanValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            StanValue::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Check every numeric leaf is JSON-representable (finite).
    fn check_finite(&self) -> std::result::Result<(), String> {
        match self {
            StanValue::Int(_) => Ok(()),
            StanValue::Real(f) if f.is_finite() => Ok(()),
            StanValue::Real(f) => Err(format!("{f} is not a finite number")),
            StanValue::Array(items) => items.iter().try_for_each(Self::check_finite),
            StanValue::Map(fields) => fields.values().try_for_each(Self::check_finite),
        }
    }
}

impl From<i64> for StanValue {
    fn from(v: i64) -> Self {
        StanValue::Int(v)
    }
}

impl From<i32> for StanValue {
    fn from(v: i32) -> Self {
        StanValue::Int(v as i64)
    }
}

impl From<f64> for StanValue {
    fn from(v: f64) -> Self {
        StanValue::Real(v)
    }
}

impl<T: Into<StanValue>> From<Vec<T>> for StanValue {
    fn from(items: Vec<T>) -> Self {
        StanValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<&[f64]> for StanValue {
    fn from(items: &[f64]) -> Self {
        StanValue::Array(items.iter().copied().map(StanValue::Real).collect())
    }
}

/// Named input data for one model run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBundle {
    entries: BTreeMap<String, StanValue>,
}

impl DataBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named variable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<StanValue>) -> &mut Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&StanValue> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a bundle from parsed JSON; every leaf must be numeric.
    pub fn try_from_json(value: &Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(StanError::Serialization {
                name: "<root>".to_string(),
                reason: "input data must be a mapping of variable names".to_string(),
            });
        };

        let mut bundle = DataBundle::new();
        for (name, v) in fields {
            let sv = StanValue::try_from_json(v).map_err(|reason| StanError::Serialization {
                name: name.clone(),
                reason,
            })?;
            bundle.entries.insert(name.clone(), sv);
        }
        Ok(bundle)
    }

    /// Emit as a plain JSON object.
    pub fn to_json_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Serialize to the wire format uploaded to the remote host:
    /// pretty-printed JSON with 4-space indent.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        for (name, value) in &self.entries {
            value
                .check_finite()
                .map_err(|reason| StanError::Serialization {
                    name: name.clone(),
                    reason,
                })?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.to_json_value()
            .serialize(&mut ser)
            .map_err(|e| StanError::Serialization {
                name: "<root>".to_string(),
                reason: e.to_string(),
            })?;
        Ok(buf)
    }
}

/// Parse a JSON artifact produced by the remote side.
///
/// Truncated or malformed content fails with `Deserialization`; a partial
/// structure is never returned.
pub fn from_json_bytes(raw: &[u8]) -> Result<Value> {
    serde_json::from_slice(raw).map_err(|e| StanError::Deserialization(e.to_string()))
}
