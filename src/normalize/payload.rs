// src/normalize/payload.rs
//! Schema-less representation of upstream records.
//!
//! `serde_json::Value` cannot say "this field was never set", but mapping code
//! built from optional fields can. `Payload` keeps `Absent` apart from `Null` so
//! the normalizer can drop the former and preserve the latter.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// An upstream value that may be absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Absent,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Payload>),
    Object(IndexMap<String, Payload>),
}

impl Payload {
    /// Builds an object payload from key/value pairs, keeping their order.
    pub fn object<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Payload>,
    {
        Payload::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds an array payload.
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Payload>,
    {
        Payload::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Payload::Absent)
    }

    /// Converts into JSON, dropping absent fields and array elements.
    ///
    /// Returns `None` only when the payload itself is absent.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Absent => None,
            Payload::Null => Some(Value::Null),
            Payload::Bool(b) => Some(Value::Bool(b)),
            Payload::Number(n) => Some(Value::Number(n)),
            Payload::String(s) => Some(Value::String(s)),
            Payload::Array(items) => Some(Value::Array(
                items.into_iter().filter_map(Payload::into_json).collect(),
            )),
            Payload::Object(fields) => {
                let map: Map<String, Value> = fields
                    .into_iter()
                    .filter_map(|(k, v)| v.into_json().map(|v| (k, v)))
                    .collect();
                Some(Value::Object(map))
            }
        }
    }

    /// Converts into JSON, mapping an absent payload to `null`.
    pub fn into_json_or_null(self) -> Value {
        self.into_json().unwrap_or(Value::Null)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => Payload::Number(n),
            Value::String(s) => Payload::String(s),
            Value::Array(items) => Payload::Array(items.into_iter().map(Payload::from).collect()),
            Value::Object(map) => {
                Payload::Object(map.into_iter().map(|(k, v)| (k, Payload::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for Payload {
    fn from(value: &Value) -> Self {
        Payload::from(value.clone())
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map_or(Payload::Absent, Into::into)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::String(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::String(value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Number(value.into())
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Payload::Number(value.into())
    }
}

impl From<u64> for Payload {
    fn from(value: u64) -> Self {
        Payload::Number(value.into())
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Payload::Null, Payload::Number)
    }
}
