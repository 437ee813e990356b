//! Attribute records evaluated against rules

use crate::error::RecordError;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Named attributes of one subject, e.g. `{age: 35, department: "Sales"}`
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: AHashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: AHashMap::with_capacity(capacity),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Decode untyped user data, e.g. a request body's `user_data` object
    ///
    /// Integers that fit `i64` become [`Value::Integer`], other numbers
    /// [`Value::Float`]. Booleans, nulls, arrays and nested objects are
    /// rejected rather than coerced.
    pub fn from_json(data: &JsonValue) -> Result<Self, RecordError> {
        let object = data
            .as_object()
            .ok_or_else(|| RecordError::NotAnObject(json_kind(data)))?;

        let mut record = Record::with_capacity(object.len());
        for (field, value) in object {
            let value = match value {
                JsonValue::Number(n) => n
                    .as_i64()
                    .map(Value::Integer)
                    .or_else(|| n.as_f64().map(Value::Float))
                    .ok_or_else(|| RecordError::UnsupportedValue {
                        field: field.clone(),
                        kind: "number",
                    })?,
                JsonValue::String(s) => Value::String(s.clone()),
                other => {
                    return Err(RecordError::UnsupportedValue {
                        field: field.clone(),
                        kind: json_kind(other),
                    })
                }
            };
            record.fields.insert(field.clone(), value);
        }
        Ok(record)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
