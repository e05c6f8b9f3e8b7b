use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};
use std::ops::Deref;

/// A schema-less document as returned by the store. Read-only during aggregation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub Map<String, JsonValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Returns the value of `field` only when it is present in the truthy sense.
    pub fn present(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field).filter(|value| is_truthy(value))
    }
}

impl Deref for RawRecord {
    type Target = Map<String, JsonValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Map<String, JsonValue>> for RawRecord {
    fn from(fields: Map<String, JsonValue>) -> Self {
        Self(fields)
    }
}

impl TryFrom<JsonValue> for RawRecord {
    type Error = String;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Object(fields) => Ok(Self(fields)),
            other => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        }
    }
}

/// `null`, `false`, `0`, `NaN` and `""` are absent; everything else is present.
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        JsonValue::String(text) => !text.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

pub(crate) fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// An epoch-millisecond timestamp taken from a record field.
///
/// Keeps the original JSON number so it serializes back exactly as stored
/// (`1000`, not `1000.0`).
#[derive(Clone, Debug, PartialEq)]
pub struct EpochMillis {
    raw: Number,
    millis: f64,
}

impl EpochMillis {
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let JsonValue::Number(number) = value else {
            return None;
        };
        let millis = number.as_f64().filter(|n| n.is_finite())?;
        Some(Self {
            raw: number.clone(),
            millis,
        })
    }

    pub fn millis(&self) -> f64 {
        self.millis
    }
}

impl From<i64> for EpochMillis {
    fn from(millis: i64) -> Self {
        Self {
            raw: Number::from(millis),
            millis: millis as f64,
        }
    }
}

impl Serialize for EpochMillis {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}
