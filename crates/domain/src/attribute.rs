//! Device attributes: typed values, attribute references and commands.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Json(serde_json::Value),
}

impl AttributeValue {
    /// Numeric view of the value, when it has one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Compare two values numerically. `None` when either side is not a number.
    #[must_use]
    pub fn numeric_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_f64()?.partial_cmp(&other.as_f64()?)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Identity of one attribute on one device: the service instance that owns
/// it and the attribute name (e.g. instance `1`, `"power"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRef {
    pub instance_id: u32,
    pub attribute: String,
}

impl AttributeRef {
    #[must_use]
    pub fn new(instance_id: u32, attribute: impl Into<String>) -> Self {
        Self {
            instance_id,
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.instance_id, self.attribute)
    }
}

/// Request to set one attribute to a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCommand {
    #[serde(flatten)]
    pub target: AttributeRef,
    pub value: AttributeValue,
}

impl AttributeCommand {
    #[must_use]
    pub fn new(
        instance_id: u32,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            target: AttributeRef::new(instance_id, attribute),
            value: value.into(),
        }
    }
}
