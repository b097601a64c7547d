//! Scene conditions — what makes an automatic scene fire.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeRef, AttributeValue};
use crate::id::{DeviceId, SceneConditionId};

/// One condition of an automatic scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCondition {
    pub id: SceneConditionId,
    #[serde(flatten)]
    pub kind: ConditionKind,
}

impl SceneCondition {
    /// Fire at a time of day.
    #[must_use]
    pub fn timing(at: NaiveTime) -> Self {
        Self {
            id: SceneConditionId::new(),
            kind: ConditionKind::Timing { at },
        }
    }

    /// Hold while a device attribute compares to `value`.
    #[must_use]
    pub fn device_status(
        device_id: DeviceId,
        attribute: AttributeRef,
        operator: Operator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            id: SceneConditionId::new(),
            kind: ConditionKind::DeviceStatus {
                device_id,
                attribute,
                operator,
                value: value.into(),
            },
        }
    }

    #[must_use]
    pub fn is_timing(&self) -> bool {
        matches!(self.kind, ConditionKind::Timing { .. })
    }

    /// Whether this condition watches the given attribute of the given device.
    #[must_use]
    pub fn watches(&self, device: DeviceId, attr: &AttributeRef) -> bool {
        matches!(
            &self.kind,
            ConditionKind::DeviceStatus { device_id, attribute, .. }
                if *device_id == device && attribute == attr
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionKind {
    /// Satisfied only by the scheduled firing at `at` (hub-local time).
    Timing { at: NaiveTime },
    /// Satisfied while the live attribute value compares to `value`.
    DeviceStatus {
        device_id: DeviceId,
        attribute: AttributeRef,
        operator: Operator,
        value: AttributeValue,
    },
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timing { at } => write!(f, "timing({})", at.format("%H:%M:%S")),
            Self::DeviceStatus {
                device_id,
                attribute,
                operator,
                value,
            } => write!(f, "device({device_id}).{attribute} {operator} {value}"),
        }
    }
}

/// Comparison applied by a device-status condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "=")]
    Equal,
}

impl Operator {
    /// Compare the live `actual` value against the configured `expected` one.
    ///
    /// `>` and `<` only hold for numeric pairs. `=` compares numerically when
    /// both sides are numbers and structurally otherwise.
    #[must_use]
    pub fn compare(self, actual: &AttributeValue, expected: &AttributeValue) -> bool {
        use std::cmp::Ordering;

        let numeric = actual.numeric_cmp(expected);
        match self {
            Self::GreaterThan => numeric == Some(Ordering::Greater),
            Self::LessThan => numeric == Some(Ordering::Less),
            Self::Equal => numeric.map_or_else(|| actual == expected, Ordering::is_eq),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::Equal => "=",
        })
    }
}

/// How the conditions of a scene combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionLogic {
    /// Every condition must hold.
    #[default]
    All,
    /// At least one condition must hold.
    Any,
}

impl fmt::Display for ConditionLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Any => f.write_str("any"),
        }
    }
}
