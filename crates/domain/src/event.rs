//! Device events — attribute changes reported by device transports.

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeRef, AttributeValue};
use crate::id::DeviceId;
use crate::time::Timestamp;

/// An attribute of a device changed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub device_id: DeviceId,
    pub attribute: AttributeRef,
    pub value: AttributeValue,
    pub timestamp: Timestamp,
}

impl DeviceEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(device_id: DeviceId, attribute: AttributeRef, value: AttributeValue) -> Self {
        Self {
            device_id,
            attribute,
            value,
            timestamp: crate::time::now(),
        }
    }
}
