//! Virtual temperature sensor — read-only `temperature` and `unit`.

use std::sync::{Mutex, PoisonError};

use scenehub_domain::attribute::{AttributeCommand, AttributeRef, AttributeValue};
use scenehub_domain::device::Device;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::DeviceId;

use super::{PLUGIN_ID, local_name};
use crate::error::VirtualError;

/// A simulated temperature sensor.
///
/// Sensors reject commands; their reading changes through
/// [`VirtualSensor::set_temperature`] only.
pub struct VirtualSensor {
    device_id: DeviceId,
    name: String,
    temperature: Mutex<f64>,
}

impl Default for VirtualSensor {
    fn default() -> Self {
        Self::new("Virtual Sensor")
    }
}

impl VirtualSensor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            device_id: DeviceId::new(),
            name: name.into(),
            temperature: Mutex::new(21.5),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn describe(&self) -> Result<Device, SceneHubError> {
        Device::builder()
            .id(self.device_id)
            .name(self.name.clone())
            .manufacturer("scenehub")
            .model("VSensor-1")
            .plugin_id(PLUGIN_ID)
            .identity(format!("sensor-{}", self.device_id))
            .build()
    }

    /// # Errors
    ///
    /// Always fails: sensor attributes are read-only.
    pub fn apply(&self, command: &AttributeCommand) -> Result<AttributeValue, VirtualError> {
        match local_name(&command.target) {
            Some("temperature" | "unit") => Err(VirtualError::ReadOnly(command.target.clone())),
            _ => Err(VirtualError::UnsupportedAttribute(command.target.clone())),
        }
    }

    #[must_use]
    pub fn read(&self, attribute: &AttributeRef) -> Option<AttributeValue> {
        match local_name(attribute)? {
            "temperature" => Some(AttributeValue::Float(*self.lock_temperature())),
            "unit" => Some(AttributeValue::String("\u{b0}C".to_string())),
            _ => None,
        }
    }

    /// Simulate a new reading.
    pub fn set_temperature(&self, celsius: f64) {
        *self.lock_temperature() = celsius;
    }

    fn lock_temperature(&self) -> std::sync::MutexGuard<'_, f64> {
        self.temperature
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
