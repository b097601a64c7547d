//! Virtual switch — a single `power` attribute.

use std::sync::{Mutex, PoisonError};

use scenehub_domain::attribute::{AttributeCommand, AttributeRef, AttributeValue};
use scenehub_domain::device::Device;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::DeviceId;

use super::{PLUGIN_ID, expect_bool, local_name};
use crate::error::VirtualError;

/// A simulated on/off switch.
pub struct VirtualSwitch {
    device_id: DeviceId,
    name: String,
    power: Mutex<bool>,
}

impl Default for VirtualSwitch {
    fn default() -> Self {
        Self::new("Virtual Switch")
    }
}

impl VirtualSwitch {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            device_id: DeviceId::new(),
            name: name.into(),
            power: Mutex::new(false),
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
            .model("VSwitch-1")
            .plugin_id(PLUGIN_ID)
            .identity(format!("switch-{}", self.device_id))
            .build()
    }

    /// # Errors
    ///
    /// Rejects anything but a boolean `power` command.
    pub fn apply(&self, command: &AttributeCommand) -> Result<AttributeValue, VirtualError> {
        if local_name(&command.target) != Some("power") {
            return Err(VirtualError::UnsupportedAttribute(command.target.clone()));
        }
        let value = expect_bool(command)?;
        *self.power.lock().unwrap_or_else(PoisonError::into_inner) = value;
        Ok(AttributeValue::Bool(value))
    }

    #[must_use]
    pub fn read(&self, attribute: &AttributeRef) -> Option<AttributeValue> {
        let power = *self.power.lock().unwrap_or_else(PoisonError::into_inner);
        (local_name(attribute)? == "power").then_some(AttributeValue::Bool(power))
    }
}
