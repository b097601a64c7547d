//! Virtual light — `power` (bool) and `brightness` (0 to 100).

use std::sync::{Mutex, MutexGuard, PoisonError};

use scenehub_domain::attribute::{AttributeCommand, AttributeRef, AttributeValue};
use scenehub_domain::device::Device;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::DeviceId;

use super::{PLUGIN_ID, expect_bool, invalid, local_name};
use crate::error::VirtualError;

#[derive(Debug, Clone, Copy)]
struct LightState {
    power: bool,
    brightness: i64,
}

/// A simulated dimmable light.
pub struct VirtualLight {
    device_id: DeviceId,
    name: String,
    state: Mutex<LightState>,
}

impl Default for VirtualLight {
    fn default() -> Self {
        Self::new("Virtual Light")
    }
}

impl VirtualLight {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            device_id: DeviceId::new(),
            name: name.into(),
            state: Mutex::new(LightState {
                power: false,
                brightness: 100,
            }),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// # Errors
    ///
    /// Returns a validation error if the builder fails (should not happen
    /// with a non-blank name).
    pub fn describe(&self) -> Result<Device, SceneHubError> {
        Device::builder()
            .id(self.device_id)
            .name(self.name.clone())
            .manufacturer("scenehub")
            .model("VLight-1")
            .plugin_id(PLUGIN_ID)
            .identity(format!("light-{}", self.device_id))
            .build()
    }

    /// # Errors
    ///
    /// Rejects unknown attributes, non-boolean power values and brightness
    /// outside `0..=100`.
    pub fn apply(&self, command: &AttributeCommand) -> Result<AttributeValue, VirtualError> {
        let mut state = self.lock_state();
        match local_name(&command.target) {
            Some("power") => {
                state.power = expect_bool(command)?;
                Ok(AttributeValue::Bool(state.power))
            }
            Some("brightness") => match command.value {
                AttributeValue::Int(level) if (0..=100).contains(&level) => {
                    state.brightness = level;
                    Ok(AttributeValue::Int(level))
                }
                ref other => Err(invalid(command, other)),
            },
            _ => Err(VirtualError::UnsupportedAttribute(command.target.clone())),
        }
    }

    #[must_use]
    pub fn read(&self, attribute: &AttributeRef) -> Option<AttributeValue> {
        let state = *self.lock_state();
        match local_name(attribute)? {
            "power" => Some(AttributeValue::Bool(state.power)),
            "brightness" => Some(AttributeValue::Int(state.brightness)),
            _ => None,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
