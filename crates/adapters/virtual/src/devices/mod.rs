//! Virtual device implementations — light, switch, sensor.
//!
//! Every device exposes its attributes on service instance `1`. State lives
//! behind a mutex so the transport can be shared across tasks.

mod light;
mod sensor;
mod switch;

pub use light::VirtualLight;
pub use sensor::VirtualSensor;
pub use switch::VirtualSwitch;

use scenehub_domain::attribute::{AttributeCommand, AttributeRef, AttributeValue};
use scenehub_domain::device::Device;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::DeviceId;

use crate::error::VirtualError;

/// Service instance carrying every virtual attribute.
pub const INSTANCE: u32 = 1;

/// Plugin id reported by virtual devices.
pub const PLUGIN_ID: &str = "virtual";

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Light(VirtualLight),
    Sensor(VirtualSensor),
    Switch(VirtualSwitch),
}

impl VirtualDevice {
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        match self {
            Self::Light(d) => d.device_id(),
            Self::Sensor(d) => d.device_id(),
            Self::Switch(d) => d.device_id(),
        }
    }

    /// Produce the [`Device`] record to register in storage.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the builder fails.
    pub fn describe(&self) -> Result<Device, SceneHubError> {
        match self {
            Self::Light(d) => d.describe(),
            Self::Sensor(d) => d.describe(),
            Self::Switch(d) => d.describe(),
        }
    }

    /// Apply one command and return the value actually stored.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualError`] when the attribute is unknown, read-only or
    /// the value has the wrong shape.
    pub fn apply(&self, command: &AttributeCommand) -> Result<AttributeValue, VirtualError> {
        match self {
            Self::Light(d) => d.apply(command),
            Self::Sensor(d) => d.apply(command),
            Self::Switch(d) => d.apply(command),
        }
    }

    #[must_use]
    pub fn read(&self, attribute: &AttributeRef) -> Option<AttributeValue> {
        match self {
            Self::Light(d) => d.read(attribute),
            Self::Sensor(d) => d.read(attribute),
            Self::Switch(d) => d.read(attribute),
        }
    }
}

/// Resolve an attribute reference to its name on instance [`INSTANCE`].
fn local_name(attribute: &AttributeRef) -> Option<&str> {
    (attribute.instance_id == INSTANCE).then_some(attribute.attribute.as_str())
}

fn expect_bool(command: &AttributeCommand) -> Result<bool, VirtualError> {
    match command.value {
        AttributeValue::Bool(value) => Ok(value),
        ref other => Err(invalid(command, other)),
    }
}

fn invalid(command: &AttributeCommand, value: &AttributeValue) -> VirtualError {
    VirtualError::InvalidValue {
        attribute: command.target.clone(),
        value: value.to_string(),
    }
}
