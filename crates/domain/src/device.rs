//! Device — a physical or virtual thing that scenes can read and control.

use serde::{Deserialize, Serialize};

use crate::error::{SceneHubError, ValidationError};
use crate::id::DeviceId;
use crate::time::Timestamp;

/// A device known to the hub.
///
/// Devices are soft-deleted: `deleted_at` is set instead of removing the
/// record, so scene tasks that still point at it can be reported accurately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    /// Plugin that provides the device (e.g. `"virtual"`).
    pub plugin_id: String,
    /// Identity of the device inside its plugin.
    pub identity: String,
    pub deleted_at: Option<Timestamp>,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] when `name` is blank.
    pub fn validate(&self) -> Result<(), SceneHubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    manufacturer: Option<String>,
    model: Option<String>,
    plugin_id: Option<String>,
    identity: Option<String>,
    deleted_at: Option<Timestamp>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn plugin_id(mut self, plugin_id: impl Into<String>) -> Self {
        self.plugin_id = Some(plugin_id.into());
        self
    }

    #[must_use]
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    #[must_use]
    pub fn deleted_at(mut self, ts: Timestamp) -> Self {
        self.deleted_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`SceneHubError::Validation`] if the name is missing or empty.
    pub fn build(self) -> Result<Device, SceneHubError> {
        let id = self.id.unwrap_or_default();
        let device = Device {
            id,
            name: self.name.unwrap_or_default(),
            manufacturer: self.manufacturer,
            model: self.model,
            plugin_id: self.plugin_id.unwrap_or_default(),
            identity: self.identity.unwrap_or_else(|| id.to_string()),
            deleted_at: self.deleted_at,
        };
        device.validate()?;
        Ok(device)
    }
}
