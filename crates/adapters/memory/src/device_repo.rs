//! In-memory implementation of [`DeviceRepository`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

use scenehub_app::ports::DeviceRepository;
use scenehub_domain::device::Device;
use scenehub_domain::error::{NotFoundError, SceneHubError};
use scenehub_domain::id::DeviceId;

/// In-memory device repository.
#[derive(Default)]
pub struct InMemoryDeviceRepository {
    devices: RwLock<HashMap<DeviceId, Device>>,
}

impl InMemoryDeviceRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a device, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the device name is blank.
    pub fn save(&self, device: Device) -> Result<Device, SceneHubError> {
        device.validate()?;
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device.id, device.clone());
        Ok(device)
    }

    /// Mark a device as deleted.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the device does not exist or is
    /// already deleted.
    pub fn soft_delete(&self, id: DeviceId) -> Result<(), SceneHubError> {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        match devices.get_mut(&id) {
            Some(device) if !device.is_deleted() => {
                device.deleted_at = Some(scenehub_domain::time::now());
                Ok(())
            }
            _ => Err(NotFoundError::device(id).into()),
        }
    }
}

impl DeviceRepository for InMemoryDeviceRepository {
    fn get_by_id(
        &self,
        id: DeviceId,
        include_deleted: bool,
    ) -> impl Future<Output = Result<Option<Device>, SceneHubError>> + Send {
        let r = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .filter(|d| include_deleted || !d.is_deleted())
            .cloned();
        async { Ok(r) }
    }
}
