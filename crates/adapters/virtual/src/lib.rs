//! # scenehub-adapter-virtual
//!
//! Virtual device transport that provides simulated devices for testing and
//! demonstration purposes.
//!
//! ## Provided devices
//!
//! | Device | Attributes (instance `1`) | Behaviour |
//! |--------|---------------------------|-----------|
//! | Virtual Light | `power`, `brightness` | Accepts commands |
//! | Virtual Switch | `power` | Accepts commands |
//! | Virtual Sensor | `temperature`, `unit` | Read-only, readings are simulated |
//!
//! Every accepted command is published as a [`DeviceEvent`], so scenes
//! watching the attribute react as they would to real hardware.
//!
//! ## Dependency rule
//!
//! Depends on `scenehub-app` (port traits) and `scenehub-domain` only.

mod devices;
mod error;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use scenehub_app::ports::{DeviceControl, EventPublisher};
use scenehub_domain::attribute::{AttributeCommand, AttributeRef, AttributeValue};
use scenehub_domain::device::Device;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::event::DeviceEvent;
use scenehub_domain::id::DeviceId;

pub use devices::{INSTANCE, PLUGIN_ID, VirtualDevice, VirtualLight, VirtualSensor, VirtualSwitch};
pub use error::VirtualError;

/// Simulated device transport.
pub struct VirtualDeviceControl<P> {
    devices: HashMap<DeviceId, VirtualDevice>,
    offline: Mutex<HashSet<DeviceId>>,
    history: Mutex<Vec<(DeviceId, AttributeCommand)>>,
    publisher: P,
}

impl<P> VirtualDeviceControl<P>
where
    P: EventPublisher + Send + Sync,
{
    /// Create an empty transport publishing through `publisher`.
    pub fn new(publisher: P) -> Self {
        Self {
            devices: HashMap::new(),
            offline: Mutex::new(HashSet::new()),
            history: Mutex::new(Vec::new()),
            publisher,
        }
    }

    /// Transport with one light, one switch and one sensor.
    pub fn with_defaults(publisher: P) -> Self {
        Self::new(publisher)
            .with_device(VirtualDevice::Light(VirtualLight::default()))
            .with_device(VirtualDevice::Switch(VirtualSwitch::default()))
            .with_device(VirtualDevice::Sensor(VirtualSensor::default()))
    }

    #[must_use]
    pub fn with_device(mut self, device: VirtualDevice) -> Self {
        self.devices.insert(device.device_id(), device);
        self
    }

    /// Device records to register in storage.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a device cannot be described.
    pub fn describe_all(&self) -> Result<Vec<Device>, SceneHubError> {
        let mut devices = self
            .devices
            .values()
            .map(VirtualDevice::describe)
            .collect::<Result<Vec<_>, _>>()?;
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(devices)
    }

    /// Take a device offline or bring it back.
    pub fn set_online(&self, device_id: DeviceId, online: bool) {
        let mut offline = self.offline.lock().unwrap_or_else(PoisonError::into_inner);
        if online {
            offline.remove(&device_id);
        } else {
            offline.insert(device_id);
        }
        tracing::info!(%device_id, online, "virtual device availability changed");
    }

    /// Commands accepted so far, in order.
    #[must_use]
    pub fn history(&self) -> Vec<(DeviceId, AttributeCommand)> {
        self.lock_history().clone()
    }

    /// Simulate a new sensor reading and publish it.
    ///
    /// # Errors
    ///
    /// Returns [`VirtualError::UnknownDevice`] when `device_id` is not a
    /// virtual sensor, or the publisher's error.
    pub async fn report_temperature(
        &self,
        device_id: DeviceId,
        celsius: f64,
    ) -> Result<(), SceneHubError> {
        let Some(VirtualDevice::Sensor(sensor)) = self.devices.get(&device_id) else {
            return Err(VirtualError::UnknownDevice(device_id).into());
        };
        sensor.set_temperature(celsius);
        let event = DeviceEvent::new(
            device_id,
            AttributeRef::new(INSTANCE, "temperature"),
            AttributeValue::Float(celsius),
        );
        self.publisher.publish(event).await
    }

    fn lookup(&self, device_id: DeviceId) -> Result<&VirtualDevice, VirtualError> {
        if self
            .offline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&device_id)
        {
            return Err(VirtualError::Offline(device_id));
        }
        self.devices
            .get(&device_id)
            .ok_or(VirtualError::UnknownDevice(device_id))
    }

    /// Apply the commands in order, stopping at the first rejection.
    fn apply_all(
        &self,
        device_id: DeviceId,
        commands: &[AttributeCommand],
    ) -> Result<Vec<DeviceEvent>, VirtualError> {
        let device = self.lookup(device_id)?;
        let mut events = Vec::with_capacity(commands.len());
        for command in commands {
            let stored = device.apply(command)?;
            self.lock_history().push((device_id, command.clone()));
            tracing::debug!(%device_id, attribute = %command.target, value = %stored, "virtual attribute set");
            events.push(DeviceEvent::new(device_id, command.target.clone(), stored));
        }
        Ok(events)
    }

    fn lock_history(&self) -> MutexGuard<'_, Vec<(DeviceId, AttributeCommand)>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> DeviceControl for VirtualDeviceControl<P>
where
    P: EventPublisher + Send + Sync,
{
    fn set_attributes(
        &self,
        device: &Device,
        commands: &[AttributeCommand],
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        let applied = self.apply_all(device.id, commands);
        async move {
            for event in applied? {
                self.publisher.publish(event).await?;
            }
            Ok(())
        }
    }

    fn get_attribute(
        &self,
        device: &Device,
        attribute: &AttributeRef,
    ) -> impl Future<Output = Result<Option<AttributeValue>, SceneHubError>> + Send {
        let r = self
            .lookup(device.id)
            .map(|d| d.read(attribute))
            .map_err(SceneHubError::from);
        async { r }
    }
}
