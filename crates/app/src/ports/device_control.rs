//! Device-control port — the transport that talks to real devices.

use std::future::Future;
use std::sync::Arc;

use scenehub_domain::attribute::{AttributeCommand, AttributeRef, AttributeValue};
use scenehub_domain::device::Device;
use scenehub_domain::error::SceneHubError;

/// Reads and writes device attributes.
///
/// Implementations report an unreachable device with
/// [`SceneHubError::DeviceOffline`] so it can be told apart from other
/// failures.
pub trait DeviceControl {
    /// Apply the given attribute commands to a device in one request.
    fn set_attributes(
        &self,
        device: &Device,
        commands: &[AttributeCommand],
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send;

    /// Read the live value of one attribute. `None` if the device does not
    /// expose it.
    fn get_attribute(
        &self,
        device: &Device,
        attribute: &AttributeRef,
    ) -> impl Future<Output = Result<Option<AttributeValue>, SceneHubError>> + Send;
}

impl<T: DeviceControl + Send + Sync> DeviceControl for Arc<T> {
    fn set_attributes(
        &self,
        device: &Device,
        commands: &[AttributeCommand],
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        (**self).set_attributes(device, commands)
    }

    fn get_attribute(
        &self,
        device: &Device,
        attribute: &AttributeRef,
    ) -> impl Future<Output = Result<Option<AttributeValue>, SceneHubError>> + Send {
        (**self).get_attribute(device, attribute)
    }
}
