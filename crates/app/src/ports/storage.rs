//! Storage ports — read and arm/disarm access to scenes and devices.
//!
//! Soft-deleted records are hidden unless `include_deleted` is set, which the
//! engine uses to resolve task targets for the execution log.

use std::future::Future;
use std::sync::Arc;

use scenehub_domain::attribute::AttributeRef;
use scenehub_domain::device::Device;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::{DeviceId, SceneId};
use scenehub_domain::scene::Scene;

/// Repository for querying [`Scene`]s.
pub trait SceneRepository {
    /// Get a scene with its conditions and tasks.
    fn get_by_id(
        &self,
        id: SceneId,
        include_deleted: bool,
    ) -> impl Future<Output = Result<Option<Scene>, SceneHubError>> + Send;

    /// Armed, non-deleted automatic scenes whose repeat days contain the
    /// ISO `weekday`.
    fn find_armed_for_weekday(
        &self,
        weekday: u8,
    ) -> impl Future<Output = Result<Vec<Scene>, SceneHubError>> + Send;

    /// Armed, non-deleted automatic scenes with a device-status condition on
    /// the given attribute of the given device.
    fn find_armed_by_device_attribute(
        &self,
        device_id: DeviceId,
        attribute: &AttributeRef,
    ) -> impl Future<Output = Result<Vec<Scene>, SceneHubError>> + Send;

    /// Persist the armed flag of a scene.
    ///
    /// Fails with a not-found error when the scene does not exist.
    fn set_armed(
        &self,
        id: SceneId,
        is_on: bool,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send;
}

/// Repository for querying [`Device`]s.
pub trait DeviceRepository {
    fn get_by_id(
        &self,
        id: DeviceId,
        include_deleted: bool,
    ) -> impl Future<Output = Result<Option<Device>, SceneHubError>> + Send;
}

impl<T: SceneRepository + Send + Sync> SceneRepository for Arc<T> {
    fn get_by_id(
        &self,
        id: SceneId,
        include_deleted: bool,
    ) -> impl Future<Output = Result<Option<Scene>, SceneHubError>> + Send {
        (**self).get_by_id(id, include_deleted)
    }

    fn find_armed_for_weekday(
        &self,
        weekday: u8,
    ) -> impl Future<Output = Result<Vec<Scene>, SceneHubError>> + Send {
        (**self).find_armed_for_weekday(weekday)
    }

    fn find_armed_by_device_attribute(
        &self,
        device_id: DeviceId,
        attribute: &AttributeRef,
    ) -> impl Future<Output = Result<Vec<Scene>, SceneHubError>> + Send {
        (**self).find_armed_by_device_attribute(device_id, attribute)
    }

    fn set_armed(
        &self,
        id: SceneId,
        is_on: bool,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        (**self).set_armed(id, is_on)
    }
}

impl<T: DeviceRepository + Send + Sync> DeviceRepository for Arc<T> {
    fn get_by_id(
        &self,
        id: DeviceId,
        include_deleted: bool,
    ) -> impl Future<Output = Result<Option<Device>, SceneHubError>> + Send {
        (**self).get_by_id(id, include_deleted)
    }
}
