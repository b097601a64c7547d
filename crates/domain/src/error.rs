//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SceneHubError`] through `From`, so port signatures stay uniform.

use crate::id::{DeviceId, SceneId};

/// Top-level error returned by every port and use-case.
#[derive(Debug, thiserror::Error)]
pub enum SceneHubError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    DeviceOffline(#[from] DeviceOfflineError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    Cycle(#[from] SceneCycleError),

    /// Failure in a persistence adapter.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Failure in a device-control transport.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invariant violations detected while building domain objects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("name must not exceed {max} characters")]
    NameTooLong { max: usize },

    #[error("repeat days must be distinct digits between 1 and 7, got {0:?}")]
    InvalidRepeatDays(String),

    #[error("repeat days {days:?} do not match repeat type {repeat_type}")]
    RepeatTypeMismatch { repeat_type: String, days: String },

    #[error("effect window start and end must differ")]
    EmptyEffectWindow,

    #[error("manual scenes cannot declare conditions")]
    ConditionsOnManualScene,

    #[error("automatic scenes require at least one condition")]
    NoConditions,

    #[error("scenes using ALL logic accept at most one timing condition")]
    MultipleTimingConditions,

    #[error("a scene requires at least one task")]
    NoTasks,

    #[error("device control tasks require at least one command")]
    EmptyDeviceCommands,

    #[error("a scene task cannot target its own scene")]
    SelfReference,
}

/// A referenced record does not exist (or was deleted).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

impl NotFoundError {
    #[must_use]
    pub fn scene(id: SceneId) -> Self {
        Self {
            entity: "Scene",
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn device(id: DeviceId) -> Self {
        Self {
            entity: "Device",
            id: id.to_string(),
        }
    }

    /// Whether this error refers to a missing scene.
    #[must_use]
    pub fn is_scene(&self) -> bool {
        self.entity == "Scene"
    }

    /// Whether this error refers to a missing device.
    #[must_use]
    pub fn is_device(&self) -> bool {
        self.entity == "Device"
    }
}

/// The device exists but cannot be reached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("device {device_id} is offline")]
pub struct DeviceOfflineError {
    pub device_id: DeviceId,
}

/// A bounded operation did not complete in time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} timed out after {millis}ms")]
pub struct TimeoutError {
    pub operation: &'static str,
    pub millis: u128,
}

/// A run-scene chain loops back on a scene that is already executing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("scene {scene_id} is already part of the running chain")]
pub struct SceneCycleError {
    pub scene_id: SceneId,
    pub chain: Vec<SceneId>,
}
