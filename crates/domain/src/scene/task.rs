//! Scene tasks — the ordered steps a scene performs when it runs.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::attribute::AttributeCommand;
use crate::id::{DeviceId, SceneId, SceneTaskId};

/// One step of a scene, executed `delay_seconds` after the scene fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTask {
    pub id: SceneTaskId,
    #[serde(default)]
    pub delay_seconds: u32,
    #[serde(flatten)]
    pub kind: SceneTaskKind,
}

impl SceneTask {
    #[must_use]
    pub fn new(kind: SceneTaskKind) -> Self {
        Self {
            id: SceneTaskId::new(),
            delay_seconds: 0,
            kind,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, seconds: u32) -> Self {
        self.delay_seconds = seconds;
        self
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.delay_seconds))
    }

    /// Scene targeted by a nested-control step, if any.
    #[must_use]
    pub fn target_scene(&self) -> Option<SceneId> {
        match &self.kind {
            SceneTaskKind::ControlDevice { .. } => None,
            SceneTaskKind::RunScene { scene_id }
            | SceneTaskKind::EnableScene { scene_id }
            | SceneTaskKind::DisableScene { scene_id } => Some(*scene_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneTaskKind {
    /// Set attributes on a device.
    ControlDevice {
        device_id: DeviceId,
        commands: Vec<AttributeCommand>,
    },
    /// Run another scene immediately.
    RunScene { scene_id: SceneId },
    /// Arm an automatic scene.
    EnableScene { scene_id: SceneId },
    /// Disarm an automatic scene.
    DisableScene { scene_id: SceneId },
}

impl fmt::Display for SceneTaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControlDevice { device_id, commands } => {
                write!(f, "control_device({device_id}, {} commands)", commands.len())
            }
            Self::RunScene { scene_id } => write!(f, "run_scene({scene_id})"),
            Self::EnableScene { scene_id } => write!(f, "enable_scene({scene_id})"),
            Self::DisableScene { scene_id } => write!(f, "disable_scene({scene_id})"),
        }
    }
}
