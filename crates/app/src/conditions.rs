//! Condition evaluation for automatic scenes.
//!
//! Each condition kind has its own check; the scene's [`ConditionLogic`]
//! combines the results. Device-status checks read the live attribute value
//! through [`DeviceControl`], bounded by a timeout. A device that cannot be
//! read makes its condition false rather than failing the scene.

use std::time::Duration;

use scenehub_domain::attribute::{AttributeRef, AttributeValue};
use scenehub_domain::id::DeviceId;
use scenehub_domain::scene::{ConditionKind, ConditionLogic, Operator, Scene, SceneCondition};
use scenehub_domain::time::LocalTimestamp;

use crate::ports::{DeviceControl, DeviceRepository};

/// Evaluates scene conditions against live device state.
pub struct ConditionEvaluator<'a, DR, DC> {
    devices: &'a DR,
    control: &'a DC,
    timeout: Duration,
}

impl<'a, DR, DC> ConditionEvaluator<'a, DR, DC>
where
    DR: DeviceRepository + Sync,
    DC: DeviceControl + Sync,
{
    pub fn new(devices: &'a DR, control: &'a DC, timeout: Duration) -> Self {
        Self {
            devices,
            control,
            timeout,
        }
    }

    /// Whether the scene should act now.
    ///
    /// Requires the scene to be armed and in effect at `now`. Under ALL
    /// logic every condition must hold (trivially true when there are none);
    /// under ANY logic at least one must.
    pub async fn conditions_satisfied(
        &self,
        scene: &Scene,
        now: &LocalTimestamp,
        fired_by_timer: bool,
    ) -> bool {
        if !scene.is_on {
            tracing::debug!(scene_id = %scene.id, "scene is disarmed");
            return false;
        }
        if !scene.is_in_effect(now) {
            tracing::debug!(scene_id = %scene.id, %now, "scene is out of its effect window");
            return false;
        }
        match scene.condition_logic {
            ConditionLogic::All => {
                for condition in &scene.conditions {
                    if !self.holds(condition, fired_by_timer).await {
                        return false;
                    }
                }
                true
            }
            ConditionLogic::Any => {
                for condition in &scene.conditions {
                    if self.holds(condition, fired_by_timer).await {
                        return true;
                    }
                }
                false
            }
        }
    }

    async fn holds(&self, condition: &SceneCondition, fired_by_timer: bool) -> bool {
        match &condition.kind {
            ConditionKind::Timing { .. } => fired_by_timer,
            ConditionKind::DeviceStatus {
                device_id,
                attribute,
                operator,
                value,
            } => {
                self.device_status_holds(*device_id, attribute, *operator, value)
                    .await
            }
        }
    }

    async fn device_status_holds(
        &self,
        device_id: DeviceId,
        attribute: &AttributeRef,
        operator: Operator,
        expected: &AttributeValue,
    ) -> bool {
        let device = match self.devices.get_by_id(device_id, false).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                tracing::debug!(%device_id, "condition device not found");
                return false;
            }
            Err(err) => {
                tracing::warn!(%err, %device_id, "unable to load condition device");
                return false;
            }
        };
        let read = tokio::time::timeout(self.timeout, self.control.get_attribute(&device, attribute));
        match read.await {
            Ok(Ok(Some(actual))) => operator.compare(&actual, expected),
            Ok(Ok(None)) => {
                tracing::debug!(%device_id, %attribute, "attribute not exposed by device");
                false
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, %device_id, %attribute, "unable to read attribute");
                false
            }
            Err(_) => {
                tracing::warn!(%device_id, %attribute, "attribute read timed out");
                false
            }
        }
    }
}
