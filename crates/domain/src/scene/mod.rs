//! Scene — a named list of device commands and nested scene controls.
//!
//! Manual scenes run on demand. Automatic scenes are armed/disarmed with
//! `is_on` and fire from their [`SceneCondition`]s: timing conditions
//! schedule a firing at a time of day, device-status conditions fire when a
//! watched attribute changes. Either way the scene only acts when it is in
//! effect (effect window plus repeat days) and its conditions hold under
//! its [`ConditionLogic`].

mod condition;
mod schedule;
mod task;

pub use condition::{ConditionKind, ConditionLogic, Operator, SceneCondition};
pub use schedule::{RepeatDays, RepeatType, TimePeriod};
pub use task::{SceneTask, SceneTaskKind};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::attribute::AttributeRef;
use crate::error::{SceneHubError, ValidationError};
use crate::id::{DeviceId, SceneId};
use crate::time::{LocalTimestamp, Timestamp, iso_weekday};

/// Maximum length of a scene name, in characters.
pub const MAX_NAME_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub name: String,
    /// `true` for automatic scenes, `false` for manual ones.
    pub auto_run: bool,
    /// Armed flag. Only meaningful for automatic scenes.
    pub is_on: bool,
    pub condition_logic: ConditionLogic,
    pub time_period: TimePeriod,
    pub repeat_type: RepeatType,
    pub repeat_days: RepeatDays,
    pub conditions: Vec<SceneCondition>,
    pub tasks: Vec<SceneTask>,
    pub created_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Scene {
    /// Create a builder for constructing a [`Scene`].
    #[must_use]
    pub fn builder() -> SceneBuilder {
        SceneBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SceneHubError::Validation`] when:
    /// - `name` is blank or longer than [`MAX_NAME_LEN`]
    /// - a manual scene declares conditions, or an automatic one declares none
    /// - ALL logic is combined with more than one timing condition
    /// - there are no tasks, or a device task carries no command
    /// - a task targets this very scene
    /// - the repeat days disagree with the repeat type, or the custom effect
    ///   window is empty
    pub fn validate(&self) -> Result<(), SceneHubError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong { max: MAX_NAME_LEN }.into());
        }
        if self.auto_run {
            if self.conditions.is_empty() {
                return Err(ValidationError::NoConditions.into());
            }
            let timings = self.conditions.iter().filter(|c| c.is_timing()).count();
            if self.condition_logic == ConditionLogic::All && timings > 1 {
                return Err(ValidationError::MultipleTimingConditions.into());
            }
        } else if !self.conditions.is_empty() {
            return Err(ValidationError::ConditionsOnManualScene.into());
        }
        if self.tasks.is_empty() {
            return Err(ValidationError::NoTasks.into());
        }
        for task in &self.tasks {
            if let SceneTaskKind::ControlDevice { commands, .. } = &task.kind
                && commands.is_empty()
            {
                return Err(ValidationError::EmptyDeviceCommands.into());
            }
            if task.target_scene() == Some(self.id) {
                return Err(ValidationError::SelfReference.into());
            }
        }
        self.repeat_type.check(&self.repeat_days)?;
        self.time_period.validate()?;
        Ok(())
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    #[must_use]
    pub fn has_timing_condition(&self) -> bool {
        self.conditions.iter().any(SceneCondition::is_timing)
    }

    /// Times of day at which the timing conditions fire.
    pub fn timing_conditions(&self) -> impl Iterator<Item = NaiveTime> + '_ {
        self.conditions.iter().filter_map(|c| match c.kind {
            ConditionKind::Timing { at } => Some(at),
            ConditionKind::DeviceStatus { .. } => None,
        })
    }

    /// Whether any device-status condition watches this device attribute.
    #[must_use]
    pub fn watches(&self, device: DeviceId, attribute: &AttributeRef) -> bool {
        self.conditions.iter().any(|c| c.watches(device, attribute))
    }

    /// Whether the scene repeats on the given ISO weekday.
    #[must_use]
    pub fn repeats_on(&self, weekday: u8) -> bool {
        self.repeat_days.contains(weekday)
    }

    /// Whether `now` falls inside the effect window on a repeat day.
    ///
    /// Overnight windows are judged against the weekday of `now` itself.
    #[must_use]
    pub fn is_in_effect(&self, now: &LocalTimestamp) -> bool {
        self.repeats_on(iso_weekday(now)) && self.time_period.contains(now.time())
    }
}

/// Step-by-step builder for [`Scene`].
#[derive(Debug, Default)]
pub struct SceneBuilder {
    id: Option<SceneId>,
    name: Option<String>,
    auto_run: bool,
    is_on: Option<bool>,
    condition_logic: ConditionLogic,
    time_period: TimePeriod,
    repeat_type: RepeatType,
    repeat_days: Option<RepeatDays>,
    conditions: Vec<SceneCondition>,
    tasks: Vec<SceneTask>,
    created_at: Option<Timestamp>,
    deleted_at: Option<Timestamp>,
}

impl SceneBuilder {
    #[must_use]
    pub fn id(mut self, id: SceneId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
        self
    }

    #[must_use]
    pub fn is_on(mut self, is_on: bool) -> Self {
        self.is_on = Some(is_on);
        self
    }

    #[must_use]
    pub fn condition_logic(mut self, logic: ConditionLogic) -> Self {
        self.condition_logic = logic;
        self
    }

    #[must_use]
    pub fn time_period(mut self, period: TimePeriod) -> Self {
        self.time_period = period;
        self
    }

    #[must_use]
    pub fn repeat_type(mut self, repeat_type: RepeatType) -> Self {
        self.repeat_type = repeat_type;
        self
    }

    #[must_use]
    pub fn repeat_days(mut self, days: RepeatDays) -> Self {
        self.repeat_days = Some(days);
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: SceneCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn task(mut self, task: SceneTask) -> Self {
        self.tasks.push(task);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    #[must_use]
    pub fn deleted_at(mut self, ts: Timestamp) -> Self {
        self.deleted_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`Scene`].
    ///
    /// Repeat days default to the days implied by the repeat type.
    ///
    /// # Errors
    ///
    /// Returns [`SceneHubError::Validation`] on any invariant violation, see
    /// [`Scene::validate`].
    pub fn build(self) -> Result<Scene, SceneHubError> {
        let repeat_days = self
            .repeat_days
            .or_else(|| self.repeat_type.default_days())
            .unwrap_or_default();
        let scene = Scene {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            auto_run: self.auto_run,
            is_on: self.is_on.unwrap_or(true),
            condition_logic: self.condition_logic,
            time_period: self.time_period,
            repeat_type: self.repeat_type,
            repeat_days,
            conditions: self.conditions,
            tasks: self.tasks,
            created_at: self.created_at.unwrap_or_else(crate::time::now),
            deleted_at: self.deleted_at,
        };
        scene.validate()?;
        Ok(scene)
    }
}
