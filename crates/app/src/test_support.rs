//! In-memory fakes of every port, shared by the unit tests of this crate.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{FixedOffset, TimeDelta, TimeZone};

use scenehub_domain::attribute::{AttributeCommand, AttributeRef, AttributeValue};
use scenehub_domain::device::Device;
use scenehub_domain::error::{DeviceOfflineError, NotFoundError, SceneHubError};
use scenehub_domain::id::{DeviceId, SceneId, TaskId};
use scenehub_domain::scene::Scene;
use scenehub_domain::task_log::{LogTarget, TaskOutcome};
use scenehub_domain::time::LocalTimestamp;

use crate::ports::{Clock, DeviceControl, DeviceRepository, ExecutionLog, SceneRepository};

pub fn device(name: &str) -> Device {
    Device::builder()
        .name(name)
        .plugin_id("fake")
        .build()
        .unwrap()
}

// ── Scenes ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeSceneRepo {
    store: Mutex<HashMap<SceneId, Scene>>,
}

impl FakeSceneRepo {
    pub fn with(scenes: Vec<Scene>) -> Self {
        let repo = Self::default();
        for scene in scenes {
            repo.insert(scene);
        }
        repo
    }

    pub fn insert(&self, scene: Scene) {
        self.store.lock().unwrap().insert(scene.id, scene);
    }

    pub fn soft_delete(&self, id: SceneId) {
        if let Some(scene) = self.store.lock().unwrap().get_mut(&id) {
            scene.deleted_at = Some(scenehub_domain::time::now());
        }
    }

    pub fn get(&self, id: SceneId) -> Option<Scene> {
        self.store.lock().unwrap().get(&id).cloned()
    }
}

impl SceneRepository for FakeSceneRepo {
    fn get_by_id(
        &self,
        id: SceneId,
        include_deleted: bool,
    ) -> impl Future<Output = Result<Option<Scene>, SceneHubError>> + Send {
        let r = self
            .get(id)
            .filter(|scene| include_deleted || !scene.is_deleted());
        async { Ok(r) }
    }

    fn find_armed_for_weekday(
        &self,
        weekday: u8,
    ) -> impl Future<Output = Result<Vec<Scene>, SceneHubError>> + Send {
        let store = self.store.lock().unwrap();
        let r: Vec<_> = store
            .values()
            .filter(|s| s.auto_run && s.is_on && !s.is_deleted() && s.repeats_on(weekday))
            .cloned()
            .collect();
        async { Ok(r) }
    }

    fn find_armed_by_device_attribute(
        &self,
        device_id: DeviceId,
        attribute: &AttributeRef,
    ) -> impl Future<Output = Result<Vec<Scene>, SceneHubError>> + Send {
        let store = self.store.lock().unwrap();
        let r: Vec<_> = store
            .values()
            .filter(|s| s.auto_run && s.is_on && !s.is_deleted() && s.watches(device_id, attribute))
            .cloned()
            .collect();
        async { Ok(r) }
    }

    fn set_armed(
        &self,
        id: SceneId,
        is_on: bool,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        let mut store = self.store.lock().unwrap();
        let r = match store.get_mut(&id) {
            Some(scene) if !scene.is_deleted() => {
                scene.is_on = is_on;
                Ok(())
            }
            _ => Err(NotFoundError::scene(id).into()),
        };
        async { r }
    }
}

// ── Devices ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDeviceRepo {
    store: Mutex<HashMap<DeviceId, Device>>,
}

impl FakeDeviceRepo {
    pub fn with(devices: Vec<Device>) -> Self {
        let map = devices.into_iter().map(|d| (d.id, d)).collect();
        Self {
            store: Mutex::new(map),
        }
    }

    pub fn soft_delete(&self, id: DeviceId) {
        if let Some(device) = self.store.lock().unwrap().get_mut(&id) {
            device.deleted_at = Some(scenehub_domain::time::now());
        }
    }
}

impl DeviceRepository for FakeDeviceRepo {
    fn get_by_id(
        &self,
        id: DeviceId,
        include_deleted: bool,
    ) -> impl Future<Output = Result<Option<Device>, SceneHubError>> + Send {
        let store = self.store.lock().unwrap();
        let r = store
            .get(&id)
            .filter(|d| include_deleted || !d.is_deleted())
            .cloned();
        async { Ok(r) }
    }
}

// ── Device control ─────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDeviceControl {
    values: Mutex<HashMap<(DeviceId, AttributeRef), AttributeValue>>,
    offline: Mutex<HashSet<DeviceId>>,
    stalled: Mutex<HashSet<DeviceId>>,
    calls: Mutex<Vec<(DeviceId, Vec<AttributeCommand>)>>,
}

impl FakeDeviceControl {
    pub fn set_value(&self, device: DeviceId, attribute: AttributeRef, value: AttributeValue) {
        self.values
            .lock()
            .unwrap()
            .insert((device, attribute), value);
    }

    pub fn set_offline(&self, device: DeviceId, offline: bool) {
        let mut set = self.offline.lock().unwrap();
        if offline {
            set.insert(device);
        } else {
            set.remove(&device);
        }
    }

    /// Make every request to `device` hang for a minute.
    pub fn stall(&self, device: DeviceId) {
        self.stalled.lock().unwrap().insert(device);
    }

    pub fn calls(&self) -> Vec<(DeviceId, Vec<AttributeCommand>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, device: DeviceId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == device)
            .count()
    }

    fn precheck(&self, device: DeviceId) -> (bool, Result<(), SceneHubError>) {
        let stalled = self.stalled.lock().unwrap().contains(&device);
        let r = if self.offline.lock().unwrap().contains(&device) {
            Err(DeviceOfflineError { device_id: device }.into())
        } else {
            Ok(())
        };
        (stalled, r)
    }
}

impl DeviceControl for FakeDeviceControl {
    fn set_attributes(
        &self,
        device: &Device,
        commands: &[AttributeCommand],
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        let (stalled, r) = self.precheck(device.id);
        if r.is_ok() && !stalled {
            self.calls
                .lock()
                .unwrap()
                .push((device.id, commands.to_vec()));
            let mut values = self.values.lock().unwrap();
            for cmd in commands {
                values.insert((device.id, cmd.target.clone()), cmd.value.clone());
            }
        }
        async move {
            if stalled {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            r
        }
    }

    fn get_attribute(
        &self,
        device: &Device,
        attribute: &AttributeRef,
    ) -> impl Future<Output = Result<Option<AttributeValue>, SceneHubError>> + Send {
        let (stalled, r) = self.precheck(device.id);
        let value = self
            .values
            .lock()
            .unwrap()
            .get(&(device.id, attribute.clone()))
            .cloned();
        async move {
            if stalled {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            r.map(|()| value)
        }
    }
}

// ── Execution log ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StartRecord {
    pub task_id: TaskId,
    pub parent_id: Option<TaskId>,
    pub target: LogTarget,
}

#[derive(Default)]
pub struct FakeExecutionLog {
    starts: Mutex<Vec<StartRecord>>,
    results: Mutex<Vec<(TaskId, TaskOutcome, Option<String>)>>,
}

impl FakeExecutionLog {
    pub fn starts(&self) -> Vec<StartRecord> {
        self.starts.lock().unwrap().clone()
    }

    pub fn outcome_of(&self, task_id: TaskId) -> Option<TaskOutcome> {
        self.results
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _, _)| *id == task_id)
            .map(|(_, outcome, _)| *outcome)
    }

    pub fn outcomes(&self) -> Vec<TaskOutcome> {
        self.results
            .lock()
            .unwrap()
            .iter()
            .map(|(_, outcome, _)| *outcome)
            .collect()
    }

    pub fn internal_runs(&self, label: &str) -> usize {
        self.starts()
            .iter()
            .filter(|s| matches!(&s.target, LogTarget::Internal { label: l } if l == label))
            .count()
    }
}

impl ExecutionLog for FakeExecutionLog {
    fn record_task_start(
        &self,
        task_id: TaskId,
        parent_id: Option<TaskId>,
        target: LogTarget,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        self.starts.lock().unwrap().push(StartRecord {
            task_id,
            parent_id,
            target,
        });
        async { Ok(()) }
    }

    fn record_task_result(
        &self,
        task_id: TaskId,
        outcome: TaskOutcome,
        error: Option<String>,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        self.results
            .lock()
            .unwrap()
            .push((task_id, outcome, error));
        async { Ok(()) }
    }
}

// ── Clock ──────────────────────────────────────────────────────────

pub struct FakeClock {
    now: Mutex<LocalTimestamp>,
}

impl FakeClock {
    /// 2024-05-06 is a Monday. Offset +01:00.
    pub fn monday_at(hour: u32, minute: u32) -> Self {
        let now = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 6, hour, minute, 0)
            .unwrap();
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn current(&self) -> LocalTimestamp {
        *self.now.lock().unwrap()
    }

    pub fn set(&self, now: LocalTimestamp) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.now.lock().unwrap() += delta;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> LocalTimestamp {
        self.current()
    }
}
