//! Scene manager — turns scenes into queued tasks and executes them.
//!
//! Every firing re-reads the scene from storage, so edits, deletions and
//! disarming made after scheduling are honoured when the task runs. A scene
//! firing fans out into one child task per scene task, each delayed by its
//! own `delay_seconds` and parented to the firing for the execution log.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{NaiveTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use scenehub_domain::attribute::{AttributeCommand, AttributeRef};
use scenehub_domain::error::{NotFoundError, SceneCycleError, SceneHubError, TimeoutError};
use scenehub_domain::event::DeviceEvent;
use scenehub_domain::id::{DeviceId, SceneId, TaskId};
use scenehub_domain::scene::{ConditionLogic, Scene, SceneTask, SceneTaskKind};
use scenehub_domain::task_log::{LogTarget, TaskOutcome};
use scenehub_domain::time::{LocalTimestamp, Timestamp, add_days, iso_weekday, on_same_day};

use crate::conditions::ConditionEvaluator;
use crate::ports::{Clock, DeviceControl, DeviceRepository, ExecutionLog, SceneRepository};
use crate::queue::QueueServer;
use crate::task::{Task, TaskFn, TaskFuture, TaskHandle, TaskResult, TaskWrapper};

/// Label of the daily arrangement task in logs.
pub const ARRANGE_LABEL: &str = "arrange_scenes";

/// Tunables of the [`SceneManager`].
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Local time of day at which the next day's timer firings are queued.
    pub arrange_at: NaiveTime,
    /// Upper bound for a single device read or write.
    pub device_timeout: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            arrange_at: NaiveTime::from_hms_opt(23, 55, 0).unwrap_or(NaiveTime::MIN),
            device_timeout: Duration::from_secs(10),
        }
    }
}

/// Schedules and executes scenes.
///
/// Shared as `Arc<SceneManager<..>>`: queued task bodies keep a reference to
/// the manager until they run.
pub struct SceneManager<SR, DR, DC, EL, C> {
    scenes: SR,
    devices: DR,
    control: DC,
    log: EL,
    clock: C,
    queue: QueueServer,
    settings: ManagerSettings,
    /// Timer firings queued per scene and not yet started.
    pending: Mutex<HashMap<SceneId, HashSet<TaskId>>>,
}

impl<SR, DR, DC, EL, C> SceneManager<SR, DR, DC, EL, C>
where
    SR: SceneRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    DC: DeviceControl + Send + Sync + 'static,
    EL: ExecutionLog + Send + Sync + 'static,
    C: Clock + 'static,
{
    pub fn new(
        scenes: SR,
        devices: DR,
        control: DC,
        log: EL,
        clock: C,
        settings: ManagerSettings,
    ) -> Self {
        Self {
            scenes,
            devices,
            control,
            log,
            clock,
            queue: QueueServer::new(),
            settings,
            pending: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn queue(&self) -> &QueueServer {
        &self.queue
    }

    #[must_use]
    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Number of timer firings of a scene still waiting in the queue.
    #[must_use]
    pub fn pending_firings(&self, scene_id: SceneId) -> usize {
        self.lock_pending().get(&scene_id).map_or(0, HashSet::len)
    }

    /// Queue today's remaining timer firings and the daily arrangement, then
    /// spawn the queue loop.
    ///
    /// # Errors
    ///
    /// Returns an error if armed scenes cannot be loaded.
    #[tracing::instrument(skip_all)]
    pub async fn start(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, SceneHubError> {
        let now = self.clock.now();
        let scheduled = self.add_scene_task_by_time(now).await?;
        self.add_arrange_scene_task(on_same_day(&now, self.settings.arrange_at));
        tracing::info!(scheduled, arrange_at = %self.settings.arrange_at, "scene manager started");

        let manager = Arc::clone(self);
        Ok(tokio::spawn(async move {
            manager.queue.run(&manager.clock, shutdown).await;
        }))
    }

    /// Schedule a scene from its configuration.
    ///
    /// Manual scenes run immediately. Armed automatic scenes get one firing
    /// per timing condition still ahead today; once today's arrangement time
    /// has passed, tomorrow's firings are queued as well. Returns the number
    /// of firings queued.
    pub fn add_scene_task(self: &Arc<Self>, scene: &Scene) -> usize {
        if !scene.auto_run {
            tracing::info!(scene_id = %scene.id, scene = %scene.name, "running manual scene");
            self.push_scene_firing(scene, self.now_utc(), Vec::new(), false, None);
            return 1;
        }
        if !scene.is_on {
            tracing::debug!(scene_id = %scene.id, "scene is disarmed, nothing to schedule");
            return 0;
        }
        let now = self.clock.now();
        let mut scheduled = self.schedule_timings(scene, &now, &now);
        if now >= on_same_day(&now, self.settings.arrange_at) {
            let tomorrow = add_days(&now, 1);
            if scene.repeats_on(iso_weekday(&tomorrow)) {
                scheduled += self.schedule_timings(scene, &tomorrow, &now);
            }
        }
        scheduled
    }

    /// Load a scene and schedule it, see [`Self::add_scene_task`].
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the scene does not exist.
    pub async fn add_scene_task_by_id(
        self: &Arc<Self>,
        scene_id: SceneId,
    ) -> Result<usize, SceneHubError> {
        let scene = self.load_scene(scene_id).await?;
        Ok(self.add_scene_task(&scene))
    }

    /// Queue the timer firings, on the calendar day of `day`, of every armed
    /// automatic scene that repeats on that weekday. Instants already in the
    /// past are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if armed scenes cannot be loaded.
    #[tracing::instrument(skip_all, fields(day = %day.date_naive()))]
    pub async fn add_scene_task_by_time(
        self: &Arc<Self>,
        day: LocalTimestamp,
    ) -> Result<usize, SceneHubError> {
        let scenes = self.scenes.find_armed_for_weekday(iso_weekday(&day)).await?;
        let now = self.clock.now();
        let scheduled: usize = scenes
            .iter()
            .filter(|scene| scene.has_timing_condition())
            .map(|scene| self.schedule_timings(scene, &day, &now))
            .sum();
        tracing::info!(scenes = scenes.len(), scheduled, "timer scenes arranged");
        Ok(scheduled)
    }

    /// Queue the arrangement task at `execute_time`. When it fires it
    /// arranges the timer firings of the following day and re-queues itself
    /// one day later.
    pub fn add_arrange_scene_task(self: &Arc<Self>, execute_time: LocalTimestamp) -> TaskId {
        let manager = Arc::clone(self);
        let task = Task::new_at(execute_time.with_timezone(&Utc), move |_| async move {
            manager.arrange(execute_time).await
        })
        .with_value(ARRANGE_LABEL);
        self.push_task(
            task,
            LogTarget::Internal {
                label: ARRANGE_LABEL.to_string(),
            },
        )
    }

    /// Drop every queued timer firing of a scene. Firings already running
    /// are not affected. Returns the number of tasks removed.
    pub fn delete_scene_task(&self, scene_id: SceneId) -> usize {
        let queued = self.lock_pending().remove(&scene_id).unwrap_or_default();
        let removed = queued
            .into_iter()
            .filter(|task_id| self.queue.remove(*task_id))
            .count();
        if removed > 0 {
            tracing::info!(%scene_id, removed, "queued firings dropped");
        }
        removed
    }

    /// Drop and re-create the timer firings of a scene from its current
    /// configuration. No-op for manual scenes.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the scene does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn restart_scene_task(self: &Arc<Self>, scene_id: SceneId) -> TaskResult {
        self.delete_scene_task(scene_id);
        let scene = self.load_scene(scene_id).await?;
        if scene.auto_run {
            self.add_scene_task(&scene);
        }
        Ok(())
    }

    /// Arm an automatic scene and queue its firings.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the scene does not exist, or the
    /// storage error raised while persisting the flag.
    #[tracing::instrument(skip(self))]
    pub async fn set_scene_on(self: &Arc<Self>, scene_id: SceneId) -> TaskResult {
        self.scenes.set_armed(scene_id, true).await?;
        let scene = self.load_scene(scene_id).await?;
        if scene.auto_run {
            self.delete_scene_task(scene_id);
            let scheduled = self.add_scene_task(&scene);
            tracing::info!(scheduled, "scene armed");
        }
        Ok(())
    }

    /// Disarm an automatic scene and drop its queued firings.
    ///
    /// Queued firings are dropped even when the scene has been deleted.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the scene does not exist, or the
    /// storage error raised while persisting the flag.
    #[tracing::instrument(skip(self))]
    pub async fn set_scene_off(self: &Arc<Self>, scene_id: SceneId) -> TaskResult {
        self.delete_scene_task(scene_id);
        self.scenes.set_armed(scene_id, false).await?;
        tracing::info!("scene disarmed");
        Ok(())
    }

    /// React to a device attribute change: fire every armed automatic scene
    /// watching it, except ALL-logic scenes that also need a timer.
    /// Returns the number of scenes fired.
    ///
    /// # Errors
    ///
    /// Returns an error if the watching scenes cannot be loaded.
    #[tracing::instrument(skip(self))]
    pub async fn device_state_change(
        self: &Arc<Self>,
        device_id: DeviceId,
        attribute: &AttributeRef,
    ) -> Result<usize, SceneHubError> {
        let scenes = self
            .scenes
            .find_armed_by_device_attribute(device_id, attribute)
            .await?;
        let now = self.now_utc();
        let mut fired = 0;
        for scene in &scenes {
            if scene.condition_logic == ConditionLogic::All && scene.has_timing_condition() {
                tracing::debug!(scene_id = %scene.id, "scene also waits for its timer, ignored");
                continue;
            }
            self.push_scene_firing(scene, now, Vec::new(), false, None);
            fired += 1;
        }
        Ok(fired)
    }

    /// Feed device events into [`Self::device_state_change`] until
    /// `shutdown` turns `true` or the event channel closes.
    pub async fn listen(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<DeviceEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                received = events.recv() => match received {
                    Ok(event) => {
                        if let Err(err) = self.device_state_change(event.device_id, &event.attribute).await {
                            tracing::error!(%err, device_id = %event.device_id, "unable to handle device event");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "device event listener lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        tracing::info!("device event listener stopped");
    }

    /// Apply device commands one request at a time.
    ///
    /// # Errors
    ///
    /// Stops at the first failure: a not-found error when the device is
    /// missing or deleted, an offline error from the transport, or a timeout.
    pub async fn execute_device(
        &self,
        device_id: DeviceId,
        commands: &[AttributeCommand],
    ) -> TaskResult {
        for command in commands {
            let device = self
                .devices
                .get_by_id(device_id, false)
                .await?
                .ok_or_else(|| NotFoundError::device(device_id))?;
            tracing::info!(
                %device_id,
                attribute = %command.target,
                value = %command.value,
                "executing device command"
            );
            let request = self
                .control
                .set_attributes(&device, std::slice::from_ref(command));
            match tokio::time::timeout(self.settings.device_timeout, request).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(TimeoutError {
                        operation: "set_attributes",
                        millis: self.settings.device_timeout.as_millis(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Body of a scene firing.
    #[tracing::instrument(skip_all, fields(task_id = %handle.id, %scene_id))]
    async fn execute_scene(
        self: &Arc<Self>,
        handle: TaskHandle,
        scene_id: SceneId,
        mut lineage: Vec<SceneId>,
        fired_by_timer: bool,
    ) -> TaskResult {
        self.forget_pending(scene_id, handle.id);
        let scene = self.load_scene(scene_id).await?;

        if scene.auto_run {
            let now = self.clock.now();
            let evaluator =
                ConditionEvaluator::new(&self.devices, &self.control, self.settings.device_timeout);
            if !evaluator
                .conditions_satisfied(&scene, &now, fired_by_timer)
                .await
            {
                tracing::info!(scene = %scene.name, "conditions not satisfied");
                return Ok(());
            }
        }

        lineage.push(scene_id);
        let start = self.now_utc();
        for scene_task in &scene.tasks {
            match self.resolve_target(scene_task).await {
                Some(target) => {
                    self.push_scene_task(scene_task, start, &lineage, &handle, target);
                }
                None => {
                    tracing::warn!(scene_task_id = %scene_task.id, "task target missing, skipped");
                }
            }
        }
        tracing::info!(scene = %scene.name, tasks = scene.tasks.len(), "scene executed");
        Ok(())
    }

    /// Body of one scene task.
    #[tracing::instrument(skip_all, fields(task_id = %handle.id))]
    async fn execute_scene_task(
        self: &Arc<Self>,
        handle: TaskHandle,
        kind: SceneTaskKind,
        lineage: Vec<SceneId>,
    ) -> TaskResult {
        match kind {
            SceneTaskKind::ControlDevice {
                device_id,
                commands,
            } => self.execute_device(device_id, &commands).await,
            SceneTaskKind::RunScene { scene_id } => {
                if lineage.contains(&scene_id) {
                    return Err(SceneCycleError {
                        scene_id,
                        chain: lineage,
                    }
                    .into());
                }
                let scene = self.load_scene(scene_id).await?;
                self.push_scene_firing(&scene, self.now_utc(), lineage, false, Some(&handle));
                Ok(())
            }
            SceneTaskKind::EnableScene { scene_id } => self.set_scene_on(scene_id).await,
            SceneTaskKind::DisableScene { scene_id } => self.set_scene_off(scene_id).await,
        }
    }

    async fn arrange(self: &Arc<Self>, execute_time: LocalTimestamp) -> TaskResult {
        let next = add_days(&execute_time, 1);
        self.add_arrange_scene_task(next);
        self.add_scene_task_by_time(next).await.map(|_| ())
    }

    /// Resolve the target of a scene task for the execution log, including
    /// soft-deleted records.
    async fn resolve_target(&self, scene_task: &SceneTask) -> Option<LogTarget> {
        let resolved = match &scene_task.kind {
            SceneTaskKind::ControlDevice { device_id, .. } => self
                .devices
                .get_by_id(*device_id, true)
                .await
                .map(|device| {
                    device.map(|d| LogTarget::Device {
                        id: d.id,
                        name: d.name,
                    })
                }),
            SceneTaskKind::RunScene { scene_id }
            | SceneTaskKind::EnableScene { scene_id }
            | SceneTaskKind::DisableScene { scene_id } => self
                .scenes
                .get_by_id(*scene_id, true)
                .await
                .map(|scene| scene.map(|s| scene_target(&s))),
        };
        resolved.unwrap_or_else(|err| {
            tracing::warn!(%err, scene_task_id = %scene_task.id, "unable to resolve task target");
            None
        })
    }

    fn schedule_timings(
        self: &Arc<Self>,
        scene: &Scene,
        day: &LocalTimestamp,
        not_before: &LocalTimestamp,
    ) -> usize {
        let mut scheduled = 0;
        for at in scene.timing_conditions() {
            let when = on_same_day(day, at);
            if when < *not_before {
                tracing::debug!(scene_id = %scene.id, %when, "firing time already passed");
                continue;
            }
            self.push_scene_firing(scene, when.with_timezone(&Utc), Vec::new(), true, None);
            scheduled += 1;
        }
        scheduled
    }

    /// Queue a firing of `scene`. Timer firings are tracked so they can be
    /// dropped when the scene is disarmed or restarted.
    fn push_scene_firing(
        self: &Arc<Self>,
        scene: &Scene,
        at: Timestamp,
        lineage: Vec<SceneId>,
        fired_by_timer: bool,
        parent: Option<&TaskHandle>,
    ) -> TaskId {
        let manager = Arc::clone(self);
        let scene_id = scene.id;
        let mut task = Task::new_at(at, move |handle| async move {
            manager
                .execute_scene(handle, scene_id, lineage, fired_by_timer)
                .await
        })
        .with_value(format!("scene {:?}", scene.name));
        if let Some(parent) = parent {
            task = task.with_parent(parent);
        }
        if fired_by_timer {
            self.lock_pending()
                .entry(scene_id)
                .or_default()
                .insert(task.id());
        }
        self.push_task(task, scene_target(scene))
    }

    fn push_scene_task(
        self: &Arc<Self>,
        scene_task: &SceneTask,
        start: Timestamp,
        lineage: &[SceneId],
        parent: &TaskHandle,
        target: LogTarget,
    ) -> TaskId {
        let manager = Arc::clone(self);
        let kind = scene_task.kind.clone();
        let label = kind.to_string();
        let lineage = lineage.to_vec();
        let task = Task::new_after(start, scene_task.delay(), move |handle| async move {
            manager.execute_scene_task(handle, kind, lineage).await
        })
        .with_parent(parent)
        .with_value(label);
        self.push_task(task, target)
    }

    fn push_task(self: &Arc<Self>, task: Task, target: LogTarget) -> TaskId {
        self.queue.push(task.with_wrapper(self.log_wrapper(target)))
    }

    /// Wrapper recording the start and outcome of a task in the execution log.
    fn log_wrapper(self: &Arc<Self>, target: LogTarget) -> TaskWrapper {
        let manager = Arc::clone(self);
        Box::new(move |inner: TaskFn| -> TaskFn {
            Box::new(move |handle: TaskHandle| -> TaskFuture {
                Box::pin(async move {
                    manager.record_start(&handle, target).await;
                    let result = inner(handle.clone()).await;
                    manager.record_result(&handle, &result).await;
                    result
                })
            })
        })
    }

    async fn record_start(&self, handle: &TaskHandle, target: LogTarget) {
        if let Err(err) = self
            .log
            .record_task_start(handle.id, handle.parent_id, target)
            .await
        {
            tracing::warn!(%err, task_id = %handle.id, "unable to record task start");
        }
    }

    async fn record_result(&self, handle: &TaskHandle, result: &TaskResult) {
        let outcome = TaskOutcome::from_result(result);
        let error = result.as_ref().err().map(ToString::to_string);
        if let Err(err) = self
            .log
            .record_task_result(handle.id, outcome, error)
            .await
        {
            tracing::warn!(%err, task_id = %handle.id, "unable to record task result");
        }
    }

    async fn load_scene(&self, scene_id: SceneId) -> Result<Scene, SceneHubError> {
        let scene = self
            .scenes
            .get_by_id(scene_id, false)
            .await?
            .ok_or_else(|| NotFoundError::scene(scene_id))?;
        Ok(scene)
    }

    fn forget_pending(&self, scene_id: SceneId, task_id: TaskId) {
        let mut pending = self.lock_pending();
        if let Some(queued) = pending.get_mut(&scene_id) {
            queued.remove(&task_id);
            if queued.is_empty() {
                pending.remove(&scene_id);
            }
        }
    }

    fn now_utc(&self) -> Timestamp {
        self.clock.now().with_timezone(&Utc)
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<SceneId, HashSet<TaskId>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn scene_target(scene: &Scene) -> LogTarget {
    LogTarget::Scene {
        id: scene.id,
        name: scene.name.clone(),
        auto_run: scene.auto_run,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use scenehub_domain::attribute::AttributeValue;
    use scenehub_domain::device::Device;
    use scenehub_domain::scene::{Operator, SceneCondition};

    use crate::event_bus::InProcessEventBus;
    use crate::ports::EventPublisher;
    use crate::queue::Tick;
    use crate::test_support::{
        FakeClock, FakeDeviceControl, FakeDeviceRepo, FakeExecutionLog, FakeSceneRepo, device,
    };

    type Manager = SceneManager<
        Arc<FakeSceneRepo>,
        Arc<FakeDeviceRepo>,
        Arc<FakeDeviceControl>,
        Arc<FakeExecutionLog>,
        Arc<FakeClock>,
    >;

    struct Fixture {
        scenes: Arc<FakeSceneRepo>,
        devices: Arc<FakeDeviceRepo>,
        control: Arc<FakeDeviceControl>,
        log: Arc<FakeExecutionLog>,
        clock: Arc<FakeClock>,
        manager: Arc<Manager>,
    }

    impl Fixture {
        fn new(devices: Vec<Device>, scenes: Vec<Scene>) -> Self {
            Self::with_settings(devices, scenes, ManagerSettings::default())
        }

        fn with_settings(devices: Vec<Device>, scenes: Vec<Scene>, settings: ManagerSettings) -> Self {
            let scenes = Arc::new(FakeSceneRepo::with(scenes));
            let devices = Arc::new(FakeDeviceRepo::with(devices));
            let control = Arc::new(FakeDeviceControl::default());
            let log = Arc::new(FakeExecutionLog::default());
            let clock = Arc::new(FakeClock::monday_at(12, 0));
            let manager = Arc::new(SceneManager::new(
                Arc::clone(&scenes),
                Arc::clone(&devices),
                Arc::clone(&control),
                Arc::clone(&log),
                Arc::clone(&clock),
                settings,
            ));
            Self {
                scenes,
                devices,
                control,
                log,
                clock,
                manager,
            }
        }

        fn now_utc(&self) -> Timestamp {
            self.clock.current().with_timezone(&Utc)
        }

        /// Run every task due at the fake clock's current time, children
        /// included.
        async fn run_due(&self) -> usize {
            let mut ran = 0;
            while let Tick::Ready(task) = self.manager.queue().tick(self.now_utc()) {
                let _ = task.run().await;
                ran += 1;
            }
            ran
        }
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn power_on(device_id: DeviceId) -> SceneTask {
        SceneTask::new(SceneTaskKind::ControlDevice {
            device_id,
            commands: vec![AttributeCommand::new(1, "power", true)],
        })
    }

    fn manual(name: &str, tasks: Vec<SceneTask>) -> Scene {
        let mut builder = Scene::builder().name(name);
        for task in tasks {
            builder = builder.task(task);
        }
        builder.build().unwrap()
    }

    fn timed(name: &str, at: NaiveTime, task: SceneTask) -> Scene {
        Scene::builder()
            .name(name)
            .auto_run(true)
            .condition(SceneCondition::timing(at))
            .task(task)
            .build()
            .unwrap()
    }

    fn temperature() -> AttributeRef {
        AttributeRef::new(1, "temperature")
    }

    #[tokio::test]
    async fn should_run_manual_scene_immediately_with_linked_children() {
        let lamp = device("Lamp");
        let lamp_id = lamp.id;
        let scene = manual("Movie night", vec![power_on(lamp_id)]);
        let fx = Fixture::new(vec![lamp], vec![scene.clone()]);

        assert_eq!(fx.manager.add_scene_task(&scene), 1);
        assert_eq!(fx.manager.queue().snapshot()[0].priority, fx.now_utc());

        assert_eq!(fx.run_due().await, 2);
        assert_eq!(fx.control.calls_for(lamp_id), 1);

        let starts = fx.log.starts();
        assert_eq!(starts.len(), 2);
        assert_eq!(starts[0].parent_id, None);
        assert_eq!(starts[1].parent_id, Some(starts[0].task_id));
        assert!(matches!(&starts[1].target, LogTarget::Device { id, .. } if *id == lamp_id));
        assert!(fx.log.outcomes().iter().all(|o| o.is_success()));
    }

    #[tokio::test]
    async fn should_schedule_only_remaining_timings_of_today() {
        let scene = Scene::builder()
            .name("Lights")
            .auto_run(true)
            .condition_logic(ConditionLogic::Any)
            .condition(SceneCondition::timing(hm(8, 0)))
            .condition(SceneCondition::timing(hm(18, 0)))
            .task(power_on(DeviceId::new()))
            .build()
            .unwrap();
        let fx = Fixture::new(Vec::new(), vec![scene.clone()]);

        assert_eq!(fx.manager.add_scene_task(&scene), 1);
        let queued = fx.manager.queue().snapshot();
        assert_eq!(queued.len(), 1);
        // 18:00 at +01:00
        assert_eq!(queued[0].priority, fx.now_utc() + TimeDelta::hours(6));
        assert_eq!(fx.manager.pending_firings(scene.id), 1);
    }

    #[tokio::test]
    async fn should_also_schedule_tomorrow_after_arrangement_time() {
        let scene = Scene::builder()
            .name("Late")
            .auto_run(true)
            .condition_logic(ConditionLogic::Any)
            .condition(SceneCondition::timing(hm(8, 0)))
            .condition(SceneCondition::timing(hm(23, 59)))
            .task(power_on(DeviceId::new()))
            .build()
            .unwrap();
        let fx = Fixture::new(Vec::new(), vec![scene.clone()]);
        fx.clock.set(on_same_day(&fx.clock.current(), hm(23, 58)));

        // today 23:59, tomorrow 08:00 and 23:59
        assert_eq!(fx.manager.add_scene_task(&scene), 3);
    }

    #[tokio::test]
    async fn should_not_schedule_disarmed_scene() {
        let mut scene = timed("Off", hm(18, 0), power_on(DeviceId::new()));
        scene.is_on = false;
        let fx = Fixture::new(Vec::new(), vec![scene.clone()]);
        assert_eq!(fx.manager.add_scene_task(&scene), 0);
        assert!(fx.manager.queue().is_empty());
    }

    #[tokio::test]
    async fn should_do_nothing_when_scene_deleted_after_scheduling() {
        let lamp = device("Lamp");
        let lamp_id = lamp.id;
        let scene = manual("Gone", vec![power_on(lamp_id)]);
        let fx = Fixture::new(vec![lamp], vec![scene.clone()]);

        fx.manager.add_scene_task(&scene);
        let firing = fx.manager.queue().snapshot()[0].id;
        fx.scenes.soft_delete(scene.id);

        assert_eq!(fx.run_due().await, 1);
        assert_eq!(fx.control.calls_for(lamp_id), 0);
        assert_eq!(fx.log.outcome_of(firing), Some(TaskOutcome::SceneAlreadyDeleted));
    }

    #[tokio::test]
    async fn should_skip_tasks_when_conditions_do_not_hold() {
        let sensor = device("Thermometer");
        let lamp = device("Lamp");
        let (sensor_id, lamp_id) = (sensor.id, lamp.id);
        let scene = Scene::builder()
            .name("Too warm")
            .auto_run(true)
            .condition(SceneCondition::device_status(
                sensor_id,
                temperature(),
                Operator::GreaterThan,
                22.0,
            ))
            .task(power_on(lamp_id))
            .build()
            .unwrap();
        let fx = Fixture::new(vec![sensor, lamp], vec![scene]);
        fx.control
            .set_value(sensor_id, temperature(), AttributeValue::Float(15.0));

        assert_eq!(fx.manager.device_state_change(sensor_id, &temperature()).await.unwrap(), 1);
        assert_eq!(fx.run_due().await, 1);
        assert_eq!(fx.control.calls_for(lamp_id), 0);
        assert_eq!(fx.log.outcomes(), vec![TaskOutcome::Success]);
    }

    #[tokio::test]
    async fn should_delay_each_child_from_scene_start() {
        let devices: Vec<_> = ["A", "B", "C"].into_iter().map(device).collect();
        let tasks = devices
            .iter()
            .zip([0, 2, 5])
            .map(|(d, delay)| power_on(d.id).with_delay(delay))
            .collect();
        let ids: Vec<_> = devices.iter().map(|d| d.id).collect();
        let scene = manual("Staggered", tasks);
        let fx = Fixture::new(devices, vec![scene.clone()]);

        fx.manager.add_scene_task(&scene);
        let Tick::Ready(firing) = fx.manager.queue().tick(fx.now_utc()) else {
            panic!("firing should be due");
        };
        let firing_id = firing.id();
        firing.run().await.unwrap();

        let start = fx.now_utc();
        let queued = fx.manager.queue().snapshot();
        let offsets: Vec<_> = queued.iter().map(|h| h.priority - start).collect();
        assert_eq!(
            offsets,
            vec![TimeDelta::zero(), TimeDelta::seconds(2), TimeDelta::seconds(5)]
        );
        assert!(queued.iter().all(|h| h.parent_id == Some(firing_id)));

        fx.run_due().await;
        assert_eq!(fx.control.calls().len(), 1);
        fx.clock.advance(TimeDelta::seconds(5));
        fx.run_due().await;
        assert!(ids.iter().all(|id| fx.control.calls_for(*id) == 1));
    }

    #[tokio::test]
    async fn should_isolate_offline_device_from_siblings() {
        let online = device("Online");
        let offline = device("Offline");
        let (online_id, offline_id) = (online.id, offline.id);
        let scene = manual("Both", vec![power_on(offline_id), power_on(online_id)]);
        let fx = Fixture::new(vec![online, offline], vec![scene.clone()]);
        fx.control.set_offline(offline_id, true);

        fx.manager.add_scene_task(&scene);
        fx.run_due().await;

        assert_eq!(fx.control.calls_for(online_id), 1);
        let outcomes = fx.log.outcomes();
        assert!(outcomes.contains(&TaskOutcome::DeviceOffline));
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 2);
    }

    #[tokio::test]
    async fn should_report_device_deleted_after_scene_creation() {
        let lamp = device("Lamp");
        let lamp_id = lamp.id;
        let scene = manual("Stale", vec![power_on(lamp_id)]);
        let fx = Fixture::new(vec![lamp], vec![scene.clone()]);
        fx.devices.soft_delete(lamp_id);

        fx.manager.add_scene_task(&scene);
        fx.run_due().await;

        let starts = fx.log.starts();
        assert_eq!(starts.len(), 2);
        assert_eq!(
            fx.log.outcome_of(starts[1].task_id),
            Some(TaskOutcome::DeviceAlreadyDeleted)
        );
        assert_eq!(fx.control.calls_for(lamp_id), 0);
    }

    #[tokio::test]
    async fn should_skip_task_whose_target_never_existed() {
        let lamp = device("Lamp");
        let lamp_id = lamp.id;
        let scene = manual("Partly broken", vec![power_on(DeviceId::new()), power_on(lamp_id)]);
        let fx = Fixture::new(vec![lamp], vec![scene.clone()]);

        fx.manager.add_scene_task(&scene);
        assert_eq!(fx.run_due().await, 2);
        assert_eq!(fx.control.calls_for(lamp_id), 1);
    }

    #[tokio::test]
    async fn should_ignore_device_change_for_all_logic_scene_with_timer() {
        let sensor = device("Thermometer");
        let sensor_id = sensor.id;
        let warm = || {
            SceneCondition::device_status(sensor_id, temperature(), Operator::GreaterThan, 22.0)
        };
        let timed_all = Scene::builder()
            .name("Timed")
            .auto_run(true)
            .condition(SceneCondition::timing(hm(18, 0)))
            .condition(warm())
            .task(power_on(DeviceId::new()))
            .build()
            .unwrap();
        let any = Scene::builder()
            .name("Any")
            .auto_run(true)
            .condition_logic(ConditionLogic::Any)
            .condition(SceneCondition::timing(hm(18, 0)))
            .condition(warm())
            .task(power_on(DeviceId::new()))
            .build()
            .unwrap();
        let fx = Fixture::new(vec![sensor], vec![timed_all, any]);

        let fired = fx
            .manager
            .device_state_change(sensor_id, &temperature())
            .await
            .unwrap();
        assert_eq!(fired, 1);

        let other = fx
            .manager
            .device_state_change(sensor_id, &AttributeRef::new(1, "humidity"))
            .await
            .unwrap();
        assert_eq!(other, 0);
    }

    #[tokio::test]
    async fn should_run_all_logic_scene_on_timer_when_device_condition_holds() {
        let sensor = device("Thermometer");
        let lamp = device("Lamp");
        let (sensor_id, lamp_id) = (sensor.id, lamp.id);
        let scene = Scene::builder()
            .name("Warm evening")
            .auto_run(true)
            .condition(SceneCondition::timing(hm(18, 0)))
            .condition(SceneCondition::device_status(
                sensor_id,
                temperature(),
                Operator::GreaterThan,
                22.0,
            ))
            .task(power_on(lamp_id))
            .build()
            .unwrap();
        let fx = Fixture::new(vec![sensor, lamp], vec![scene.clone()]);
        fx.control
            .set_value(sensor_id, temperature(), AttributeValue::Float(25.0));

        assert_eq!(fx.manager.add_scene_task(&scene), 1);
        assert_eq!(fx.run_due().await, 0);

        fx.clock.advance(TimeDelta::hours(6));
        assert_eq!(fx.run_due().await, 2);
        assert_eq!(fx.control.calls_for(lamp_id), 1);
        assert!(fx.log.outcomes().iter().all(|o| o.is_success()));
    }

    #[tokio::test]
    async fn should_fire_timer_scene_every_day() {
        let lamp = device("Lamp");
        let lamp_id = lamp.id;
        let scene = timed("Morning", hm(8, 0), power_on(lamp_id));
        let fx = Fixture::new(vec![lamp], vec![scene.clone()]);
        let monday = fx.clock.current();
        let arrange_at = fx.manager.settings().arrange_at;

        assert_eq!(fx.manager.add_scene_task_by_time(monday).await.unwrap(), 0);
        fx.manager
            .add_arrange_scene_task(on_same_day(&monday, arrange_at));

        for day in 0..3 {
            fx.clock.set(on_same_day(&add_days(&monday, day), arrange_at));
            fx.run_due().await;
            assert_eq!(fx.manager.pending_firings(scene.id), 1);

            fx.clock.set(on_same_day(&add_days(&monday, day + 1), hm(8, 0)));
            fx.run_due().await;
        }

        assert_eq!(fx.control.calls_for(lamp_id), 3);
        assert_eq!(fx.log.internal_runs(ARRANGE_LABEL), 3);
        assert_eq!(fx.manager.pending_firings(scene.id), 0);
        // only the next arrangement remains
        assert_eq!(fx.manager.queue().len(), 1);
    }

    #[tokio::test]
    async fn should_fail_run_scene_chain_that_loops() {
        let first_id = SceneId::new();
        let second_id = SceneId::new();
        let first = Scene::builder()
            .id(first_id)
            .name("First")
            .task(SceneTask::new(SceneTaskKind::RunScene { scene_id: second_id }))
            .build()
            .unwrap();
        let second = Scene::builder()
            .id(second_id)
            .name("Second")
            .task(SceneTask::new(SceneTaskKind::RunScene { scene_id: first_id }))
            .build()
            .unwrap();
        let fx = Fixture::new(Vec::new(), vec![first.clone(), second]);

        fx.manager.add_scene_task(&first);
        assert_eq!(fx.run_due().await, 4);

        let starts = fx.log.starts();
        assert_eq!(starts[2].parent_id, Some(starts[1].task_id));
        assert_eq!(fx.log.outcome_of(starts[3].task_id), Some(TaskOutcome::Failed));
        assert!(fx.manager.queue().is_empty());
    }

    #[tokio::test]
    async fn should_arm_and_disarm_without_duplicates() {
        let scene = timed("Evening", hm(18, 0), power_on(DeviceId::new()));
        let id = scene.id;
        let fx = Fixture::new(Vec::new(), vec![scene.clone()]);
        fx.manager.add_scene_task(&scene);

        fx.manager.set_scene_off(id).await.unwrap();
        assert!(!fx.scenes.get(id).unwrap().is_on);
        assert!(fx.manager.queue().is_empty());
        assert_eq!(fx.manager.pending_firings(id), 0);

        fx.manager.set_scene_on(id).await.unwrap();
        fx.manager.set_scene_on(id).await.unwrap();
        fx.manager.restart_scene_task(id).await.unwrap();
        assert!(fx.scenes.get(id).unwrap().is_on);
        assert_eq!(fx.manager.queue().len(), 1);
        assert_eq!(fx.manager.pending_firings(id), 1);
    }

    #[tokio::test]
    async fn should_reject_arming_unknown_scene() {
        let fx = Fixture::new(Vec::new(), Vec::new());
        let result = fx.manager.set_scene_on(SceneId::new()).await;
        assert!(matches!(result, Err(SceneHubError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_arm_target_scene_from_nested_task() {
        let mut target = timed("Evening", hm(18, 0), power_on(DeviceId::new()));
        target.is_on = false;
        let target_id = target.id;
        let switch = manual(
            "Arm evening",
            vec![SceneTask::new(SceneTaskKind::EnableScene { scene_id: target_id })],
        );
        let fx = Fixture::new(Vec::new(), vec![target, switch.clone()]);

        fx.manager.add_scene_task(&switch);
        fx.run_due().await;

        assert!(fx.scenes.get(target_id).unwrap().is_on);
        assert_eq!(fx.manager.pending_firings(target_id), 1);
        assert!(fx.log.outcomes().iter().all(|o| o.is_success()));
    }

    #[tokio::test]
    async fn should_drop_firings_of_deleted_scene_on_disarm() {
        let target = timed("Evening", hm(18, 0), power_on(DeviceId::new()));
        let target_id = target.id;
        let switch = manual(
            "Disarm evening",
            vec![SceneTask::new(SceneTaskKind::DisableScene { scene_id: target_id })],
        );
        let fx = Fixture::new(Vec::new(), vec![target.clone(), switch.clone()]);
        fx.manager.add_scene_task(&target);
        assert_eq!(fx.manager.pending_firings(target_id), 1);
        fx.scenes.soft_delete(target_id);

        fx.manager.add_scene_task(&switch);
        assert_eq!(fx.run_due().await, 2);

        assert_eq!(fx.manager.pending_firings(target_id), 0);
        assert!(fx.manager.queue().is_empty());
        assert!(fx.log.outcomes().contains(&TaskOutcome::SceneAlreadyDeleted));
    }

    #[tokio::test]
    async fn should_time_out_stalled_device() {
        let lamp = device("Lamp");
        let lamp_id = lamp.id;
        let scene = manual("Slow", vec![power_on(lamp_id)]);
        let settings = ManagerSettings {
            device_timeout: Duration::from_millis(50),
            ..ManagerSettings::default()
        };
        let fx = Fixture::with_settings(vec![lamp], vec![scene.clone()], settings);
        fx.control.stall(lamp_id);

        fx.manager.add_scene_task(&scene);
        fx.run_due().await;

        assert!(fx.log.outcomes().contains(&TaskOutcome::Timeout));
    }

    #[tokio::test]
    async fn should_drop_queued_firings_of_scene() {
        let scene = timed("Evening", hm(18, 0), power_on(DeviceId::new()));
        let fx = Fixture::new(Vec::new(), vec![scene.clone()]);
        fx.manager.add_scene_task(&scene);

        assert_eq!(fx.manager.delete_scene_task(scene.id), 1);
        assert_eq!(fx.manager.delete_scene_task(scene.id), 0);
        assert!(fx.manager.queue().is_empty());
    }

    #[tokio::test]
    async fn should_rehydrate_timer_scenes_on_start() {
        let scene = timed("Evening", hm(18, 0), power_on(DeviceId::new()));
        let id = scene.id;
        let fx = Fixture::new(Vec::new(), vec![scene]);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let handle = fx.manager.start(shutdown_rx).await.unwrap();
        handle.await.unwrap();

        // evening firing plus the daily arrangement
        assert_eq!(fx.manager.queue().len(), 2);
        assert_eq!(fx.manager.pending_firings(id), 1);
    }

    #[tokio::test]
    async fn should_fire_scenes_from_published_events() {
        let sensor = device("Thermometer");
        let sensor_id = sensor.id;
        let scene = Scene::builder()
            .name("Watcher")
            .auto_run(true)
            .condition(SceneCondition::device_status(
                sensor_id,
                temperature(),
                Operator::Equal,
                21_i64,
            ))
            .task(power_on(DeviceId::new()))
            .build()
            .unwrap();
        let fx = Fixture::new(vec![sensor], vec![scene]);
        let bus = InProcessEventBus::new(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let manager = Arc::clone(&fx.manager);
        let events = bus.subscribe();
        let listener = tokio::spawn(async move { manager.listen(events, shutdown_rx).await });

        bus.publish(DeviceEvent::new(sensor_id, temperature(), AttributeValue::Int(21)))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while fx.manager.queue().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(true).unwrap();
        listener.await.unwrap();
        assert_eq!(fx.manager.queue().len(), 1);
    }
}
