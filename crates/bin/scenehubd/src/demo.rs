//! Demo setup — virtual devices and a handful of sample scenes.

use chrono::{NaiveTime, TimeDelta, Timelike};

use scenehub_adapter_memory::{InMemoryDeviceRepository, InMemorySceneRepository};
use scenehub_adapter_virtual::{
    INSTANCE, VirtualDevice, VirtualDeviceControl, VirtualLight, VirtualSensor, VirtualSwitch,
};
use scenehub_app::ports::EventPublisher;
use scenehub_domain::attribute::{AttributeCommand, AttributeRef};
use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::{DeviceId, SceneId};
use scenehub_domain::scene::{ConditionLogic, Operator, Scene, SceneCondition, SceneTask, SceneTaskKind};
use scenehub_domain::time::LocalTimestamp;

/// Ids of the demo devices.
#[derive(Debug, Clone, Copy)]
pub struct DemoDevices {
    pub light: DeviceId,
    pub switch: DeviceId,
    pub sensor: DeviceId,
}

/// Ids of the demo scenes.
#[derive(Debug, Clone, Copy)]
pub struct DemoScenes {
    /// Manual scene, run once at startup.
    pub welcome: SceneId,
    /// Timer scene firing one minute after startup.
    pub evening: SceneId,
    /// Scene reacting to the sensor temperature.
    pub cool_down: SceneId,
}

/// Virtual transport holding the demo devices.
pub fn transport<P>(publisher: P) -> (VirtualDeviceControl<P>, DemoDevices)
where
    P: EventPublisher + Send + Sync,
{
    let light = VirtualLight::new("Living room light");
    let switch = VirtualSwitch::new("Fan");
    let sensor = VirtualSensor::new("Living room sensor");
    let ids = DemoDevices {
        light: light.device_id(),
        switch: switch.device_id(),
        sensor: sensor.device_id(),
    };
    let control = VirtualDeviceControl::new(publisher)
        .with_device(VirtualDevice::Light(light))
        .with_device(VirtualDevice::Switch(switch))
        .with_device(VirtualDevice::Sensor(sensor));
    (control, ids)
}

/// Register the demo devices and sample scenes.
///
/// # Errors
///
/// Returns a validation error if a sample record is invalid.
pub fn seed<P>(
    scenes: &InMemorySceneRepository,
    devices: &InMemoryDeviceRepository,
    control: &VirtualDeviceControl<P>,
    ids: DemoDevices,
    now: LocalTimestamp,
) -> Result<DemoScenes, SceneHubError>
where
    P: EventPublisher + Send + Sync,
{
    for device in control.describe_all()? {
        devices.save(device)?;
    }

    let welcome = scenes.save(
        Scene::builder()
            .name("Welcome home")
            .task(SceneTask::new(SceneTaskKind::ControlDevice {
                device_id: ids.light,
                commands: vec![
                    AttributeCommand::new(INSTANCE, "power", true),
                    AttributeCommand::new(INSTANCE, "brightness", 60_i64),
                ],
            }))
            .task(
                SceneTask::new(SceneTaskKind::ControlDevice {
                    device_id: ids.switch,
                    commands: vec![AttributeCommand::new(INSTANCE, "power", true)],
                })
                .with_delay(2),
            )
            .build()?,
    )?;

    let evening = scenes.save(
        Scene::builder()
            .name("Evening")
            .auto_run(true)
            .condition(SceneCondition::timing(next_minute(&now)))
            .task(SceneTask::new(SceneTaskKind::RunScene {
                scene_id: welcome.id,
            }))
            .build()?,
    )?;

    let cool_down = scenes.save(
        Scene::builder()
            .name("Cool down")
            .auto_run(true)
            .condition_logic(ConditionLogic::Any)
            .condition(SceneCondition::device_status(
                ids.sensor,
                AttributeRef::new(INSTANCE, "temperature"),
                Operator::GreaterThan,
                25.0,
            ))
            .task(SceneTask::new(SceneTaskKind::ControlDevice {
                device_id: ids.switch,
                commands: vec![AttributeCommand::new(INSTANCE, "power", true)],
            }))
            .build()?,
    )?;

    tracing::info!(scenes = 3, "demo scenes seeded");
    Ok(DemoScenes {
        welcome: welcome.id,
        evening: evening.id,
        cool_down: cool_down.id,
    })
}

/// Start of the minute following `now`, as a time of day.
fn next_minute(now: &LocalTimestamp) -> NaiveTime {
    let time = now.time() + TimeDelta::minutes(1);
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}
