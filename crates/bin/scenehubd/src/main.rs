//! # scenehubd — scenehub daemon
//!
//! Composition root that wires all adapters together and runs the engine.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Install the `tracing` subscriber
//! - Construct repository and transport implementations (adapters)
//! - Construct the scene manager, injecting adapters via port traits
//! - Seed demo devices and scenes when enabled
//! - Start the task queue and the device-event listener
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod demo;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use scenehub_adapter_memory::{
    InMemoryDeviceRepository, InMemoryExecutionLog, InMemorySceneRepository,
};
use scenehub_adapter_virtual::VirtualDeviceControl;
use scenehub_app::event_bus::InProcessEventBus;
use scenehub_app::ports::{Clock, SystemClock};
use scenehub_app::scene_manager::SceneManager;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let settings = config.manager_settings()?;
    let clock = SystemClock::new(config.utc_offset()?);

    // Adapters
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let scenes = Arc::new(InMemorySceneRepository::new());
    let devices = Arc::new(InMemoryDeviceRepository::new());
    let execution_log = Arc::new(InMemoryExecutionLog::with_capacity(config.history.capacity));
    let (control, demo_devices) = if config.demo.enabled {
        let (control, ids) = demo::transport(Arc::clone(&event_bus));
        (control, Some(ids))
    } else {
        (VirtualDeviceControl::new(Arc::clone(&event_bus)), None)
    };
    let demo_scenes = match demo_devices {
        Some(ids) => Some((
            demo::seed(&scenes, &devices, &control, ids, clock.now())?,
            ids,
        )),
        None => None,
    };
    let control = Arc::new(control);

    // Engine
    let manager = Arc::new(SceneManager::new(
        Arc::clone(&scenes),
        Arc::clone(&devices),
        Arc::clone(&control),
        Arc::clone(&execution_log),
        clock,
        settings,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let events = event_bus.subscribe();
    let queue = manager.start(shutdown_rx.clone()).await?;
    let listener = {
        let manager = Arc::clone(&manager);
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { manager.listen(events, shutdown).await })
    };
    tracing::info!(arrange_at = %manager.settings().arrange_at, "scenehubd running");

    if let Some((scenes, ids)) = demo_scenes {
        manager.add_scene_task_by_id(scenes.welcome).await?;
        tracing::info!(evening = %scenes.evening, cool_down = %scenes.cool_down, "demo scenes scheduled");

        let control = Arc::clone(&control);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            if let Err(err) = control.report_temperature(ids.sensor, 26.5).await {
                tracing::warn!(%err, "unable to simulate sensor reading");
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    queue.await?;
    listener.await?;

    tracing::info!(records = execution_log.all().len(), "scenehubd stopped");
    Ok(())
}
