//! # scenehub-app
//!
//! Application layer — the scheduling engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `SceneRepository` / `DeviceRepository` — read scenes and devices
//!   - `DeviceControl` — send commands to devices and read attributes back
//!   - `ExecutionLog` — record task starts and outcomes
//!   - `EventPublisher` — publish device events
//!   - `Clock` — hub-local wall-clock time
//! - Provide the **task queue**: a time-ordered heap drained by a single
//!   dispatch loop
//! - Provide the **scene manager**: schedules scene firings, evaluates
//!   conditions and fans scenes out into device commands
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `scenehub-domain` only (plus `tokio` for the queue loop and
//! channels). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod conditions;
pub mod event_bus;
pub mod ports;
pub mod queue;
pub mod scene_manager;
pub mod task;

#[cfg(test)]
mod test_support;
