//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the scheduling engine and the outside
//! world. They are defined here (in `app`) so that both the engine and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod clock;
pub mod device_control;
pub mod event_bus;
pub mod execution_log;
pub mod storage;

pub use clock::{Clock, SystemClock};
pub use device_control::DeviceControl;
pub use event_bus::EventPublisher;
pub use execution_log::ExecutionLog;
pub use storage::{DeviceRepository, SceneRepository};
