//! # scenehub-adapter-memory
//!
//! In-memory persistence adapter.
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `scenehub-app::ports::storage`
//! - Implement the `ExecutionLog` port, keeping parent/child task records
//! - Validate records on insert and soft-delete instead of removing them
//!
//! State lives for the lifetime of the process. The execution log is bounded
//! and drops its oldest records first.
//!
//! ## Dependency rule
//! Depends on `scenehub-app` (for port traits) and `scenehub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod device_repo;
mod error;
mod execution_log;
mod scene_repo;

pub use device_repo::InMemoryDeviceRepository;
pub use error::StorageError;
pub use execution_log::{DEFAULT_CAPACITY, InMemoryExecutionLog};
pub use scene_repo::InMemorySceneRepository;
