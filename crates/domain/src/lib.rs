//! # scenehub-domain
//!
//! Pure domain model for the scenehub scene automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Devices** and their **attributes** (typed values, references, commands)
//! - Define **Scenes**: conditions, effect window, repeat days and ordered tasks
//! - Define **Device events** (attribute-change records)
//! - Define **Task logs** (execution outcomes of scheduled work)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod attribute;
pub mod device;
pub mod event;
pub mod scene;
pub mod task_log;
