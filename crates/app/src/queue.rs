//! Time-ordered task queue and the server loop that drains it.

mod heap;
mod server;

pub use heap::PriorityQueue;
pub use server::{DEFAULT_TICK, IDLE_TICK, QueueServer, Tick};
