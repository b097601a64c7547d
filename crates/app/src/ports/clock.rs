//! Clock port — the hub-local wall clock.

use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};

use scenehub_domain::time::LocalTimestamp;

/// Source of the current hub-local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> LocalTimestamp;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> LocalTimestamp {
        (**self).now()
    }
}

/// Wall clock at a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    #[must_use]
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> LocalTimestamp {
        Utc::now().with_timezone(&self.offset)
    }
}
