//! Wall-clock source for the engine.
//!
//! Operations that stamp records (intake, transitions, report windows) ask the
//! engine's clock. Escalation sweeps take `now` explicitly so batch callers
//! control the evaluation instant.

use crate::types::{from_millis, to_millis, Timestamp};
use chrono::{Duration, Utc};
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

pub trait Clock: Send {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A manually driven clock. Clones share the same instant, so a test can keep
/// a handle after moving one into the engine.
#[derive(Debug, Clone)]
pub struct FixedClock {
    millis: Arc<AtomicI64>,
}

impl FixedClock {
    pub fn at(now: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(to_millis(now))),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.millis.store(to_millis(now), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        let ms = self.millis.load(Ordering::SeqCst);
        from_millis(ms).unwrap_or_else(Utc::now)
    }
}
