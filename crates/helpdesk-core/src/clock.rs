//! Wall-clock sources and the monotonic stamper used by the stores.
//!
//! Timestamps are kept at millisecond precision so the RFC 3339 text
//! written by the persistence adapter decodes back to the same value.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current wall time in Unix milliseconds.
    fn now_millis(&self) -> i64;

    /// Current wall time as a UTC timestamp.
    fn now(&self) -> DateTime<Utc> {
        from_millis(self.now_millis())
    }
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A hand-driven clock for tests and deterministic replays.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Start the clock at `millis` (Unix milliseconds).
    #[must_use]
    pub fn starting_at(millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(millis)),
        }
    }

    /// Move the clock forward by `millis`.
    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Jump to an absolute time. Going backwards is allowed.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Hands out strictly increasing timestamps from a [`Clock`].
///
/// If the clock stalls or steps backwards the stamp is bumped one
/// millisecond past the previous one.
#[derive(Debug, Default)]
pub struct Stamper {
    last: Option<DateTime<Utc>>,
}

impl Stamper {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Seed the stamper with the newest timestamp already on record.
    pub fn observe(&mut self, seen: DateTime<Utc>) {
        if self.last.is_none_or(|last| seen > last) {
            self.last = Some(seen);
        }
    }

    /// Next timestamp, strictly after every previously issued or observed one.
    pub fn next(&mut self, clock: &dyn Clock) -> DateTime<Utc> {
        let now = clock.now();
        let stamp = match self.last {
            Some(last) if now <= last => last + TimeDelta::milliseconds(1),
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }
}

/// Convert Unix milliseconds to a UTC timestamp, saturating at the epoch.
#[must_use]
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}
