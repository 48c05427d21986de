//! Test doubles shared by unit and integration tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;

/// A clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl Default for MutableClock {
    /// Starts at 2024-03-10 09:00 UTC.
    fn default() -> Self {
        match Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0) {
            chrono::LocalResult::Single(start) => Self::new(start),
            _ => panic!("invalid fixture start time"),
        }
    }
}

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }

    pub fn advance(&self, delta: Duration) {
        *self.lock_clock() += delta;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now()
    }
}
