// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Eddy Contributors

//! Clock abstraction for timestamps and retry scheduling.
//!
//! All time reads in the engine go through [`ClockSource`] so tests can
//! inject a controllable clock instead of sleeping.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

/// Trait for getting the current wall clock time.
///
/// This allows injecting a mock clock for testing.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// System clock implementation using `std::time::SystemTime`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Converts a clock reading to a `DateTime<Utc>` timestamp.
pub fn now_utc(clock: &dyn ClockSource) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(clock.now_ms() as i64).unwrap_or_default()
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
