//! # Ledger Time
//!
//! Defines [`Timestamp`] (UTC, truncated to seconds, rendered with a `Z`
//! suffix), [`Interval`] (a strictly positive number of seconds), and the
//! [`Clock`] trait through which the engine reads ledger time.
//!
//! ## Comparison rules
//!
//! - "due" means `now >= due` (inclusive).
//! - "in the future" at creation means `value > now` (strict).
//!
//! Both are expressed as methods on [`Timestamp`] so call sites cannot mix
//! them up.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current wall-clock UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] for malformed input or a
    /// non-`Z` offset.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must use Z suffix (UTC only)".to_string(),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from Unix epoch seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] if out of range.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimestamp {
                value: secs.to_string(),
                reason: "outside representable range".to_string(),
            })
    }

    /// The latest representable timestamp.
    pub fn latest() -> Self {
        Self(truncate_to_seconds(DateTime::<Utc>::MAX_UTC))
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO 8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// `self + interval`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TimestampOverflow`] if the result is not
    /// representable.
    pub fn checked_add(&self, interval: Interval) -> Result<Self, ValidationError> {
        let overflow = || ValidationError::TimestampOverflow {
            base: self.to_iso8601(),
            seconds: interval.as_secs(),
        };
        let secs = i64::try_from(interval.as_secs()).map_err(|_| overflow())?;
        self.epoch_secs()
            .checked_add(secs)
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .map(Self)
            .ok_or_else(overflow)
    }

    /// Inclusive due check: `now >= self`.
    pub fn is_due_at(&self, now: Timestamp) -> bool {
        now >= *self
    }

    /// Strict future check: `self > now`.
    pub fn is_after(&self, now: Timestamp) -> bool {
        *self > now
    }

    /// Require `self > now`, naming the field in the error.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotInFuture`].
    pub fn require_after(&self, now: Timestamp, field: &str) -> Result<(), ValidationError> {
        if self.is_after(now) {
            Ok(())
        } else {
            Err(ValidationError::NotInFuture {
                field: field.to_string(),
                value: self.to_iso8601(),
                reference: now.to_iso8601(),
            })
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// A strictly positive duration in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Interval(u64);

impl Interval {
    /// Seconds in one day.
    pub const DAY_SECS: u64 = 86_400;

    /// Create an interval of `secs` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveInterval`] for zero.
    pub fn from_secs(secs: u64) -> Result<Self, ValidationError> {
        if secs == 0 {
            return Err(ValidationError::NonPositiveInterval);
        }
        Ok(Self(secs))
    }

    /// Create an interval of `days` days.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveInterval`] for zero or overflow.
    pub fn from_days(days: u64) -> Result<Self, ValidationError> {
        days.checked_mul(Self::DAY_SECS)
            .ok_or(ValidationError::NonPositiveInterval)
            .and_then(Self::from_secs)
    }

    /// Length in seconds.
    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Interval {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::from_secs(value)
    }
}

impl From<Interval> for u64 {
    fn from(interval: Interval) -> Self {
        interval.0
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of ledger time. Implementations must be monotonically
/// non-decreasing.
pub trait Clock: Send + Sync {
    /// The current ledger time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time, truncated to seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to. Used by tests and scenario replay.
#[derive(Debug)]
pub struct ManualClock {
    epoch_secs: AtomicI64,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            epoch_secs: AtomicI64::new(start.epoch_secs()),
        }
    }

    /// Move the clock forward by `secs` seconds, stopping at
    /// [`Timestamp::latest`].
    pub fn advance_secs(&self, secs: u64) {
        let ceiling = Timestamp::latest().epoch_secs();
        let delta = i64::try_from(secs).unwrap_or(i64::MAX);
        let _ = self
            .epoch_secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(cur.saturating_add(delta).min(ceiling))
            });
    }

    /// Move the clock forward by one interval.
    pub fn advance(&self, interval: Interval) {
        self.advance_secs(interval.as_secs());
    }

    /// Move the clock to `target` if it lies ahead; earlier targets are ignored.
    pub fn advance_to(&self, target: Timestamp) {
        self.epoch_secs
            .fetch_max(target.epoch_secs(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let secs = self.epoch_secs.load(Ordering::SeqCst);
        // Every stored value is clamped to the representable range.
        Timestamp::from_epoch_secs(secs).unwrap_or_else(|_| Timestamp::latest())
    }
}
