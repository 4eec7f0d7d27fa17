//! Fixed-width time buckets over epoch milliseconds.
//!
//! Bucket starts are multiples of the width counted from the Unix epoch, so
//! two runs with the same width always agree on boundaries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OccupancyError;

const MS_PER_MINUTE: i64 = 60_000;

/// Width of a bucket in milliseconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct BucketWidth(i64);

impl BucketWidth {
    pub const DEFAULT_MINUTES: i64 = 15;

    pub fn new(ms: i64) -> Result<Self, OccupancyError> {
        if ms <= 0 {
            return Err(OccupancyError::InvalidBucketWidth(ms));
        }
        Ok(Self(ms))
    }

    pub fn from_minutes(minutes: i64) -> Result<Self, OccupancyError> {
        Self::new(minutes.saturating_mul(MS_PER_MINUTE))
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        Self(Self::DEFAULT_MINUTES * MS_PER_MINUTE)
    }
}

impl TryFrom<i64> for BucketWidth {
    type Error = OccupancyError;

    fn try_from(ms: i64) -> Result<Self, Self::Error> {
        Self::new(ms)
    }
}

impl From<BucketWidth> for i64 {
    fn from(width: BucketWidth) -> Self {
        width.0
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % MS_PER_MINUTE == 0 {
            write!(f, "{}min", self.0 / MS_PER_MINUTE)
        } else {
            write!(f, "{}ms", self.0)
        }
    }
}

/// Upper bound on the number of buckets in one range.
///
/// One year of 15-minute buckets is about 35 000, so this only trips on
/// timestamps in the wrong unit or placeholder dates.
pub const MAX_BUCKETS: usize = 1_000_000;

/// Latest bucket start `<= instant`.
///
/// # Errors
///
/// [`OccupancyError::TimestampOutOfRange`] when the bucket start does not fit
/// in an `i64`.
pub fn floor_to_bucket(instant: i64, width: BucketWidth) -> Result<i64, OccupancyError> {
    instant
        .checked_sub(instant.rem_euclid(width.0))
        .ok_or(OccupancyError::TimestampOutOfRange(instant))
}

/// Earliest bucket start `>= instant`.
///
/// # Errors
///
/// [`OccupancyError::TimestampOutOfRange`] when the bucket start does not fit
/// in an `i64`.
pub fn ceil_to_bucket(instant: i64, width: BucketWidth) -> Result<i64, OccupancyError> {
    let floor = floor_to_bucket(instant, width)?;
    if floor == instant {
        Ok(instant)
    } else {
        floor
            .checked_add(width.0)
            .ok_or(OccupancyError::TimestampOutOfRange(instant))
    }
}

/// All bucket starts from `floor(min)` to `ceil(max)` inclusive.
///
/// Empty when `min > max`.
///
/// # Errors
///
/// [`OccupancyError::TimestampOutOfRange`] when either end overflows, and
/// [`OccupancyError::TooManyBuckets`] when the range holds more than
/// [`MAX_BUCKETS`] starts. Nothing is allocated in either case.
pub fn full_range(
    min_instant: i64,
    max_instant: i64,
    width: BucketWidth,
) -> Result<Vec<i64>, OccupancyError> {
    if min_instant > max_instant {
        return Ok(Vec::new());
    }
    let first = floor_to_bucket(min_instant, width)?;
    let last = ceil_to_bucket(max_instant, width)?;

    // last >= first, so the span fits in a u64 even when it does not fit in an i64
    let buckets = last.abs_diff(first) / width.0.unsigned_abs() + 1;
    if buckets > MAX_BUCKETS as u64 {
        return Err(OccupancyError::TooManyBuckets {
            buckets,
            limit: MAX_BUCKETS,
        });
    }

    Ok((0..buckets as i64).map(|i| first + i * width.0).collect())
}

/// Index of the bucket start closest to `instant`.
///
/// Ties go to the earlier bucket. Instants outside the range snap to the
/// first or last bucket. `bucket_starts` must be sorted ascending.
pub fn nearest_bucket_index(bucket_starts: &[i64], instant: i64) -> Option<usize> {
    if bucket_starts.is_empty() {
        return None;
    }

    let after = bucket_starts.partition_point(|&start| start < instant);
    if after == 0 {
        return Some(0);
    }
    if after == bucket_starts.len() {
        return Some(after - 1);
    }

    let before = after - 1;
    let to_before = instant.abs_diff(bucket_starts[before]);
    let to_after = bucket_starts[after].abs_diff(instant);
    if to_after < to_before {
        Some(after)
    } else {
        Some(before)
    }
}
