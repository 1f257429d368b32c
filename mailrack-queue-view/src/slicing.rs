//! The slicing model: how enqueued mails are spread over partitions.
//!
//! The index partitions rows along two axes. Time is cut into [`Slice`]s
//! — fixed-width windows tiling the whole time axis — and each slice is
//! subdivided into [`BucketId`] hash buckets so that rows landing in the
//! same window are spread across independent partitions, bounding
//! per-partition row counts and write hotspotting.
//!
//! Everything here is pure and stateless; the same inputs produce the
//! same coordinates on every node and every process.

use std::{
    hash::{BuildHasher, Hash},
    time::Duration,
};

use chrono::{DateTime, Utc};

// Fixed seeds: bucket derivation must agree across nodes, so the hasher
// carries no process-local randomness.
const BUCKET_HASHER: ahash::RandomState =
    ahash::RandomState::with_seeds(0x243f_6a88, 0x85a3_08d3, 0x1319_8a2e, 0x0370_7344);

pub(crate) fn datetime_from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

/// A half-open time window `[start, start + window)`.
///
/// `Slice::of` maps any instant to the unique slice containing it;
/// slices with the same window tile the time axis and are totally
/// ordered by start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slice {
    start_ms: i64,
    window_ms: i64,
}

impl Slice {
    /// The slice containing `instant` for the given window width.
    #[must_use]
    pub fn of(instant: DateTime<Utc>, window: Duration) -> Self {
        let window_ms = window_millis(window);
        let ts = instant.timestamp_millis();
        Self {
            start_ms: ts - ts.rem_euclid(window_ms),
            window_ms,
        }
    }

    /// The adjacent later slice.
    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            start_ms: self.start_ms + self.window_ms,
            window_ms: self.window_ms,
        }
    }

    /// Start of the window (inclusive).
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        datetime_from_millis(self.start_ms)
    }

    /// End of the window (exclusive).
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        datetime_from_millis(self.start_ms + self.window_ms)
    }

    /// Whether `instant` falls inside this slice.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let ts = instant.timestamp_millis();
        ts >= self.start_ms && ts < self.start_ms + self.window_ms
    }

    pub(crate) const fn start_millis(&self) -> i64 {
        self.start_ms
    }
}

fn window_millis(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX).max(1)
}

/// Hash-derived sub-partition within a slice, in `[0, bucket_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(u32);

impl BucketId {
    /// Wrap a raw bucket number.
    #[must_use]
    pub const fn new(bucket: u32) -> Self {
        Self(bucket)
    }

    /// Deterministically derive the bucket for `key`.
    ///
    /// The derivation is stable across processes: no per-process hasher
    /// seeding, so every node agrees on where a key's rows live.
    #[must_use]
    pub fn of<K: Hash + ?Sized>(key: &K, bucket_count: u32) -> Self {
        let hash = BUCKET_HASHER.hash_one(key);
        let count = u64::from(bucket_count.max(1));
        Self(u32::try_from(hash % count).unwrap_or(0))
    }

    /// Every bucket of a slice, in ascending order.
    pub fn all(bucket_count: u32) -> impl Iterator<Item = Self> {
        (0..bucket_count).map(Self)
    }

    /// The raw bucket number.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BucketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage coordinates chosen for an item at write time.
///
/// Persisted alongside the row so that later operations address the row
/// where it was actually written, even if the slice width or bucket
/// count has changed since, or clocks jittered between writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlicingContext {
    bucket_id: BucketId,
    time_range_start: DateTime<Utc>,
}

impl SlicingContext {
    /// Capture the coordinates of `slice`/`bucket_id`.
    #[must_use]
    pub fn of(bucket_id: BucketId, slice: Slice) -> Self {
        Self {
            bucket_id,
            time_range_start: slice.start(),
        }
    }

    /// The hash bucket the row was written to.
    #[must_use]
    pub const fn bucket_id(&self) -> BucketId {
        self.bucket_id
    }

    /// The start of the time window the row was written to.
    #[must_use]
    pub const fn time_range_start(&self) -> DateTime<Utc> {
        self.time_range_start
    }
}
