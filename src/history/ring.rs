//! Time Series Ring
//!
//! Fixed-capacity circular buffer of timestamped samples.
//!
//! # Layout
//!
//! ```text
//! capacity C, C + 1 physical slots, one always empty:
//!
//!   [ s3 ][ s4 ][ -- ][ s1 ][ s2 ]
//!                 ▲     ▲
//!               tail   head
//!
//! len = (tail - head) mod (C + 1)
//! ```
//!
//! Appending to a full ring advances `head` first, evicting the oldest
//! sample.
//!
//! # Windows
//!
//! Windows are resolved by index arithmetic assuming one sample per
//! `interval` starting at the oldest sample's time. Actual timestamps are
//! not searched, so collector drift shifts a window by whole samples.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::keyspace::TimestampedSnapshot;

/// A sample that knows when it was taken
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for TimestampedSnapshot {
    fn timestamp(&self) -> DateTime<Utc> {
        self.time
    }
}

impl<T: Timestamped> Timestamped for Arc<T> {
    fn timestamp(&self) -> DateTime<Utc> {
        (**self).timestamp()
    }
}

/// Fixed-capacity, time-indexed ring buffer
#[derive(Debug, Clone)]
pub struct TimeSeriesRing<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
}

impl<T> TimeSeriesRing<T> {
    /// Create a ring holding at most `capacity` samples (at least one)
    pub fn new(capacity: usize) -> Self {
        let slots = capacity.max(1) + 1;
        Self {
            slots: (0..slots).map(|_| None).collect(),
            head: 0,
            tail: 0,
        }
    }

    /// Logical capacity
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn len(&self) -> usize {
        (self.tail + self.slots.len() - self.head) % self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Append a sample, evicting the oldest one when full
    pub fn append(&mut self, sample: T) {
        let slots = self.slots.len();

        if self.len() == self.capacity() {
            self.slots[self.head] = None;
            self.head = (self.head + 1) % slots;
        }

        self.slots[self.tail] = Some(sample);
        self.tail = (self.tail + 1) % slots;
    }

    /// Sample at logical position `index`, 0 being the oldest
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        self.slots[(self.head + index) % self.slots.len()].as_ref()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

impl<T: Timestamped + Clone> TimeSeriesRing<T> {
    /// Samples covering `[start, end)` at one sample per `interval`
    ///
    /// ```text
    /// offset = floor((start - oldest) / interval)  clamped to [0, len - 1]
    /// count  = floor((end - start) / interval)     clamped to [1, len - offset]
    /// ```
    ///
    /// An empty ring yields an empty window.
    pub fn window(&self, start: DateTime<Utc>, end: DateTime<Utc>, interval: Duration) -> Vec<T> {
        let Some(oldest) = self.oldest() else {
            return Vec::new();
        };

        let len = self.len() as i64;
        let step = interval.num_milliseconds().max(1);

        let offset = (start - oldest.timestamp())
            .num_milliseconds()
            .div_euclid(step)
            .clamp(0, len - 1);
        let count = (end - start)
            .num_milliseconds()
            .div_euclid(step)
            .clamp(1, len - offset);

        (offset..offset + count)
            .filter_map(|i| self.get(i as usize).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Sample {
        time: DateTime<Utc>,
        value: u32,
    }

    impl Timestamped for Sample {
        fn timestamp(&self) -> DateTime<Utc> {
            self.time
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// Ring of `n` samples taken every minute from `base()`
    fn filled(capacity: usize, n: u32) -> TimeSeriesRing<Sample> {
        let mut ring = TimeSeriesRing::new(capacity);
        for value in 0..n {
            ring.append(Sample {
                time: base() + Duration::minutes(value as i64),
                value,
            });
        }
        ring
    }

    fn values(samples: &[Sample]) -> Vec<u32> {
        samples.iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_append_until_full() {
        let ring = filled(4, 3);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.capacity(), 4);
        assert_eq!(ring.oldest().unwrap().value, 0);
        assert_eq!(ring.newest().unwrap().value, 2);
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let capacity = 8;
        let ring = filled(capacity, capacity as u32 + 5);

        assert_eq!(ring.len(), capacity);
        let kept: Vec<u32> = ring.iter().map(|s| s.value).collect();
        assert_eq!(kept, (5..13).collect::<Vec<_>>());
        assert!(ring.get(capacity).is_none());
    }

    #[test]
    fn test_length_across_wraparound() {
        let mut ring = TimeSeriesRing::new(3);
        for i in 0..20u32 {
            ring.append(Sample {
                time: base(),
                value: i,
            });
            assert_eq!(ring.len(), (i as usize + 1).min(3));
        }
    }

    #[test]
    fn test_window_arithmetic() {
        let ring = filled(16, 10);
        let interval = Duration::minutes(1);

        // offset 2, count 3
        let window = ring.window(
            base() + Duration::minutes(2),
            base() + Duration::minutes(5),
            interval,
        );
        assert_eq!(values(&window), vec![2, 3, 4]);

        // Start before the oldest sample clamps to offset 0
        let window = ring.window(
            base() - Duration::hours(1),
            base() - Duration::minutes(58),
            interval,
        );
        assert_eq!(values(&window), vec![0, 1]);

        // Count clamps to the samples left after the offset
        let window = ring.window(
            base() + Duration::minutes(7),
            base() + Duration::hours(1),
            interval,
        );
        assert_eq!(values(&window), vec![7, 8, 9]);
    }

    #[test]
    fn test_degenerate_window_returns_one_sample() {
        let ring = filled(16, 10);
        let at = base() + Duration::minutes(4);

        let window = ring.window(at, at, Duration::minutes(1));
        assert_eq!(values(&window), vec![4]);

        // Start past the newest sample clamps to the last one
        let late = base() + Duration::days(1);
        let window = ring.window(late, late + Duration::minutes(3), Duration::minutes(1));
        assert_eq!(values(&window), vec![9]);
    }

    #[test]
    fn test_empty_window() {
        let ring: TimeSeriesRing<Sample> = TimeSeriesRing::new(4);
        assert!(ring.window(base(), base() + Duration::hours(1), Duration::minutes(1)).is_empty());
        assert!(ring.newest().is_none());
    }
}
