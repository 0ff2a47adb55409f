//! Window Buffer - bounded history of recent raw records
//!
//! FIFO with explicit eviction. Owned by the pipeline coordinator; there is no
//! interior mutability, so a snapshot can never race with a push.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::logic::record::RawRecord;

// ============================================================================
// BUFFER
// ============================================================================

#[derive(Debug, Clone)]
pub struct WindowBuffer {
    records: VecDeque<RawRecord>,
    capacity: usize,
    evicted_total: u64,
}

impl WindowBuffer {
    /// `capacity` is clamped to at least one record
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity + 1),
            capacity,
            evicted_total: 0,
        }
    }

    /// Append to the tail, returning the head record if capacity was exceeded
    pub fn push(&mut self, record: RawRecord) -> Option<RawRecord> {
        self.records.push_back(record);

        if self.records.len() > self.capacity {
            let evicted = self.records.pop_front();
            if evicted.is_some() {
                self.evicted_total += 1;
            }
            evicted
        } else {
            None
        }
    }

    /// Ordered view, oldest first
    pub fn snapshot(&self) -> WindowSnapshot<'_> {
        let (front, back) = self.records.as_slices();
        WindowSnapshot { front, back }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn status(&self) -> BufferStatus {
        BufferStatus {
            current_size: self.records.len(),
            capacity: self.capacity,
            is_full: self.records.len() >= self.capacity,
            fill_percent: (self.records.len() as f32 / self.capacity as f32 * 100.0).min(100.0),
            evicted_total: self.evicted_total,
        }
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Borrowed, read-only view of the window contents
#[derive(Debug, Clone, Copy)]
pub struct WindowSnapshot<'a> {
    front: &'a [RawRecord],
    back: &'a [RawRecord],
}

impl<'a> WindowSnapshot<'a> {
    /// Build a snapshot over a plain slice
    pub fn from_slice(records: &'a [RawRecord]) -> Self {
        Self { front: records, back: &[] }
    }

    pub fn len(&self) -> usize {
        self.front.len() + self.back.len()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'a RawRecord> {
        self.front.iter().chain(self.back.iter())
    }

    /// Record at `index` counted from the oldest
    pub fn get(&self, index: usize) -> Option<&'a RawRecord> {
        if index < self.front.len() {
            self.front.get(index)
        } else {
            self.back.get(index - self.front.len())
        }
    }

    pub fn newest(&self) -> Option<&'a RawRecord> {
        self.back.last().or_else(|| self.front.last())
    }

    /// Record `n` positions before the newest (`n = 1` is the previous one)
    pub fn back_n(&self, n: usize) -> Option<&'a RawRecord> {
        let len = self.len();
        if n >= len {
            return None;
        }
        self.get(len - 1 - n)
    }

    /// Up to `n` most recent records, oldest first
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &'a RawRecord> {
        let skip = self.len().saturating_sub(n);
        self.iter().skip(skip)
    }

    #[cfg(test)]
    pub fn to_vec(&self) -> Vec<RawRecord> {
        self.iter().copied().collect()
    }
}

/// Buffer status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferStatus {
    pub current_size: usize,
    pub capacity: usize,
    pub is_full: bool,
    pub fill_percent: f32,
    pub evicted_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record(i: i64, value: f64) -> RawRecord {
        let t0 = Utc.with_ymd_and_hms(2014, 7, 1, 0, 0, 0).unwrap();
        RawRecord::new(t0 + Duration::minutes(30 * i), value)
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buffer = WindowBuffer::new(5);
        for i in 0..50 {
            buffer.push(record(i, i as f64));
            assert!(buffer.status().current_size <= 5);
        }
        let status = buffer.status();
        assert_eq!(status.evicted_total, 45);
        assert!(status.is_full);
        assert_eq!(status.fill_percent, 100.0);
    }

    #[test]
    fn test_holds_last_records_in_arrival_order() {
        let size = 4;
        for k in 0..6 {
            let mut buffer = WindowBuffer::new(size);
            let total = size + k;
            for i in 0..total {
                buffer.push(record(i as i64, i as f64));
            }
            let values: Vec<f64> = buffer.snapshot().iter().map(|r| r.value).collect();
            let expected: Vec<f64> = (k..total).map(|i| i as f64).collect();
            assert_eq!(values, expected);
        }
    }

    #[test]
    fn test_push_returns_evicted_head() {
        let mut buffer = WindowBuffer::new(2);
        assert_eq!(buffer.push(record(0, 10.0)), None);
        assert_eq!(buffer.push(record(1, 12.0)), None);
        let evicted = buffer.push(record(2, 11.0)).expect("head evicted");
        assert_eq!(evicted.value, 10.0);
        assert_eq!(evicted.timestamp, record(0, 0.0).timestamp);
    }

    #[test]
    fn test_snapshot_navigation() {
        let mut buffer = WindowBuffer::new(3);
        for (i, v) in [10.0, 12.0, 11.0, 9.0, 50.0].iter().enumerate() {
            buffer.push(record(i as i64, *v));
        }
        let snap = buffer.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.newest().map(|r| r.value), Some(50.0));
        assert_eq!(snap.back_n(1).map(|r| r.value), Some(9.0));
        assert_eq!(snap.back_n(2).map(|r| r.value), Some(11.0));
        assert_eq!(snap.back_n(3), None);
        let tail: Vec<f64> = snap.tail(2).map(|r| r.value).collect();
        assert_eq!(tail, vec![9.0, 50.0]);
        let all: Vec<f64> = snap.tail(10).map(|r| r.value).collect();
        assert_eq!(all, vec![11.0, 9.0, 50.0]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut buffer = WindowBuffer::new(0);
        buffer.push(record(0, 1.0));
        buffer.push(record(1, 2.0));
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.snapshot().to_vec(), vec![record(1, 2.0)]);
    }
}
