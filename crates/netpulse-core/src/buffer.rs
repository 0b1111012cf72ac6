// ── Series buffer ──
//
// Bounded, deduplicated, strictly ordered sequence of chart points.
// Timestamps strictly increase from front to back and the length never
// exceeds the capacity; eviction is oldest-first.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::SeriesPoint;

/// Result of [`SeriesBuffer::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    Accepted,
    /// Same timestamp as the last point. Dropped silently.
    RejectedDuplicate,
    /// Earlier than the last point.
    RejectedOutOfOrder,
}

/// Column-oriented view handed to the render sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartFrame {
    pub timestamps: Vec<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub inbound: Vec<f64>,
    pub outbound: Vec<f64>,
    pub total: Vec<f64>,
}

impl ChartFrame {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    points: VecDeque<SeriesPoint>,
    capacity: usize,
}

impl SeriesBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.back()
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.front()
    }

    /// Append one point, enforcing dedup and ordering against the last point.
    pub fn append(&mut self, point: SeriesPoint) -> AppendResult {
        if let Some(last) = self.points.back() {
            if point.timestamp == last.timestamp {
                return AppendResult::RejectedDuplicate;
            }
            if point.timestamp < last.timestamp {
                return AppendResult::RejectedOutOfOrder;
            }
        }
        self.points.push_back(point);
        self.evict();
        AppendResult::Accepted
    }

    /// Clear and insert `points` in one step, keeping the most recent
    /// `capacity` of them.
    ///
    /// Points that are not strictly later than the previously kept point
    /// are dropped. Returns the resulting length.
    pub fn replace_all(&mut self, points: impl IntoIterator<Item = SeriesPoint>) -> usize {
        let mut next: VecDeque<SeriesPoint> = VecDeque::with_capacity(self.capacity);
        for point in points {
            if next
                .back()
                .is_some_and(|last| point.timestamp <= last.timestamp)
            {
                continue;
            }
            next.push_back(point);
            if next.len() > self.capacity {
                next.pop_front();
            }
        }
        self.points = next;
        self.points.len()
    }

    /// Change the bound, evicting from the front if the buffer is over it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict();
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Ordered, read-only copy of the current points.
    pub fn snapshot(&self) -> Arc<[SeriesPoint]> {
        self.points.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }

    pub fn to_frame(&self) -> ChartFrame {
        let mut frame = ChartFrame {
            timestamps: Vec::with_capacity(self.points.len()),
            labels: Vec::with_capacity(self.points.len()),
            inbound: Vec::with_capacity(self.points.len()),
            outbound: Vec::with_capacity(self.points.len()),
            total: Vec::with_capacity(self.points.len()),
        };
        for point in &self.points {
            frame.timestamps.push(point.timestamp);
            frame.labels.push(point.label.clone());
            frame.inbound.push(point.inbound);
            frame.outbound.push(point.outbound);
            frame.total.push(point.total);
        }
        frame
    }

    fn evict(&mut self) {
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> SeriesPoint {
        let timestamp: DateTime<Utc> = DateTime::from_timestamp(secs, 0).expect("in range");
        SeriesPoint {
            timestamp,
            label: secs.to_string(),
            inbound: 1.0,
            outbound: 2.0,
            total: 3.0,
        }
    }

    fn labels(buffer: &SeriesBuffer) -> Vec<String> {
        buffer.iter().map(|p| p.label.clone()).collect()
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut buffer = SeriesBuffer::new(30);
        for i in 1..=31 {
            assert_eq!(buffer.append(at(i * 60)), AppendResult::Accepted);
        }
        assert_eq!(buffer.len(), 30);
        assert_eq!(buffer.first().map(|p| p.timestamp.timestamp()), Some(120));
        assert_eq!(buffer.last().map(|p| p.timestamp.timestamp()), Some(31 * 60));
    }

    #[test]
    fn duplicate_and_late_points_are_rejected() {
        let mut buffer = SeriesBuffer::new(10);
        buffer.append(at(100));
        buffer.append(at(200));
        assert_eq!(buffer.append(at(200)), AppendResult::RejectedDuplicate);
        assert_eq!(buffer.append(at(150)), AppendResult::RejectedOutOfOrder);
        assert_eq!(labels(&buffer), vec!["100", "200"]);
    }

    #[test]
    fn replace_all_keeps_most_recent_and_drops_disorder() {
        let mut buffer = SeriesBuffer::new(3);
        buffer.append(at(1));
        let kept = buffer.replace_all([at(10), at(20), at(20), at(15), at(30), at(40), at(50)]);
        assert_eq!(kept, 3);
        assert_eq!(labels(&buffer), vec!["30", "40", "50"]);
    }

    #[test]
    fn replace_all_with_nothing_empties() {
        let mut buffer = SeriesBuffer::new(3);
        buffer.append(at(1));
        assert_eq!(buffer.replace_all(Vec::new()), 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn shrinking_capacity_evicts_front() {
        let mut buffer = SeriesBuffer::new(5);
        for i in 1..=5 {
            buffer.append(at(i));
        }
        buffer.set_capacity(2);
        assert_eq!(labels(&buffer), vec!["4", "5"]);
        buffer.set_capacity(0);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(labels(&buffer), vec!["5"]);
    }

    #[test]
    fn appends_in_any_order_keep_bound_and_order() {
        // Steps relative to the newest point: duplicates, late arrivals,
        // small and large jumps forward.
        let steps = [0, 60, -60, 1, 0, -3600, 120, 59, -1, 600, 0, 1, -30, 3600];
        for capacity in [1, 2, 5, 30] {
            let mut buffer = SeriesBuffer::new(capacity);
            let mut newest = 0_i64;
            for round in 0_i64..20 {
                for (i, step) in steps.iter().enumerate() {
                    let offset = newest + step * (round % 3 + 1);
                    let result = buffer.append(at(offset));
                    if result == AppendResult::Accepted {
                        newest = offset;
                    } else {
                        assert!(offset <= newest, "{offset} rejected after {newest} (step {i})");
                    }

                    assert!(buffer.len() <= capacity);
                    let stamps: Vec<_> = buffer.iter().map(|p| p.timestamp).collect();
                    assert!(stamps.windows(2).all(|w| w[0] < w[1]), "disorder: {stamps:?}");
                    assert_eq!(buffer.last().map(|p| p.timestamp), Some(at(newest).timestamp));
                }
            }
        }
    }

    #[test]
    fn frame_is_column_oriented() {
        let mut buffer = SeriesBuffer::new(4);
        buffer.append(at(1));
        buffer.append(at(2));
        let frame = buffer.to_frame();
        assert_eq!(frame.labels, vec!["1", "2"]);
        assert_eq!(frame.timestamps, vec![at(1).timestamp, at(2).timestamp]);
        assert_eq!(frame.total, vec![3.0, 3.0]);
        assert_eq!(frame.len(), 2);
        assert_eq!(buffer.snapshot().len(), 2);
    }
}
