//! Bounded, time-ordered series
//!
//! A `Series` is the backing store of one chart line. Points are kept sorted
//! by timestamp and the sequence never grows past its retention cap: once the
//! cap is exceeded, the oldest points are evicted first.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A single `(timestamp, value)` sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// Timestamp (unit is whatever the server sends, usually milliseconds)
    pub t: i64,
    /// Measured value
    pub v: f64,
}

impl Point {
    pub fn new(t: i64, v: f64) -> Self {
        Self { t, v }
    }
}

impl From<(i64, f64)> for Point {
    fn from((t, v): (i64, f64)) -> Self {
        Self { t, v }
    }
}

/// One named, time-indexed data stream
#[derive(Debug, Clone)]
pub struct Series {
    name: String,
    points: VecDeque<Point>,
    cap: usize,
}

impl Series {
    /// Create an empty series. A cap of zero is raised to one.
    pub fn new(name: impl Into<String>, cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            name: name.into(),
            points: VecDeque::with_capacity(cap.min(1024)),
            cap,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum number of retained points
    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over retained points, oldest first
    pub fn points(&self) -> impl Iterator<Item = &Point> + '_ {
        self.points.iter()
    }

    /// Copy the retained points into a `Vec`, oldest first
    pub fn to_vec(&self) -> Vec<Point> {
        self.points.iter().copied().collect()
    }

    /// Most recent point
    pub fn latest(&self) -> Option<&Point> {
        self.points.back()
    }

    /// Oldest retained point
    pub fn oldest(&self) -> Option<&Point> {
        self.points.front()
    }

    /// Whether a point with exactly this timestamp and value is retained
    pub fn contains(&self, point: &Point) -> bool {
        let start = self.points.partition_point(|p| p.t < point.t);
        self.points
            .range(start..)
            .take_while(|p| p.t == point.t)
            .any(|p| p.v == point.v)
    }

    /// Insert a point in timestamp order.
    ///
    /// Points with equal timestamps keep their arrival order. Returns the
    /// number of points evicted to stay within the cap.
    pub fn insert(&mut self, point: Point) -> usize {
        let in_order = self.points.back().map_or(true, |last| last.t <= point.t);

        if in_order {
            self.points.push_back(point);
        } else {
            let idx = self.points.partition_point(|p| p.t <= point.t);
            self.points.insert(idx, point);
        }

        self.evict_overflow()
    }

    /// Replace the whole sequence.
    ///
    /// Input is sorted by timestamp (stable) and trimmed to the most recent
    /// `cap` points. Returns the number of input points that were dropped.
    pub fn replace(&mut self, mut points: Vec<Point>) -> usize {
        points.sort_by_key(|p| p.t);

        let dropped = points.len().saturating_sub(self.cap);
        self.points = points.into_iter().skip(dropped).collect();
        dropped
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.points.len() > self.cap {
            self.points.pop_front();
            evicted += 1;
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_of(cap: usize, points: &[(i64, f64)]) -> Series {
        let mut s = Series::new("cpu", cap);
        for &p in points {
            s.insert(p.into());
        }
        s
    }

    fn timestamps(s: &Series) -> Vec<i64> {
        s.points().map(|p| p.t).collect()
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let s = series_of(3, &[(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)]);
        assert_eq!(
            s.to_vec(),
            vec![Point::new(2, 20.0), Point::new(3, 30.0), Point::new(4, 40.0)]
        );
    }

    #[test]
    fn test_out_of_order_insert_is_sorted() {
        let s = series_of(10, &[(1, 1.0), (5, 5.0), (3, 3.0), (4, 4.0), (2, 2.0)]);
        assert_eq!(timestamps(&s), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_late_point_older_than_window_is_evicted() {
        let mut s = series_of(3, &[(10, 1.0), (11, 1.0), (12, 1.0)]);
        let evicted = s.insert(Point::new(2, 9.0));

        assert_eq!(evicted, 1);
        assert_eq!(timestamps(&s), vec![10, 11, 12]);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let s = series_of(10, &[(1, 1.0), (3, 3.0), (1, 2.0)]);
        let values: Vec<f64> = s.points().map(|p| p.v).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_duplicates_are_retained() {
        let s = series_of(10, &[(1, 1.0), (1, 1.0)]);
        assert_eq!(s.len(), 2);
        assert!(s.contains(&Point::new(1, 1.0)));
        assert!(!s.contains(&Point::new(1, 2.0)));
    }

    #[test]
    fn test_replace_sorts_and_caps() {
        let mut s = series_of(3, &[(100, 0.0)]);
        let dropped = s.replace(vec![
            Point::new(4, 4.0),
            Point::new(1, 1.0),
            Point::new(3, 3.0),
            Point::new(2, 2.0),
        ]);

        assert_eq!(dropped, 1);
        assert_eq!(timestamps(&s), vec![2, 3, 4]);
        assert_eq!(s.latest(), Some(&Point::new(4, 4.0)));
        assert_eq!(s.oldest(), Some(&Point::new(2, 2.0)));
    }

    #[test]
    fn test_zero_cap_is_raised() {
        let s = series_of(0, &[(1, 1.0), (2, 2.0)]);
        assert_eq!(s.cap(), 1);
        assert_eq!(s.to_vec(), vec![Point::new(2, 2.0)]);
    }
}
