//! Chart State Reconciler
//!
//! Applies decoded events to the dashboard state and notifies observers.
//! The reconciler is the only writer of series data.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use super::series::Point;
use super::state::{self, DashboardReader, DashboardState, SeriesUpdate, SharedState, UpdateCause};
use crate::protocol::{Event, Payload};

/// Default number of points retained per series
pub const DEFAULT_RETENTION_CAP: usize = 150;

/// What to do with a point whose `(t, v)` is already in the series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep it; upstream is not assumed to deliver exactly once
    #[default]
    Keep,
    /// Discard exact repeats, e.g. points resent after a reconnect
    Drop,
}

/// Reconciler settings
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    pub retention_cap: usize,
    pub duplicates: DuplicatePolicy,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            retention_cap: DEFAULT_RETENTION_CAP,
            duplicates: DuplicatePolicy::Keep,
        }
    }
}

impl ReconcilerOptions {
    pub fn with_cap(retention_cap: usize) -> Self {
        Self {
            retention_cap,
            ..Self::default()
        }
    }
}

pub struct Reconciler {
    state: SharedState,
    options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new(options: ReconcilerOptions) -> Self {
        Self {
            state: Arc::new(RwLock::new(DashboardState::new())),
            options,
        }
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Read-only handle for the rendering layer
    pub fn reader(&self) -> DashboardReader {
        DashboardReader::new(Arc::clone(&self.state))
    }

    /// Make sure a series exists before first paint
    pub fn register(&mut self, name: &str) -> bool {
        let (created, observers) = {
            let mut state = state::write(&self.state);
            let (_, created) = state.get_or_create(name, self.options.retention_cap);
            (created, state.observers())
        };

        if created {
            let update = SeriesUpdate {
                series: name.to_string(),
                points: Vec::new(),
                cause: UpdateCause::Registered,
                evicted: 0,
            };
            for observer in &observers {
                observer(&update);
            }
        }
        created
    }

    /// Apply one event and notify observers of every series it changed
    pub fn apply(&mut self, event: &Event) -> Vec<SeriesUpdate> {
        let (updates, observers) = {
            let mut state = state::write(&self.state);
            let updates = match event.payload() {
                Payload::Metric { series, point } => {
                    self.apply_point(&mut state, series, *point).into_iter().collect()
                }
                Payload::Snapshot { series, points } => {
                    vec![self.apply_snapshot(&mut state, series, points.clone())]
                }
                Payload::Catalog { series } => series
                    .iter()
                    .filter_map(|name| {
                        let (_, created) = state.get_or_create(name, self.options.retention_cap);
                        created.then(|| SeriesUpdate {
                            series: name.clone(),
                            points: Vec::new(),
                            cause: UpdateCause::Registered,
                            evicted: 0,
                        })
                    })
                    .collect(),
                Payload::Error { .. } => Vec::new(),
            };
            (updates, state.observers())
        };

        for update in &updates {
            tracing::trace!(
                series = %update.series,
                points = update.points.len(),
                cause = ?update.cause,
                "Series updated"
            );
            for observer in &observers {
                observer(update);
            }
        }

        updates
    }

    fn apply_point(&self, state: &mut DashboardState, name: &str, point: Point) -> Option<SeriesUpdate> {
        let (series, _) = state.get_or_create(name, self.options.retention_cap);

        if self.options.duplicates == DuplicatePolicy::Drop && series.contains(&point) {
            tracing::debug!(series = %name, t = point.t, "Duplicate point dropped");
            return None;
        }

        let evicted = series.insert(point);
        Some(SeriesUpdate {
            series: name.to_string(),
            points: series.to_vec(),
            cause: UpdateCause::Appended,
            evicted,
        })
    }

    fn apply_snapshot(&self, state: &mut DashboardState, name: &str, points: Vec<Point>) -> SeriesUpdate {
        let (series, _) = state.get_or_create(name, self.options.retention_cap);
        let evicted = series.replace(points);
        SeriesUpdate {
            series: name.to_string(),
            points: series.to_vec(),
            cause: UpdateCause::Replaced,
            evicted,
        }
    }

    /// Drop every point of one series, keeping it registered
    pub fn clear(&mut self, name: &str) -> bool {
        let (update, observers) = {
            let mut state = state::write(&self.state);
            let Some(series) = state.series_mut(name) else {
                return false;
            };
            let update = SeriesUpdate {
                series: name.to_string(),
                points: Vec::new(),
                cause: UpdateCause::Replaced,
                evicted: series.len(),
            };
            series.clear();
            (update, state.observers())
        };

        for observer in &observers {
            observer(&update);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn points(reconciler: &Reconciler, name: &str) -> Vec<(i64, f64)> {
        reconciler
            .reader()
            .series(name)
            .unwrap_or_default()
            .into_iter()
            .map(|p| (p.t, p.v))
            .collect()
    }

    #[test]
    fn test_retention_example() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::with_cap(3));
        for (t, v) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
            reconciler.apply(&Event::metric("cpu", t, v));
        }

        assert_eq!(points(&reconciler, "cpu"), vec![(2, 20.0), (3, 30.0), (4, 40.0)]);
    }

    #[test]
    fn test_creates_missing_series() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::default());
        assert!(!reconciler.reader().contains("mem"));

        let updates = reconciler.apply(&Event::metric("mem", 5, 70.0));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].cause, UpdateCause::Appended);
        assert_eq!(points(&reconciler, "mem"), vec![(5, 70.0)]);
    }

    #[test]
    fn test_out_of_order_delivery() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::with_cap(10));
        for t in [1, 4, 2, 3] {
            reconciler.apply(&Event::metric("cpu", t, t as f64));
        }
        let ts: Vec<i64> = points(&reconciler, "cpu").into_iter().map(|(t, _)| t).collect();
        assert_eq!(ts, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_retention_never_exceeded() {
        let cap = 7;
        let mut reconciler = Reconciler::new(ReconcilerOptions::with_cap(cap));
        // Scrambled timestamps 0..100
        for i in 0..100i64 {
            let t = (i * 37) % 100;
            reconciler.apply(&Event::metric("cpu", t, t as f64));
            assert!(reconciler.reader().series("cpu").unwrap().len() <= cap);
        }

        let ts: Vec<i64> = points(&reconciler, "cpu").into_iter().map(|(t, _)| t).collect();
        assert_eq!(ts, (93..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_duplicates_kept_by_default() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::default());
        reconciler.apply(&Event::metric("cpu", 1, 1.0));
        reconciler.apply(&Event::metric("cpu", 1, 1.0));
        assert_eq!(points(&reconciler, "cpu").len(), 2);
    }

    #[test]
    fn test_duplicates_dropped_when_configured() {
        let mut reconciler = Reconciler::new(ReconcilerOptions {
            retention_cap: 10,
            duplicates: DuplicatePolicy::Drop,
        });
        reconciler.apply(&Event::metric("cpu", 1, 1.0));
        let updates = reconciler.apply(&Event::metric("cpu", 1, 1.0));
        assert!(updates.is_empty());

        // Same timestamp, different value is not a duplicate
        reconciler.apply(&Event::metric("cpu", 1, 2.0));
        assert_eq!(points(&reconciler, "cpu"), vec![(1, 1.0), (1, 2.0)]);
    }

    #[test]
    fn test_snapshot_replaces_series() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::with_cap(2));
        reconciler.apply(&Event::metric("temp", 100, 1.0));

        let snapshot = Event::new(
            Payload::Snapshot {
                series: "temp".to_string(),
                points: vec![Point::new(3, 3.0), Point::new(1, 1.0), Point::new(2, 2.0)],
            },
            chrono::Utc::now(),
        );
        let updates = reconciler.apply(&snapshot);

        assert_eq!(updates[0].cause, UpdateCause::Replaced);
        assert_eq!(updates[0].evicted, 1);
        assert_eq!(points(&reconciler, "temp"), vec![(2, 2.0), (3, 3.0)]);
    }

    #[test]
    fn test_catalog_registers_series() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::default());
        reconciler.apply(&Event::metric("cpu", 1, 1.0));

        let catalog = Event::new(
            Payload::Catalog {
                series: vec!["cpu".to_string(), "mem".to_string()],
            },
            chrono::Utc::now(),
        );
        let updates = reconciler.apply(&catalog);

        // Only the new series is announced; existing data is untouched
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].series, "mem");
        assert_eq!(updates[0].cause, UpdateCause::Registered);
        assert_eq!(reconciler.reader().series_names(), vec!["cpu", "mem"]);
        assert_eq!(points(&reconciler, "cpu"), vec![(1, 1.0)]);
    }

    #[test]
    fn test_error_event_changes_nothing() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::default());
        let event = Event::new(
            Payload::Error {
                message: "boom".to_string(),
            },
            chrono::Utc::now(),
        );
        assert!(reconciler.apply(&event).is_empty());
        assert!(reconciler.reader().is_empty());
    }

    #[test]
    fn test_observers_notified() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::with_cap(2));
        let seen: Arc<Mutex<Vec<SeriesUpdate>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let reader = reconciler.reader();
        let id = reader.subscribe(move |update| sink.lock().unwrap().push(update.clone()));

        assert!(reconciler.register("cpu"));
        assert!(!reconciler.register("cpu"));
        reconciler.apply(&Event::metric("cpu", 1, 1.0));
        reconciler.apply(&Event::metric("cpu", 2, 2.0));
        reconciler.apply(&Event::metric("cpu", 3, 3.0));

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 4);
            assert_eq!(seen[0].cause, UpdateCause::Registered);
            assert_eq!(seen[3].points, vec![Point::new(2, 2.0), Point::new(3, 3.0)]);
            assert_eq!(seen[3].evicted, 1);
        }

        assert!(reader.unsubscribe(id));
        reconciler.apply(&Event::metric("cpu", 4, 4.0));
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_observer_can_read_state() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::default());
        let reader = reconciler.reader();
        let latest: Arc<Mutex<Option<Point>>> = Arc::new(Mutex::new(None));

        let inner = reader.clone();
        let sink = Arc::clone(&latest);
        reader.subscribe(move |update| {
            *sink.lock().unwrap() = inner.latest(&update.series);
        });

        reconciler.apply(&Event::metric("cpu", 9, 0.9));
        assert_eq!(*latest.lock().unwrap(), Some(Point::new(9, 0.9)));
    }

    #[test]
    fn test_clear_keeps_series() {
        let mut reconciler = Reconciler::new(ReconcilerOptions::default());
        reconciler.apply(&Event::metric("cpu", 1, 1.0));
        assert!(reconciler.clear("cpu"));
        assert!(!reconciler.clear("missing"));
        assert_eq!(reconciler.reader().series("cpu"), Some(Vec::new()));
    }
}
