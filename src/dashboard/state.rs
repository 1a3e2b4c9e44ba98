//! Dashboard State
//!
//! The mapping from series name to `Series`, plus the observer list that the
//! rendering layer registers through. The reconciler is the only writer of
//! series data; everything else goes through `DashboardReader`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::series::{Point, Series};

/// Identifier returned by [`DashboardState::subscribe`]
pub type SubscriptionId = u64;

/// Callback invoked after every series mutation
pub type Observer = Arc<dyn Fn(&SeriesUpdate) + Send + Sync>;

/// What caused a series update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCause {
    /// A point was inserted
    Appended,
    /// The whole sequence was replaced by a snapshot
    Replaced,
    /// The series was created empty (catalog or configuration)
    Registered,
}

/// Notification handed to observers: "update series S with these points"
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesUpdate {
    pub series: String,
    pub points: Vec<Point>,
    pub cause: UpdateCause,
    /// Points evicted (or dropped from a snapshot) by the retention cap
    pub evicted: usize,
}

/// Everything currently displayed
#[derive(Default)]
pub struct DashboardState {
    series: HashMap<String, Series>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: SubscriptionId,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it is called after each mutation
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&SeriesUpdate) + Send + Sync + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.observers.push((id, Arc::new(callback)));
        id
    }

    /// Remove an observer. Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Observers cloned out so they can be called without holding a lock
    pub(crate) fn observers(&self) -> Vec<Observer> {
        self.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
    }

    pub fn series(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    /// Series names, sorted
    pub fn series_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.series.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub(crate) fn series_mut(&mut self, name: &str) -> Option<&mut Series> {
        self.series.get_mut(name)
    }

    /// Get a series, creating it empty if missing. The flag is true when
    /// the series was created by this call.
    pub(crate) fn get_or_create(&mut self, name: &str, cap: usize) -> (&mut Series, bool) {
        let created = !self.series.contains_key(name);
        let series = self
            .series
            .entry(name.to_string())
            .or_insert_with(|| Series::new(name, cap));
        (series, created)
    }
}

/// Shared storage for the state: one writer (the reconciler), many readers
pub(crate) type SharedState = Arc<RwLock<DashboardState>>;

pub(crate) fn read(state: &SharedState) -> RwLockReadGuard<'_, DashboardState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write(state: &SharedState) -> RwLockWriteGuard<'_, DashboardState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}

/// Read-only handle given to the rendering layer
///
/// It can read series and manage its own subscriptions, but cannot change
/// series data.
#[derive(Clone)]
pub struct DashboardReader {
    state: SharedState,
}

impl DashboardReader {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Points of one series, oldest first
    pub fn series(&self, name: &str) -> Option<Vec<Point>> {
        read(&self.state).series(name).map(Series::to_vec)
    }

    /// Most recent point of one series
    pub fn latest(&self, name: &str) -> Option<Point> {
        read(&self.state).series(name).and_then(|s| s.latest().copied())
    }

    pub fn contains(&self, name: &str) -> bool {
        read(&self.state).contains(name)
    }

    pub fn series_names(&self) -> Vec<String> {
        read(&self.state).series_names()
    }

    /// Full copy of every series
    pub fn snapshot(&self) -> HashMap<String, Vec<Point>> {
        let state = read(&self.state);
        state
            .series
            .iter()
            .map(|(name, s)| (name.clone(), s.to_vec()))
            .collect()
    }

    pub fn len(&self) -> usize {
        read(&self.state).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.state).is_empty()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SeriesUpdate) + Send + Sync + 'static,
    {
        write(&self.state).subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        write(&self.state).unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_unsubscribe() {
        let mut state = DashboardState::new();
        let a = state.subscribe(|_| {});
        let b = state.subscribe(|_| {});
        assert_ne!(a, b);
        assert_eq!(state.observer_count(), 2);

        assert!(state.unsubscribe(a));
        assert!(!state.unsubscribe(a));
        assert_eq!(state.observer_count(), 1);
    }

    #[test]
    fn test_get_or_create() {
        let mut state = DashboardState::new();
        let (_, created) = state.get_or_create("cpu", 5);
        assert!(created);
        let (series, created) = state.get_or_create("cpu", 5);
        assert!(!created);
        assert_eq!(series.cap(), 5);
        assert_eq!(state.series_names(), vec!["cpu".to_string()]);
    }

    #[test]
    fn test_reader_sees_writes() {
        let shared: SharedState = Arc::new(RwLock::new(DashboardState::new()));
        let reader = DashboardReader::new(Arc::clone(&shared));
        assert!(reader.is_empty());

        {
            let mut state = write(&shared);
            let (series, _) = state.get_or_create("mem", 10);
            series.insert(Point::new(1, 42.0));
        }

        assert!(reader.contains("mem"));
        assert_eq!(reader.latest("mem"), Some(Point::new(1, 42.0)));
        assert_eq!(reader.snapshot().get("mem").map(Vec::len), Some(1));
    }
}
