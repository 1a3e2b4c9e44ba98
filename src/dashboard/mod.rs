//! Dashboard State
//!
//! In-memory chart state fed by the live connection:
//!
//! - **series**: bounded, timestamp-ordered point sequences
//! - **state**: series map, observers, and the read-only reader handle
//! - **reconciler**: applies decoded events to the state
//!
//! # Example
//!
//! ```rust
//! use chartfeed::dashboard::{Reconciler, ReconcilerOptions};
//! use chartfeed::protocol::Event;
//!
//! let mut reconciler = Reconciler::new(ReconcilerOptions::with_cap(3));
//! let reader = reconciler.reader();
//!
//! for (t, v) in [(1, 10.0), (2, 20.0), (3, 30.0), (4, 40.0)] {
//!     reconciler.apply(&Event::metric("cpu", t, v));
//! }
//!
//! let cpu = reader.series("cpu").unwrap();
//! assert_eq!(cpu.len(), 3);
//! assert_eq!(cpu[0].t, 2);
//! ```

mod reconciler;
mod series;
mod state;

pub use reconciler::{DuplicatePolicy, Reconciler, ReconcilerOptions, DEFAULT_RETENTION_CAP};
pub use series::{Point, Series};
pub use state::{DashboardReader, DashboardState, Observer, SeriesUpdate, SubscriptionId, UpdateCause};
