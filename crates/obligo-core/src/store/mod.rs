//! Timeline persistence.
//!
//! Provides `TimelineRecord`, its uniqueness key, the `TimelineStore` seam the
//! materializer writes through, and `TimelineDb`, the redb-backed store.

pub mod db;
pub mod record;

pub use db::{InsertOutcome, TimelineDb, TimelineStore};
pub use record::{FieldValue, TimelineKey, TimelineRecord};
