//! At-most-once timeline creation.

use crate::error::Result;
use crate::frequency::RawFrequencyConfig;
use crate::period::FinancialYear;
use crate::store::{FieldValue, InsertOutcome, TimelineKey, TimelineRecord, TimelineStore};
use crate::types::{Cadence, TimelineStatus};
use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Everything stored on a new timeline besides its key and due date.
#[derive(Debug, Clone)]
pub struct TimelineMetadata {
    pub cadence: Cadence,
    pub frequency_config: RawFrequencyConfig,
    pub financial_year: FinancialYear,
    pub obligation_name: String,
    pub sub_obligation_name: Option<String>,
    pub branch_id: Option<String>,
    pub fields: Vec<FieldValue>,
}

#[derive(Debug, Clone)]
pub struct Upsert {
    /// False when a timeline already existed for the key.
    pub created: bool,
    /// The stored record: the new one, or the untouched existing one.
    pub record: TimelineRecord,
}

pub struct Materializer {
    store: Arc<dyn TimelineStore>,
}

impl Materializer {
    pub fn new(store: Arc<dyn TimelineStore>) -> Self {
        Self { store }
    }

    /// Create the timeline for `key` unless one exists.
    ///
    /// An existing timeline is returned as-is with `created = false`; its
    /// status, due date and field values are never overwritten. Racing calls
    /// for the same key are resolved by the store's conditional insert, and
    /// the loser gets `created = false`, not an error.
    pub fn upsert(
        &self,
        key: TimelineKey,
        due_date: NaiveDateTime,
        metadata: TimelineMetadata,
    ) -> Result<Upsert> {
        let now = Utc::now();
        let record = TimelineRecord {
            id: Uuid::new_v4(),
            key,
            due_date,
            status: TimelineStatus::Pending,
            cadence: metadata.cadence,
            frequency_config: metadata.frequency_config,
            financial_year: metadata.financial_year.to_string(),
            obligation_name: metadata.obligation_name,
            sub_obligation_name: metadata.sub_obligation_name,
            branch_id: metadata.branch_id,
            fields: metadata.fields,
            created_at: now,
            updated_at: now,
        };
        let upsert = match self.store.insert_if_absent(record)? {
            InsertOutcome::Inserted(record) => Upsert {
                created: true,
                record,
            },
            InsertOutcome::Existing(record) => Upsert {
                created: false,
                record,
            },
        };
        Ok(upsert)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;
    use crate::store::TimelineDb;
    use chrono::NaiveDate;
    use std::sync::Barrier;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, Arc<TimelineDb>) {
        let dir = TempDir::new().unwrap();
        let db = TimelineDb::open(&dir.path().join("timelines.db")).unwrap();
        (dir, Arc::new(db))
    }

    fn key() -> TimelineKey {
        TimelineKey::new("acme", "gst", Some("gstr-3b"), Period::from("July-2024".to_string()))
    }

    fn due(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn metadata() -> TimelineMetadata {
        TimelineMetadata {
            cadence: Cadence::Monthly,
            frequency_config: RawFrequencyConfig {
                monthly_day: Some(20),
                monthly_time: Some("09:00 AM".into()),
                ..Default::default()
            },
            financial_year: FinancialYear::starting(2024),
            obligation_name: "GST Returns".into(),
            sub_obligation_name: Some("GSTR-3B".into()),
            branch_id: Some("mumbai".into()),
            fields: vec![FieldValue {
                name: "arn".into(),
                required: true,
                value: None,
            }],
        }
    }

    #[test]
    fn second_upsert_is_a_no_op() {
        let (_dir, db) = open_tmp();
        let materializer = Materializer::new(db.clone());

        let first = materializer.upsert(key(), due(20), metadata()).unwrap();
        assert!(first.created);
        assert_eq!(first.record.financial_year, "2024-2025");

        let second = materializer.upsert(key(), due(20), metadata()).unwrap();
        assert!(!second.created);
        assert_eq!(second.record.id, first.record.id);
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn existing_progress_is_never_overwritten() {
        let (_dir, db) = open_tmp();
        let materializer = Materializer::new(db.clone());
        materializer.upsert(key(), due(20), metadata()).unwrap();
        db.set_status(&key(), TimelineStatus::Completed).unwrap();

        let again = materializer.upsert(key(), due(25), metadata()).unwrap();
        assert!(!again.created);
        assert_eq!(again.record.status, TimelineStatus::Completed);
        assert_eq!(again.record.due_date, due(20));
    }

    #[test]
    fn concurrent_upserts_create_exactly_one_record() {
        let (_dir, db) = open_tmp();
        let materializer = Materializer::new(db.clone());
        let threads = 8;
        let barrier = Barrier::new(threads);

        let created: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        materializer.upsert(key(), due(20), metadata()).unwrap().created
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|created| *created)
                .count()
        });

        assert_eq!(created, 1);
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn different_periods_are_different_timelines() {
        let (_dir, db) = open_tmp();
        let materializer = Materializer::new(db.clone());
        materializer.upsert(key(), due(20), metadata()).unwrap();

        let mut august = key();
        august.period = Period::from("August-2024".to_string());
        assert!(materializer.upsert(august, due(20), metadata()).unwrap().created);
        assert_eq!(db.list_for_client("acme").unwrap().len(), 2);
    }
}
