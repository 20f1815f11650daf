//! redb-backed timeline store.
//!
//! # Table design
//!
//! A single `TIMELINES` table keyed by [`TimelineKey::storage_key`]:
//! ```text
//! client_id 0x1f obligation_id 0x1f sub_obligation_id 0x1f period
//! ```
//! The key *is* the uniqueness constraint. redb admits one write transaction
//! at a time, so "look up key, insert if absent" inside a single write
//! transaction is an atomic conditional insert: two racing callers are
//! serialized and the second one sees the first one's row.
//!
//! Because the client id leads the key, a range scan from
//! `client_id 0x1f` returns every timeline of that client.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::{ObligoError, Result};
use crate::types::TimelineStatus;

use super::record::{TimelineKey, TimelineRecord};

// ---------------------------------------------------------------------------
// Table definition
// ---------------------------------------------------------------------------

/// Key: encoded `TimelineKey`
/// Value: JSON-encoded `TimelineRecord`
const TIMELINES: TableDefinition<&str, &[u8]> = TableDefinition::new("timelines");

fn store_err(e: impl std::fmt::Display) -> ObligoError {
    ObligoError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// TimelineStore
// ---------------------------------------------------------------------------

/// Result of a conditional insert.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// No record existed for the key; this one was written.
    Inserted(TimelineRecord),
    /// A record already existed and was left untouched.
    Existing(TimelineRecord),
}

/// What the materializer needs from storage.
pub trait TimelineStore: Send + Sync {
    /// Write `record` only if nothing is stored under its key, atomically.
    fn insert_if_absent(&self, record: TimelineRecord) -> Result<InsertOutcome>;

    fn get(&self, key: &TimelineKey) -> Result<Option<TimelineRecord>>;

    /// Every timeline of one client, in key order.
    fn list_for_client(&self, client_id: &str) -> Result<Vec<TimelineRecord>>;
}

// ---------------------------------------------------------------------------
// TimelineDb
// ---------------------------------------------------------------------------

pub struct TimelineDb {
    db: Database,
}

impl TimelineDb {
    /// Open or create the redb database at `path`.
    ///
    /// Creates the `TIMELINES` table if it doesn't already exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(TIMELINES).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self { db })
    }

    /// Change the status of an existing timeline. Used by the practice's own
    /// task flows; the engine never calls it.
    pub fn set_status(&self, key: &TimelineKey, status: TimelineStatus) -> Result<TimelineRecord> {
        let storage_key = key.storage_key();
        let wt = self.db.begin_write().map_err(store_err)?;
        let record = {
            let mut table = wt.open_table(TIMELINES).map_err(store_err)?;
            let bytes = table
                .get(storage_key.as_str())
                .map_err(store_err)?
                .map(|v| v.value().to_vec())
                .ok_or_else(|| ObligoError::TimelineNotFound(key.to_string()))?;
            let mut record: TimelineRecord = serde_json::from_slice(&bytes)?;
            record.status = status;
            record.updated_at = Utc::now();
            let value = serde_json::to_vec(&record)?;
            table
                .insert(storage_key.as_str(), value.as_slice())
                .map_err(store_err)?;
            record
        };
        wt.commit().map_err(store_err)?;
        Ok(record)
    }

    /// Every timeline, sorted by due date (earliest first).
    pub fn list_all(&self) -> Result<Vec<TimelineRecord>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(TIMELINES).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (_, v) = entry.map_err(store_err)?;
            let record: TimelineRecord = serde_json::from_slice(v.value())?;
            result.push(record);
        }
        result.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(result)
    }

    pub fn count(&self) -> Result<u64> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(TIMELINES).map_err(store_err)?;
        let mut n = 0;
        for entry in table.iter().map_err(store_err)? {
            entry.map_err(store_err)?;
            n += 1;
        }
        Ok(n)
    }
}

impl TimelineStore for TimelineDb {
    fn insert_if_absent(&self, record: TimelineRecord) -> Result<InsertOutcome> {
        let storage_key = record.key.storage_key();
        let value = serde_json::to_vec(&record)?;

        let wt = self.db.begin_write().map_err(store_err)?;
        let existing = {
            let mut table = wt.open_table(TIMELINES).map_err(store_err)?;
            let existing = table
                .get(storage_key.as_str())
                .map_err(store_err)?
                .map(|v| v.value().to_vec());
            if existing.is_none() {
                table
                    .insert(storage_key.as_str(), value.as_slice())
                    .map_err(store_err)?;
            }
            existing
        };

        match existing {
            Some(bytes) => {
                wt.abort().map_err(store_err)?;
                Ok(InsertOutcome::Existing(serde_json::from_slice(&bytes)?))
            }
            None => {
                wt.commit().map_err(store_err)?;
                Ok(InsertOutcome::Inserted(record))
            }
        }
    }

    fn get(&self, key: &TimelineKey) -> Result<Option<TimelineRecord>> {
        let storage_key = key.storage_key();
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(TIMELINES).map_err(store_err)?;
        let value = table.get(storage_key.as_str()).map_err(store_err)?;
        match value {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    fn list_for_client(&self, client_id: &str) -> Result<Vec<TimelineRecord>> {
        let prefix = TimelineKey::client_prefix(client_id);
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(TIMELINES).map_err(store_err)?;

        let mut result = Vec::new();
        for entry in table.range(prefix.as_str()..).map_err(store_err)? {
            let (k, v) = entry.map_err(store_err)?;
            if !k.value().starts_with(prefix.as_str()) {
                break;
            }
            result.push(serde_json::from_slice(v.value())?);
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::RawFrequencyConfig;
    use crate::period::Period;
    use crate::types::Cadence;
    use chrono::NaiveDate;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn open_tmp() -> (TempDir, TimelineDb) {
        let dir = TempDir::new().unwrap();
        let db = TimelineDb::open(&dir.path().join("timelines.db")).unwrap();
        (dir, db)
    }

    fn record(client: &str, period: &str) -> TimelineRecord {
        let now = Utc::now();
        TimelineRecord {
            id: Uuid::new_v4(),
            key: TimelineKey::new(client, "gst", Some("gstr-3b"), Period::from(period.to_string())),
            due_date: NaiveDate::from_ymd_opt(2024, 7, 20)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            status: TimelineStatus::Pending,
            cadence: Cadence::Monthly,
            frequency_config: RawFrequencyConfig::default(),
            financial_year: "2024-2025".into(),
            obligation_name: "GST Returns".into(),
            sub_obligation_name: Some("GSTR-3B".into()),
            branch_id: None,
            fields: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_if_absent_keeps_first_record() {
        let (_dir, db) = open_tmp();
        let first = record("acme", "July-2024");
        let first_id = first.id;

        assert!(matches!(
            db.insert_if_absent(first).unwrap(),
            InsertOutcome::Inserted(_)
        ));
        match db.insert_if_absent(record("acme", "July-2024")).unwrap() {
            InsertOutcome::Existing(existing) => assert_eq!(existing.id, first_id),
            other => panic!("expected Existing, got {other:?}"),
        }
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn get_returns_none_for_missing_key() {
        let (_dir, db) = open_tmp();
        let missing = record("acme", "July-2024").key;
        assert!(db.get(&missing).unwrap().is_none());
    }

    #[test]
    fn list_for_client_is_prefix_scoped() {
        let (_dir, db) = open_tmp();
        db.insert_if_absent(record("acme", "July-2024")).unwrap();
        db.insert_if_absent(record("acme", "August-2024")).unwrap();
        db.insert_if_absent(record("acme-2", "July-2024")).unwrap();
        db.insert_if_absent(record("zeta", "July-2024")).unwrap();

        let acme = db.list_for_client("acme").unwrap();
        assert_eq!(acme.len(), 2);
        assert!(acme.iter().all(|r| r.key.client_id == "acme"));
        assert!(db.list_for_client("nobody").unwrap().is_empty());
    }

    #[test]
    fn set_status_updates_existing_only() {
        let (_dir, db) = open_tmp();
        let rec = record("acme", "July-2024");
        let key = rec.key.clone();
        db.insert_if_absent(rec).unwrap();

        let updated = db.set_status(&key, TimelineStatus::Completed).unwrap();
        assert_eq!(updated.status, TimelineStatus::Completed);
        assert_eq!(
            db.get(&key).unwrap().unwrap().status,
            TimelineStatus::Completed
        );

        let missing = record("acme", "May-2024").key;
        assert!(matches!(
            db.set_status(&missing, TimelineStatus::Ongoing),
            Err(ObligoError::TimelineNotFound(_))
        ));
    }

    #[test]
    fn reopen_preserves_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("timelines.db");
        {
            let db = TimelineDb::open(&path).unwrap();
            db.insert_if_absent(record("acme", "July-2024")).unwrap();
        }
        let db = TimelineDb::open(&path).unwrap();
        assert_eq!(db.list_all().unwrap().len(), 1);
    }
}
