//! Materialized timeline records and their uniqueness key.

use crate::frequency::RawFrequencyConfig;
use crate::period::Period;
use crate::types::{Cadence, TimelineStatus};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Separates key segments in the storage key. Ids are validated to never
/// contain it.
const SEP: char = '\u{1f}';

// ---------------------------------------------------------------------------
// TimelineKey
// ---------------------------------------------------------------------------

/// (client, obligation, sub-obligation or none, period). At most one
/// timeline exists per key for the lifetime of the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineKey {
    pub client_id: String,
    pub obligation_id: String,
    #[serde(default)]
    pub sub_obligation_id: Option<String>,
    pub period: Period,
}

impl TimelineKey {
    pub fn new(
        client_id: impl Into<String>,
        obligation_id: impl Into<String>,
        sub_obligation_id: Option<&str>,
        period: Period,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            obligation_id: obligation_id.into(),
            sub_obligation_id: sub_obligation_id.map(str::to_string),
            period,
        }
    }

    /// Byte-orderable key: client id first, so one client's timelines are
    /// contiguous and can be range-scanned.
    pub fn storage_key(&self) -> String {
        format!(
            "{}{SEP}{}{SEP}{}{SEP}{}",
            self.client_id,
            self.obligation_id,
            self.sub_obligation_id.as_deref().unwrap_or(""),
            self.period
        )
    }

    pub(crate) fn client_prefix(client_id: &str) -> String {
        format!("{client_id}{SEP}")
    }
}

impl fmt::Display for TimelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.client_id,
            self.obligation_id,
            self.sub_obligation_id.as_deref().unwrap_or("-"),
            self.period
        )
    }
}

// ---------------------------------------------------------------------------
// TimelineRecord
// ---------------------------------------------------------------------------

/// Placeholder for a value the practice fills in while working the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub key: TimelineKey,
    /// Civil date-time in the engine's timezone.
    pub due_date: NaiveDateTime,
    pub status: TimelineStatus,
    pub cadence: Cadence,
    /// Frequency config as it was when the timeline was created.
    pub frequency_config: RawFrequencyConfig,
    pub financial_year: String,
    pub obligation_name: String,
    #[serde(default)]
    pub sub_obligation_name: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(sub: Option<&str>) -> TimelineKey {
        TimelineKey::new("acme", "gst", sub, Period::from("July-2024".to_string()))
    }

    #[test]
    fn storage_key_distinguishes_missing_sub() {
        assert_ne!(key(None).storage_key(), key(Some("gstr-1")).storage_key());
        assert!(key(None)
            .storage_key()
            .starts_with(&TimelineKey::client_prefix("acme")));
    }

    #[test]
    fn client_prefix_does_not_match_longer_ids() {
        let other = TimelineKey::new("acme-2", "gst", None, Period::from("July-2024".to_string()));
        assert!(!other
            .storage_key()
            .starts_with(&TimelineKey::client_prefix("acme")));
    }

    #[test]
    fn display_is_slash_separated() {
        assert_eq!(key(None).to_string(), "acme/gst/-/July-2024");
        assert_eq!(key(Some("gstr-1")).to_string(), "acme/gst/gstr-1/July-2024");
    }
}
