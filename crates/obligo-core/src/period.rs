//! Recurrence buckets.
//!
//! A [`Period`] names the bucket an instant falls into for a cadence. It is
//! the last component of a timeline's uniqueness key, so every instant in the
//! same bucket must produce the same string and different cadences must never
//! share a format.
//!
//! | cadence   | format        | example      |
//! |-----------|---------------|--------------|
//! | Hourly    | `YYYY-MM-DDTHH` | `2024-07-01T09` |
//! | Daily     | `YYYY-MM-DD`  | `2024-07-01` |
//! | Weekly    | `YYYY-Www`    | `2024-W27`   |
//! | Monthly   | `Month-YYYY`  | `July-2024`  |
//! | Quarterly | `Qn-YYYY`     | `Q1-2024`    |
//! | Yearly    | `YYYY-YYYY`   | `2024-2025`  |
//! | OneTime / None | `one-time` |            |
//!
//! Quarters follow the registered fiscal numbering that starts in July:
//! Jul–Sep is Q1, Oct–Dec Q2, Jan–Mar Q3, Apr–Jun Q4. The year is the
//! calendar year of the instant, which never changes inside a quarter.

use crate::types::Cadence;
use chrono::{DateTime, Datelike, Month, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(String);

impl Period {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Period {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Bucket `at` for `cadence`.
pub fn period(at: NaiveDateTime, cadence: Cadence) -> Period {
    let date = at.date();
    let s = match cadence {
        Cadence::Hourly => at.format("%Y-%m-%dT%H").to_string(),
        Cadence::Daily => date.format("%Y-%m-%d").to_string(),
        Cadence::Weekly => {
            let week = date.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        Cadence::Monthly => format!("{}-{}", month_name(date.month()), date.year()),
        Cadence::Quarterly => format!("Q{}-{}", fiscal_quarter(date.month()), date.year()),
        Cadence::Yearly => FinancialYear::containing(date).to_string(),
        Cadence::OneTime | Cadence::None => "one-time".to_string(),
    };
    Period(s)
}

fn month_name(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or("Unknown")
}

/// Fiscal quarter (1..=4) of a calendar month (1..=12), Q1 starting in July.
pub fn fiscal_quarter(month: u32) -> u32 {
    ((month + 5) % 12) / 3 + 1
}

// ---------------------------------------------------------------------------
// FinancialYear
// ---------------------------------------------------------------------------

/// April 1 through March 31, named by its two calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FinancialYear {
    start_year: i32,
}

impl FinancialYear {
    pub fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn containing(date: NaiveDate) -> Self {
        let start_year = if date.month() >= 4 {
            date.year()
        } else {
            date.year() - 1
        };
        Self { start_year }
    }

    /// The financial year in effect at `now` on the civil calendar of `tz`.
    pub fn current<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Self {
        Self::containing(now.with_timezone(tz).date_naive())
    }

    pub fn start_year(self) -> i32 {
        self.start_year
    }

    pub fn end_year(self) -> i32 {
        self.start_year + 1
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_year, self.end_year())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
