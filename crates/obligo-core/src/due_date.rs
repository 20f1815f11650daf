//! Due-date arithmetic on the civil calendar.
//!
//! All instants here are naive local date-times; callers convert "now" into
//! the engine's timezone before asking. A date that cannot exist (February 30,
//! April 31) is reported as [`ObligoError::DateComputation`] instead of being
//! replaced with a made-up instant, so the batch can record the item as failed.

use crate::error::{ObligoError, Result};
use crate::frequency::{FrequencyConfig, TimeOfDay};
use crate::period::{fiscal_quarter, FinancialYear};
use crate::types::Cadence;
use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime};

fn at(cadence: Cadence, year: i32, month: u32, day: u32, time: TimeOfDay) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|d| d.and_time(time.to_naive_time()))
        .ok_or_else(|| {
            ObligoError::date(cadence, format!("{year:04}-{month:02}-{day:02} is not a calendar date"))
        })
}

fn plus_days(cadence: Cadence, date: NaiveDate, n: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(n))
        .ok_or_else(|| ObligoError::date(cadence, format!("{date} + {n} days is out of range")))
}

/// `(year, month)` that is `offset` months after `(year, month)`.
fn add_months(year: i32, month: u32, offset: u32) -> (i32, u32) {
    let zero_based = month - 1 + offset;
    (year + (zero_based / 12) as i32, zero_based % 12 + 1)
}

/// The next due instant at or after `from`.
///
/// Recurring cadences always return an instant strictly after `from`, except
/// Monthly which unconditionally moves to next month's configured day even if
/// this month's has not passed yet. OneTime and None return `from` unchanged.
pub fn next_occurrence(config: &FrequencyConfig, from: NaiveDateTime) -> Result<NaiveDateTime> {
    let cadence = config.cadence();
    match config {
        FrequencyConfig::Hourly { interval } => from
            .checked_add_signed(Duration::hours(i64::from(*interval)))
            .ok_or_else(|| ObligoError::date(cadence, "hourly interval overflows")),

        FrequencyConfig::Daily { time } => {
            let today = from.date().and_time(time.to_naive_time());
            if today > from {
                Ok(today)
            } else {
                Ok(plus_days(cadence, from.date(), 1)?.and_time(time.to_naive_time()))
            }
        }

        FrequencyConfig::Weekly { days, time } => {
            // Seven days ahead covers "same weekday, time already passed".
            for offset in 0..=7 {
                let date = plus_days(cadence, from.date(), offset)?;
                let candidate = date.and_time(time.to_naive_time());
                if days.contains(&date.weekday()) && candidate > from {
                    return Ok(candidate);
                }
            }
            Err(ObligoError::date(cadence, "no configured weekday in the next 7 days"))
        }

        FrequencyConfig::Monthly { day, time } => {
            let (year, month) = add_months(from.year(), from.month(), 1);
            at(cadence, year, month, *day, *time)
        }

        FrequencyConfig::Quarterly { months, day, time } => {
            for offset in 0..=12 {
                let (year, month) = add_months(from.year(), from.month(), offset);
                if !months.iter().any(|m| m.number_from_month() == month) {
                    continue;
                }
                let candidate = at(cadence, year, month, *day, *time)?;
                if candidate > from {
                    return Ok(candidate);
                }
            }
            Err(ObligoError::date(cadence, "no configured month in the next 12 months"))
        }

        FrequencyConfig::Yearly { month, date, time } => {
            let month = month.number_from_month();
            let this_year = at(cadence, from.year(), month, *date, *time)?;
            if this_year > from {
                Ok(this_year)
            } else {
                at(cadence, from.year() + 1, month, *date, *time)
            }
        }

        FrequencyConfig::OneTime | FrequencyConfig::None => Ok(from),
    }
}

/// Due instant inside the bucket that contains `now`.
///
/// Used when a timeline is first materialized for the current period. If the
/// bucket's configured instant has already passed, or the bucket has none,
/// this falls back to [`next_occurrence`] from `now`.
pub fn current_period_due_date(config: &FrequencyConfig, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let cadence = config.cadence();
    let today = now.date();
    let candidate = match config {
        FrequencyConfig::Hourly { .. } => None,
        FrequencyConfig::Daily { time } => Some(today.and_time(time.to_naive_time())),
        FrequencyConfig::Weekly { days, time } => {
            let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
            match days.first() {
                Some(first) => {
                    let date = plus_days(cadence, monday, u64::from(first.num_days_from_monday()))?;
                    Some(date.and_time(time.to_naive_time()))
                }
                None => None,
            }
        }
        FrequencyConfig::Monthly { day, time } => {
            Some(at(cadence, today.year(), today.month(), *day, *time)?)
        }
        FrequencyConfig::Quarterly { months, day, time } => {
            let quarter = fiscal_quarter(today.month());
            match months
                .iter()
                .map(|m| m.number_from_month())
                .find(|m| fiscal_quarter(*m) == quarter)
            {
                Some(month) => Some(at(cadence, today.year(), month, *day, *time)?),
                None => None,
            }
        }
        FrequencyConfig::Yearly { month, date, time } => {
            let fy = FinancialYear::containing(today);
            let month = month.number_from_month();
            let year = if month >= 4 { fy.start_year() } else { fy.end_year() };
            Some(at(cadence, year, month, *date, *time)?)
        }
        FrequencyConfig::OneTime | FrequencyConfig::None => return Ok(now),
    };

    match candidate {
        Some(due) if due >= now => Ok(due),
        _ => next_occurrence(config, now),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
