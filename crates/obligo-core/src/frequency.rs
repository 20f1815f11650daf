//! Cadence-specific frequency configuration.
//!
//! Obligation definitions are authored in a flat, camelCase shape
//! ([`RawFrequencyConfig`]) where every field is optional and only the ones
//! belonging to the selected cadence are meaningful. [`validate`] turns that
//! shape into the typed [`FrequencyConfig`] union, naming the first missing or
//! malformed field. [`normalize`] drops fields left over from a previously
//! selected cadence so they never accumulate on disk.

use crate::error::{ObligoError, Result};
use crate::types::Cadence;
use chrono::{Month, NaiveTime, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// TimeOfDay
// ---------------------------------------------------------------------------

static TIME_RE: OnceLock<Regex> = OnceLock::new();

fn time_re() -> &'static Regex {
    TIME_RE.get_or_init(|| {
        Regex::new(r"^(0?[1-9]|1[0-2]):([0-5][0-9])\s*([AaPp][Mm])$").unwrap()
    })
}

/// A wall-clock time authored in 12-hour `H:MM AM/PM` form, stored as 24-hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// Parse `"9:05 AM"`, `"09:05 pm"`, `"12:00AM"`.
    ///
    /// `12 AM` is midnight, `12 PM` is noon, any other PM hour gets `+12`.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = time_re().captures(s.trim())?;
        let hour12: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        let pm = caps[3].eq_ignore_ascii_case("pm");
        let hour = match (hour12, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        Self::new(hour, minute)
    }

    pub fn hour(self) -> u32 {
        self.hour
    }

    pub fn minute(self) -> u32 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hour12, suffix) = match self.hour {
            0 => (12, "AM"),
            h @ 1..=11 => (h, "AM"),
            12 => (12, "PM"),
            h => (h - 12, "PM"),
        };
        write!(f, "{hour12:02}:{:02} {suffix}", self.minute)
    }
}

// ---------------------------------------------------------------------------
// Name helpers
// ---------------------------------------------------------------------------

pub fn parse_month(s: &str) -> Option<Month> {
    s.trim().parse::<Month>().ok()
}

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    s.trim().parse::<Weekday>().ok()
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Longest the month can ever be; February counts its leap day.
fn max_days_in(month: Month) -> u32 {
    match month {
        Month::February => 29,
        Month::April | Month::June | Month::September | Month::November => 30,
        _ => 31,
    }
}

// ---------------------------------------------------------------------------
// RawFrequencyConfig
// ---------------------------------------------------------------------------

/// Authored shape of a frequency config. Every field is optional; which ones
/// are required depends on the cadence it is validated against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrequencyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_days: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarterly_months: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarterly_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarterly_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_date: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_time: Option<String>,
}

impl RawFrequencyConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// FrequencyConfig
// ---------------------------------------------------------------------------

/// Validated frequency config: exactly the fields its cadence needs.
#[derive(Debug, Clone, PartialEq)]
pub enum FrequencyConfig {
    Hourly {
        interval: u32,
    },
    Daily {
        time: TimeOfDay,
    },
    /// `days` is deduplicated and ordered Monday first.
    Weekly {
        days: Vec<Weekday>,
        time: TimeOfDay,
    },
    Monthly {
        day: u32,
        time: TimeOfDay,
    },
    /// `months` holds four distinct months ordered January first.
    Quarterly {
        months: Vec<Month>,
        day: u32,
        time: TimeOfDay,
    },
    Yearly {
        month: Month,
        date: u32,
        time: TimeOfDay,
    },
    OneTime,
    None,
}

impl FrequencyConfig {
    pub fn cadence(&self) -> Cadence {
        match self {
            Self::Hourly { .. } => Cadence::Hourly,
            Self::Daily { .. } => Cadence::Daily,
            Self::Weekly { .. } => Cadence::Weekly,
            Self::Monthly { .. } => Cadence::Monthly,
            Self::Quarterly { .. } => Cadence::Quarterly,
            Self::Yearly { .. } => Cadence::Yearly,
            Self::OneTime => Cadence::OneTime,
            Self::None => Cadence::None,
        }
    }

    /// Canonical authored form, with only this cadence's fields set.
    pub fn to_raw(&self) -> RawFrequencyConfig {
        let mut raw = RawFrequencyConfig::default();
        match self {
            Self::Hourly { interval } => raw.hourly_interval = Some(*interval),
            Self::Daily { time } => raw.daily_time = Some(time.to_string()),
            Self::Weekly { days, time } => {
                raw.weekly_days = Some(days.iter().map(|d| weekday_name(*d).to_string()).collect());
                raw.weekly_time = Some(time.to_string());
            }
            Self::Monthly { day, time } => {
                raw.monthly_day = Some(*day);
                raw.monthly_time = Some(time.to_string());
            }
            Self::Quarterly { months, day, time } => {
                raw.quarterly_months = Some(months.iter().map(|m| m.name().to_string()).collect());
                raw.quarterly_day = Some(*day);
                raw.quarterly_time = Some(time.to_string());
            }
            Self::Yearly { month, date, time } => {
                raw.yearly_month = Some(month.name().to_string());
                raw.yearly_date = Some(*date);
                raw.yearly_time = Some(time.to_string());
            }
            Self::OneTime | Self::None => {}
        }
        raw
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn required<'a, T>(cadence: Cadence, field: &'static str, value: &'a Option<T>) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| ObligoError::config(cadence, field, "is required"))
}

fn time_field(cadence: Cadence, field: &'static str, value: &Option<String>) -> Result<TimeOfDay> {
    let raw = required(cadence, field, value)?;
    TimeOfDay::parse(raw).ok_or_else(|| {
        ObligoError::config(cadence, field, format!("'{raw}' is not a time like '09:00 AM'"))
    })
}

fn day_field(cadence: Cadence, field: &'static str, value: &Option<u32>, max: u32) -> Result<u32> {
    let day = *required(cadence, field, value)?;
    if !(1..=max).contains(&day) {
        return Err(ObligoError::config(
            cadence,
            field,
            format!("{day} is outside 1..={max}"),
        ));
    }
    Ok(day)
}

fn month_field(cadence: Cadence, field: &'static str, raw: &str) -> Result<Month> {
    parse_month(raw)
        .ok_or_else(|| ObligoError::config(cadence, field, format!("'{raw}' is not a month name")))
}

/// Check `raw` against the fields `cadence` requires and build the typed config.
pub fn validate(cadence: Cadence, raw: &RawFrequencyConfig) -> Result<FrequencyConfig> {
    let config = match cadence {
        Cadence::Hourly => {
            let interval = *required(cadence, "hourlyInterval", &raw.hourly_interval)?;
            if !(1..=24).contains(&interval) {
                return Err(ObligoError::config(
                    cadence,
                    "hourlyInterval",
                    format!("{interval} is outside 1..=24"),
                ));
            }
            FrequencyConfig::Hourly { interval }
        }
        Cadence::Daily => FrequencyConfig::Daily {
            time: time_field(cadence, "dailyTime", &raw.daily_time)?,
        },
        Cadence::Weekly => {
            let names = required(cadence, "weeklyDays", &raw.weekly_days)?;
            if names.is_empty() {
                return Err(ObligoError::config(cadence, "weeklyDays", "must name at least one day"));
            }
            let mut days = Vec::with_capacity(names.len());
            for name in names {
                let day = parse_weekday(name).ok_or_else(|| {
                    ObligoError::config(cadence, "weeklyDays", format!("'{name}' is not a weekday"))
                })?;
                if !days.contains(&day) {
                    days.push(day);
                }
            }
            days.sort_by_key(|d| d.num_days_from_monday());
            FrequencyConfig::Weekly {
                days,
                time: time_field(cadence, "weeklyTime", &raw.weekly_time)?,
            }
        }
        Cadence::Monthly => FrequencyConfig::Monthly {
            day: day_field(cadence, "monthlyDay", &raw.monthly_day, 31)?,
            time: time_field(cadence, "monthlyTime", &raw.monthly_time)?,
        },
        Cadence::Quarterly => {
            let names = required(cadence, "quarterlyMonths", &raw.quarterly_months)?;
            if names.len() != 4 {
                return Err(ObligoError::config(
                    cadence,
                    "quarterlyMonths",
                    format!("expected exactly 4 months, got {}", names.len()),
                ));
            }
            let mut months: Vec<Month> = Vec::with_capacity(4);
            for name in names {
                let month = month_field(cadence, "quarterlyMonths", name)?;
                if months.contains(&month) {
                    return Err(ObligoError::config(
                        cadence,
                        "quarterlyMonths",
                        format!("{} is listed more than once", month.name()),
                    ));
                }
                months.push(month);
            }
            months.sort_by_key(|m| m.number_from_month());
            FrequencyConfig::Quarterly {
                months,
                day: day_field(cadence, "quarterlyDay", &raw.quarterly_day, 31)?,
                time: time_field(cadence, "quarterlyTime", &raw.quarterly_time)?,
            }
        }
        Cadence::Yearly => {
            let name = required(cadence, "yearlyMonth", &raw.yearly_month)?;
            let month = month_field(cadence, "yearlyMonth", name)?;
            FrequencyConfig::Yearly {
                month,
                date: day_field(cadence, "yearlyDate", &raw.yearly_date, max_days_in(month))?,
                time: time_field(cadence, "yearlyTime", &raw.yearly_time)?,
            }
        }
        Cadence::OneTime => FrequencyConfig::OneTime,
        Cadence::None => FrequencyConfig::None,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn canonical_time(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|t| {
        TimeOfDay::parse(t)
            .map(|parsed| parsed.to_string())
            .unwrap_or_else(|| t.clone())
    })
}

fn canonical_month(value: &str) -> String {
    parse_month(value)
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| value.to_string())
}

fn canonical_weekday(value: &str) -> String {
    parse_weekday(value)
        .map(|d| weekday_name(d).to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Keep only the fields `cadence` reads, canonicalizing names and times that
/// parse. Fields that do not parse are kept verbatim so validation can still
/// report them.
pub fn normalize(cadence: Cadence, raw: &RawFrequencyConfig) -> RawFrequencyConfig {
    let mut out = RawFrequencyConfig::default();
    match cadence {
        Cadence::Hourly => out.hourly_interval = raw.hourly_interval,
        Cadence::Daily => out.daily_time = canonical_time(&raw.daily_time),
        Cadence::Weekly => {
            out.weekly_days = raw
                .weekly_days
                .as_ref()
                .map(|days| days.iter().map(|d| canonical_weekday(d)).collect());
            out.weekly_time = canonical_time(&raw.weekly_time);
        }
        Cadence::Monthly => {
            out.monthly_day = raw.monthly_day;
            out.monthly_time = canonical_time(&raw.monthly_time);
        }
        Cadence::Quarterly => {
            out.quarterly_months = raw
                .quarterly_months
                .as_ref()
                .map(|months| months.iter().map(|m| canonical_month(m)).collect());
            out.quarterly_day = raw.quarterly_day;
            out.quarterly_time = canonical_time(&raw.quarterly_time);
        }
        Cadence::Yearly => {
            out.yearly_month = raw.yearly_month.as_deref().map(canonical_month);
            out.yearly_date = raw.yearly_date;
            out.yearly_time = canonical_time(&raw.yearly_time);
        }
        Cadence::OneTime | Cadence::None => {}
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
