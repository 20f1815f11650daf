use crate::error::{Result, SchedulerError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use obligo_core::types::Cadence;
use std::fmt;
use std::str::FromStr;

/// A civil-time fire expression bound to one cadence.
///
/// Expressions use the six-field `sec min hour day-of-month month
/// day-of-week` form of the `cron` crate and are evaluated in `timezone`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    pub cadence: Cadence,
    pub expression: &'static str,
    pub timezone: Tz,
}

pub const DEFAULT_TRIGGERS: [Trigger; 4] = [
    Trigger {
        cadence: Cadence::Daily,
        expression: "0 0 1 * * *",
        timezone: Tz::Asia__Kolkata,
    },
    Trigger {
        cadence: Cadence::Monthly,
        expression: "0 0 2 1 * *",
        timezone: Tz::Asia__Kolkata,
    },
    Trigger {
        cadence: Cadence::Quarterly,
        expression: "0 0 3 1 1,4,7,10 *",
        timezone: Tz::Asia__Kolkata,
    },
    Trigger {
        cadence: Cadence::Yearly,
        expression: "0 0 4 1 4 *",
        timezone: Tz::Asia__Kolkata,
    },
];

impl Trigger {
    pub fn for_cadence(cadence: Cadence) -> Result<&'static Trigger> {
        DEFAULT_TRIGGERS
            .iter()
            .find(|t| t.cadence == cadence)
            .ok_or(SchedulerError::NoTrigger(cadence))
    }

    pub fn schedule(&self) -> Result<Schedule> {
        Schedule::from_str(self.expression).map_err(|e| SchedulerError::InvalidExpression {
            cadence: self.cadence,
            expression: self.expression.to_string(),
            reason: e.to_string(),
        })
    }

    /// First fire instant strictly after `after`.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        Ok(next_fire(&self.schedule()?, self.timezone, after))
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.cadence, self.expression, self.timezone)
    }
}

pub(crate) fn next_fire(schedule: &Schedule, tz: Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(&tz))
        .next()
        .map(|t| t.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
