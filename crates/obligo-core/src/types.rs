use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    OneTime,
    None,
}

impl Cadence {
    pub fn all() -> &'static [Cadence] {
        &[
            Cadence::Hourly,
            Cadence::Daily,
            Cadence::Weekly,
            Cadence::Monthly,
            Cadence::Quarterly,
            Cadence::Yearly,
            Cadence::OneTime,
            Cadence::None,
        ]
    }

    /// The cadences that have a dedicated scheduled trigger, in run order.
    pub fn scheduled() -> &'static [Cadence] {
        &[
            Cadence::Daily,
            Cadence::Monthly,
            Cadence::Quarterly,
            Cadence::Yearly,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cadence::Hourly => "hourly",
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
            Cadence::Monthly => "monthly",
            Cadence::Quarterly => "quarterly",
            Cadence::Yearly => "yearly",
            Cadence::OneTime => "one_time",
            Cadence::None => "none",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Cadence {
    type Err = crate::error::ObligoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Cadence::Hourly),
            "daily" => Ok(Cadence::Daily),
            "weekly" => Ok(Cadence::Weekly),
            "monthly" => Ok(Cadence::Monthly),
            "quarterly" => Ok(Cadence::Quarterly),
            "yearly" | "annual" => Ok(Cadence::Yearly),
            "one_time" | "one-time" | "onetime" => Ok(Cadence::OneTime),
            "none" => Ok(Cadence::None),
            _ => Err(crate::error::ObligoError::InvalidCadence(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TimelineStatus
// ---------------------------------------------------------------------------

/// Progress of a materialized timeline. The engine only ever writes `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineStatus {
    #[default]
    Pending,
    Ongoing,
    Delayed,
    Completed,
}

impl TimelineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TimelineStatus::Pending => "pending",
            TimelineStatus::Ongoing => "ongoing",
            TimelineStatus::Delayed => "delayed",
            TimelineStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TimelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimelineStatus {
    type Err = crate::error::ObligoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TimelineStatus::Pending),
            "ongoing" => Ok(TimelineStatus::Ongoing),
            "delayed" => Ok(TimelineStatus::Delayed),
            "completed" => Ok(TimelineStatus::Completed),
            _ => Err(crate::error::ObligoError::InvalidStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_round_trips_through_str() {
        for c in Cadence::all() {
            assert_eq!(c.as_str().parse::<Cadence>().unwrap(), *c);
        }
    }

    #[test]
    fn cadence_accepts_legacy_spellings() {
        assert_eq!("Monthly".parse::<Cadence>().unwrap(), Cadence::Monthly);
        assert_eq!("One-Time".parse::<Cadence>().unwrap(), Cadence::OneTime);
        assert!("fortnightly".parse::<Cadence>().is_err());
    }

    #[test]
    fn scheduled_cadences_are_the_four_triggered_ones() {
        assert_eq!(Cadence::scheduled().len(), 4);
        assert!(!Cadence::scheduled().contains(&Cadence::Hourly));
    }
}
