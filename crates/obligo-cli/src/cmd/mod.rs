pub mod client;
pub mod due;
pub mod init;
pub mod obligation;
pub mod period;
pub mod run;
pub mod serve;
pub mod timeline;

use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a civil date-time argument. A bare date means midnight.
pub fn parse_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN));
    }
    anyhow::bail!("invalid date-time '{s}': expected YYYY-MM-DD[THH:MM[:SS]]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 3)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-07-03T10:30").unwrap(), expected);
        assert_eq!(parse_datetime("2024-07-03 10:30:00").unwrap(), expected);
        assert_eq!(
            parse_datetime("2024-07-03").unwrap().to_string(),
            "2024-07-03 00:00:00"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("July 3rd").is_err());
        assert!(parse_datetime("2024-02-30").is_err());
    }
}
