//! Timestamp text format.
//!
//! Normalized tables always carry `YYYY-MM-DD HH:MM:SS`. Parsing is more
//! forgiving since the raw demo export mixes US-style dates with ISO ones.

use chrono::{NaiveDate, NaiveDateTime};

pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse any accepted timestamp form. Empty or unrecognised text is `None`.
pub fn parse(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn format(ts: &NaiveDateTime) -> String {
    ts.format(FORMAT).to_string()
}

/// serde adapter for `Option<NaiveDateTime>` columns
pub mod option {
    use chrono::NaiveDateTime;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&super::format(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text: Option<String> = Option::deserialize(deserializer)?;
        match text.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => super::parse(text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_canonical() {
        let ts = parse("2017-09-28 20:11:05").unwrap();
        assert_eq!(format(&ts), "2017-09-28 20:11:05");
    }

    #[test]
    fn test_parse_us_twelve_hour() {
        let ts = parse("09/28/2017 8:11 PM").unwrap();
        assert_eq!((ts.month(), ts.day(), ts.hour(), ts.minute()), (9, 28, 20, 11));

        let ts = parse("03/04/2018 09:05:30 AM").unwrap();
        assert_eq!(format(&ts), "2018-03-04 09:05:30");
    }

    #[test]
    fn test_parse_iso_t_separator() {
        let ts = parse("2018-03-04T21:05:00").unwrap();
        assert_eq!(format(&ts), "2018-03-04 21:05:00");
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        let ts = parse("2018-03-04").unwrap();
        assert_eq!(format(&ts), "2018-03-04 00:00:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("yesterday"), None);
    }
}
