//! The HL7 timestamp grammar: `YYYY[MM[DD[HH[MM[SS[.s...]]]]]][+/-ZZZZ]`.
//!
//! A `Dtm` preserves its source text for lossless round-tripping; the
//! parsed components are validated with chrono and exposed through
//! [`Dtm::to_chrono`] for date arithmetic.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

use crate::Hl7ParseError;

/// How much of the grammar the source text carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DtmPrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Fraction,
}

/// A parsed HL7 timestamp (the `TS`/`DTM` data types).
#[derive(Debug, Clone, PartialEq)]
pub struct Dtm {
    text: String,
    precision: DtmPrecision,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    /// Sub-second fraction scaled to nanoseconds.
    nanosecond: u32,
    /// Offset east of UTC in minutes, when the text carried one.
    offset_minutes: Option<i32>,
}

fn grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?(?:\.(\d{1,4}))?([+-]\d{4})?$",
        )
        .unwrap()
    })
}

impl Dtm {
    pub fn parse(input: &str) -> Result<Dtm, Hl7ParseError> {
        let invalid = || Hl7ParseError::InvalidValue {
            datatype: "DTM",
            value: input.to_string(),
        };

        let captures = grammar().captures(input).ok_or_else(invalid)?;
        let group = |i: usize| captures.get(i).map(|m| m.as_str());
        let num = |i: usize| group(i).map(|s| s.parse::<u32>().unwrap_or(0));

        let year: i32 = group(1).ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        let month = num(2);
        let day = num(3);
        let hour = num(4);
        let minute = num(5);
        let second = num(6);
        let fraction = group(7);
        let offset = group(8);

        // The grammar nests: a day needs a month, an hour needs a day...
        let precision = if fraction.is_some() {
            DtmPrecision::Fraction
        } else if second.is_some() {
            DtmPrecision::Second
        } else if minute.is_some() {
            DtmPrecision::Minute
        } else if hour.is_some() {
            DtmPrecision::Hour
        } else if day.is_some() {
            DtmPrecision::Day
        } else if month.is_some() {
            DtmPrecision::Month
        } else {
            DtmPrecision::Year
        };

        let month = month.unwrap_or(1);
        let day = day.unwrap_or(1);
        let hour = hour.unwrap_or(0);
        let minute = minute.unwrap_or(0);
        let second = second.unwrap_or(0);

        // chrono does the calendar validation (leap years included)
        NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
        NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(invalid)?;

        let nanosecond = match fraction {
            Some(digits) => {
                let scale = 10u32.pow(9 - digits.len() as u32);
                digits.parse::<u32>().map_err(|_| invalid())? * scale
            }
            None => 0,
        };

        let offset_minutes = match offset {
            Some(text) => {
                let sign = if text.starts_with('-') { -1 } else { 1 };
                let hours: i32 = text[1..3].parse().map_err(|_| invalid())?;
                let minutes: i32 = text[3..5].parse().map_err(|_| invalid())?;
                if hours > 23 || minutes > 59 {
                    return Err(invalid());
                }
                Some(sign * (hours * 60 + minutes))
            }
            None => None,
        };

        Ok(Dtm {
            text: input.to_string(),
            precision,
            year,
            month,
            day,
            hour,
            minute,
            second,
            nanosecond,
            offset_minutes,
        })
    }

    /// The source text, unchanged.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn precision(&self) -> DtmPrecision {
        self.precision
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn offset_minutes(&self) -> Option<i32> {
        self.offset_minutes
    }

    /// The timestamp as a chrono value.  Positions the text did not carry
    /// default to their first instant (January, day 1, midnight); a
    /// missing offset defaults to UTC.
    pub fn to_chrono(&self) -> Option<DateTime<FixedOffset>> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?;
        let time = NaiveTime::from_hms_nano_opt(self.hour, self.minute, self.second, self.nanosecond)?;
        let naive = NaiveDateTime::new(date, time);
        let offset = FixedOffset::east_opt(self.offset_minutes.unwrap_or(0) * 60)?;
        offset.from_local_datetime(&naive).single()
    }
}

impl std::fmt::Display for Dtm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_every_precision() -> Result<(), Hl7ParseError> {
        assert_eq!(Dtm::parse("2023")?.precision(), DtmPrecision::Year);
        assert_eq!(Dtm::parse("202301")?.precision(), DtmPrecision::Month);
        assert_eq!(Dtm::parse("20230101")?.precision(), DtmPrecision::Day);
        assert_eq!(Dtm::parse("2023010112")?.precision(), DtmPrecision::Hour);
        assert_eq!(Dtm::parse("202301011230")?.precision(), DtmPrecision::Minute);
        assert_eq!(Dtm::parse("20230101123045")?.precision(), DtmPrecision::Second);
        assert_eq!(Dtm::parse("20230101123045.1234")?.precision(), DtmPrecision::Fraction);
        Ok(())
    }

    #[test]
    fn round_trips_source_text() -> Result<(), Hl7ParseError> {
        let inputs = ["2023", "20230101120000", "20230101120000.25", "20230101120000-0500"];
        for input in &inputs {
            assert_eq!(Dtm::parse(input)?.as_str(), *input);
        }
        Ok(())
    }

    #[test]
    fn timezone_offsets_are_parsed() -> Result<(), Hl7ParseError> {
        let dtm = Dtm::parse("20230101120000-0500")?;
        assert_eq!(dtm.offset_minutes(), Some(-300));
        let chrono = dtm.to_chrono().unwrap();
        assert_eq!(chrono.hour(), 12);
        assert_eq!(chrono.offset().local_minus_utc(), -300 * 60);
        Ok(())
    }

    #[test]
    fn fraction_scales_to_nanoseconds() -> Result<(), Hl7ParseError> {
        let dtm = Dtm::parse("20230101120000.5")?;
        assert_eq!(dtm.to_chrono().unwrap().nanosecond(), 500_000_000);
        Ok(())
    }

    #[test]
    fn calendar_violations_are_rejected() {
        for input in &["20231301", "20230230", "20230101250000", "20231338"] {
            assert!(Dtm::parse(input).is_err(), "{} should not parse", input);
        }
    }

    #[test]
    fn partial_dates_default_to_first_instant() -> Result<(), Hl7ParseError> {
        let chrono = Dtm::parse("2023")?.to_chrono().unwrap();
        assert_eq!(chrono.month(), 1);
        assert_eq!(chrono.day(), 1);
        assert_eq!(chrono.hour(), 0);
        Ok(())
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Dtm::parse("not a date").is_err());
        assert!(Dtm::parse("202").is_err());
        assert!(Dtm::parse("20230101+9999").is_err());
    }
}
