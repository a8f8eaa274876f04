//! Normalizes the calendar's date/time phrases.
//!
//! The detail pages state dates as `"Donnerstag, 26.7.2018, 21.30 - 23.30 Uhr"`,
//! `"Donnerstag, 26.7.2018, 21.30 Uhr"` or just `"Donnerstag, 26.7.2018,"`.
//! The weekday is ignored.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::base::strip;
use super::ExtractError;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").expect("valid date regex"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\.(\d{2})$").expect("valid time regex"));

/// Separator between two alternative times on the same day ("14.00 u. 16.00").
const ALTERNATIVE_SEPARATOR: &str = " u. ";
const ISO_DATE: &str = "%Y-%m-%d";
const ISO_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    AllDay(NaiveDate),
    Timed {
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
    },
}

impl Schedule {
    pub fn start_iso(&self) -> String {
        match self {
            Schedule::AllDay(date) => date.format(ISO_DATE).to_string(),
            Schedule::Timed { start, .. } => start.format(ISO_DATE_TIME).to_string(),
        }
    }

    /// Empty when no end time was stated.
    pub fn end_iso(&self) -> String {
        match self {
            Schedule::Timed { end: Some(end), .. } => end.format(ISO_DATE_TIME).to_string(),
            _ => String::new(),
        }
    }
}

/// Parses a raw phrase into `(start, end)` ISO strings; `end` is empty when absent.
pub fn normalize(raw: &str) -> Result<(String, String), ExtractError> {
    let schedule = parse_schedule(raw)?;
    Ok((schedule.start_iso(), schedule.end_iso()))
}

pub fn parse_schedule(raw: &str) -> Result<Schedule, ExtractError> {
    let malformed = || ExtractError::MalformedDateTime {
        raw: raw.to_string(),
    };

    let mut segments = raw.split(',').skip(1);
    let date_text = segments.next().map(strip).ok_or_else(malformed)?;
    let date = parse_date(date_text).ok_or_else(malformed)?;

    let time_text = segments
        .next()
        .map(|segment| segment.replace("Uhr", ""))
        .unwrap_or_default();
    let mut range = time_text.split('-');
    let start_text = range.next().map(first_alternative).unwrap_or("");
    let end_text = range.next().map(first_alternative).unwrap_or("");

    match (start_text.is_empty(), end_text.is_empty()) {
        (true, true) => Ok(Schedule::AllDay(date)),
        (true, false) => Err(malformed()),
        (false, _) => {
            let start = parse_time(start_text).ok_or_else(malformed)?;
            let end = if end_text.is_empty() {
                None
            } else {
                Some(parse_time(end_text).ok_or_else(malformed)?)
            };
            Ok(Schedule::Timed {
                start: date.and_time(start),
                end: end.map(|time| date.and_time(time)),
            })
        }
    }
}

// Second alternative is dropped until events can carry several start times.
fn first_alternative(token: &str) -> &str {
    let token = strip(token);
    match token.split_once(ALTERNATIVE_SEPARATOR) {
        Some((first, _)) => strip(first),
        None => token,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(text)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(text)?;
    let hour = caps[1].parse().ok()?;
    let minute = caps[2].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(raw: &str) -> (String, String) {
        normalize(raw).expect("well-formed phrase")
    }

    #[test]
    fn date_without_time_is_all_day() {
        assert_eq!(
            pair("Donnerstag, 26.7.2018,"),
            ("2018-07-26".to_string(), String::new())
        );
        assert_eq!(
            pair("Donnerstag, 26.7.2018"),
            ("2018-07-26".to_string(), String::new())
        );
    }

    #[test]
    fn single_start_time() {
        assert_eq!(
            pair("Donnerstag, 26.7.2018, 21.30 Uhr"),
            ("2018-07-26T21:30:00".to_string(), String::new())
        );
    }

    #[test]
    fn time_range() {
        assert_eq!(
            pair("Donnerstag, 26.7.2018, 21.30 - 23.30 Uhr"),
            (
                "2018-07-26T21:30:00".to_string(),
                "2018-07-26T23:30:00".to_string()
            )
        );
    }

    #[test]
    fn keeps_first_of_two_alternative_times() {
        assert_eq!(
            pair("Donnerstag, 26.7.2018, 14.00 u. 16.00 Uhr"),
            ("2018-07-26T14:00:00".to_string(), String::new())
        );
        assert_eq!(
            pair("Samstag, 4.8.2018, 10.00 - 12.00 u. 14.00 Uhr"),
            (
                "2018-08-04T10:00:00".to_string(),
                "2018-08-04T12:00:00".to_string()
            )
        );
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert_eq!(
            pair("Freitag,\n\t 3.8.2018 ,\r\n 9.05-\t10.15 Uhr \n"),
            (
                "2018-08-03T09:05:00".to_string(),
                "2018-08-03T10:15:00".to_string()
            )
        );
    }

    #[test]
    fn schedule_keeps_typed_values() {
        let schedule = parse_schedule("Montag, 31.12.2018, 23.00 Uhr").expect("parse");
        let date = NaiveDate::from_ymd_opt(2018, 12, 31).expect("date");
        assert_eq!(
            schedule,
            Schedule::Timed {
                start: date.and_hms_opt(23, 0, 0).expect("time"),
                end: None,
            }
        );
    }

    #[test]
    fn rejects_malformed_phrases() {
        for raw in [
            "Donnerstag",
            "",
            "Donnerstag, ,",
            "Donnerstag, 26-7-2018,",
            "Donnerstag, 31.2.2018,",
            "Donnerstag, 26.7.2018, abends",
            "Donnerstag, 26.7.2018, 21:30 Uhr",
            "Donnerstag, 26.7.2018, 25.00 Uhr",
            "Donnerstag, 26.7.2018, 21.30 - spät Uhr",
            "Donnerstag, 26.7.2018, - 23.30 Uhr",
        ] {
            match normalize(raw) {
                Err(ExtractError::MalformedDateTime { raw: reported }) => assert_eq!(reported, raw),
                other => panic!("expected malformed error for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn normalizing_twice_gives_the_same_result() {
        let raw = "Donnerstag, 26.7.2018, 21.30 - 23.30 Uhr";
        assert_eq!(normalize(raw).ok(), normalize(raw).ok());
    }
}
