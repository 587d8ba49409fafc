//! Parsing and classification of the page's compact timestamps.
//!
//! The server prints deadlines as bare 8-digit MMDDHHMM strings and
//! submitted dates as 4-digit MMDD strings, zero-padded, with no year.
//! Parsing borrows the year from the moment of rendering; a deadline
//! viewed across a year boundary therefore lands in the wrong year.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::types::{TimeLeft, Urgency};

/// A compact timestamp that cannot be read
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StampError {
    #[error("expected {expected} digits, got {got}")]
    WrongLength { expected: usize, got: usize },

    #[error("not a digit string: {0:?}")]
    NotNumeric(String),

    #[error("no such calendar date: {0:?}")]
    OutOfRange(String),
}

/// Split a compact stamp into its zero-padded two-digit fields
fn digit_pairs(raw: &str, pairs: usize) -> Result<Vec<u32>, StampError> {
    let expected = pairs * 2;
    let got = raw.chars().count();
    if got != expected {
        return Err(StampError::WrongLength { expected, got });
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StampError::NotNumeric(raw.to_string()));
    }
    (0..pairs)
        .map(|i| raw[i * 2..i * 2 + 2].parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| StampError::NotNumeric(raw.to_string()))
}

/// Parse an MMDDHHMM stamp against the given calendar year.
pub fn parse_compact_stamp(raw: &str, year: i32) -> Result<NaiveDateTime, StampError> {
    let fields = digit_pairs(raw, 4)?;
    let (month, day, hour, minute) = (fields[0], fields[1], fields[2], fields[3]);
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .ok_or_else(|| StampError::OutOfRange(raw.to_string()))
}

/// "05081646" -> "05/08 16:46". None unless exactly 8 digits.
pub fn format_compact_stamp(raw: &str) -> Option<String> {
    digit_pairs(raw, 4).ok()?;
    Some(format!(
        "{}/{} {}:{}",
        &raw[0..2],
        &raw[2..4],
        &raw[4..6],
        &raw[6..8]
    ))
}

/// "0508" -> "05/08". None unless exactly 4 digits.
pub fn format_compact_date(raw: &str) -> Option<String> {
    digit_pairs(raw, 2).ok()?;
    Some(format!("{}/{}", &raw[0..2], &raw[2..4]))
}

/// Bucket the time remaining until a deadline
pub fn time_left(deadline: NaiveDateTime, now: NaiveDateTime) -> TimeLeft {
    let remaining = deadline - now;
    if remaining < Duration::zero() {
        return TimeLeft::Expired;
    }
    let hours = remaining.num_hours();
    if hours < 24 {
        TimeLeft::Hours(hours)
    } else {
        TimeLeft::Days {
            days: hours / 24,
            hours: hours % 24,
        }
    }
}

/// Classify how loudly a row should ask for attention.
///
/// Bucket boundaries are inclusive at the upper end: exactly 24 hours out
/// is still "today", exactly 72 hours out is still "soon". An expired
/// deadline with a submission on file is unremarkable, never "missed".
pub fn classify(deadline: NaiveDateTime, now: NaiveDateTime, submitted: bool) -> Urgency {
    let remaining = deadline - now;
    if remaining < Duration::zero() {
        if submitted {
            Urgency::Normal
        } else {
            Urgency::Missed
        }
    } else if remaining <= Duration::hours(24) {
        Urgency::Today
    } else if remaining <= Duration::hours(72) {
        Urgency::Soon
    } else {
        Urgency::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    // ========== parse_compact_stamp tests ==========

    #[test]
    fn test_parse_compact_stamp_valid() {
        let stamp = parse_compact_stamp("05081646", 2025).unwrap();
        assert_eq!(stamp, at(5, 8, 16, 46));
    }

    #[test]
    fn test_parse_compact_stamp_midnight() {
        let stamp = parse_compact_stamp("01010000", 2025).unwrap();
        assert_eq!(stamp, at(1, 1, 0, 0));
    }

    #[test]
    fn test_parse_compact_stamp_wrong_length() {
        assert_eq!(
            parse_compact_stamp("0508164", 2025),
            Err(StampError::WrongLength {
                expected: 8,
                got: 7
            })
        );
        assert_eq!(
            parse_compact_stamp("050816460", 2025),
            Err(StampError::WrongLength {
                expected: 8,
                got: 9
            })
        );
        assert_eq!(
            parse_compact_stamp("", 2025),
            Err(StampError::WrongLength {
                expected: 8,
                got: 0
            })
        );
    }

    #[test]
    fn test_parse_compact_stamp_not_numeric() {
        assert_eq!(
            parse_compact_stamp("05o81646", 2025),
            Err(StampError::NotNumeric("05o81646".to_string()))
        );
    }

    #[test]
    fn test_parse_compact_stamp_multibyte_counts_chars() {
        // Full-width digits are eight characters but not ASCII digits
        let raw = "０５０８１６４６";
        assert_eq!(
            parse_compact_stamp(raw, 2025),
            Err(StampError::NotNumeric(raw.to_string()))
        );
    }

    #[test]
    fn test_parse_compact_stamp_out_of_range() {
        assert_eq!(
            parse_compact_stamp("13011646", 2025),
            Err(StampError::OutOfRange("13011646".to_string()))
        );
        assert_eq!(
            parse_compact_stamp("02300000", 2025),
            Err(StampError::OutOfRange("02300000".to_string()))
        );
        assert_eq!(
            parse_compact_stamp("05082500", 2025),
            Err(StampError::OutOfRange("05082500".to_string()))
        );
    }

    #[test]
    fn test_parse_compact_stamp_uses_given_year() {
        let stamp = parse_compact_stamp("02290000", 2024).unwrap();
        assert_eq!(stamp.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        // Not a leap year
        assert!(parse_compact_stamp("02290000", 2025).is_err());
    }

    // ========== format tests ==========

    #[test]
    fn test_format_compact_stamp() {
        assert_eq!(
            format_compact_stamp("05081646"),
            Some("05/08 16:46".to_string())
        );
    }

    #[test]
    fn test_format_compact_stamp_rejects_other_lengths() {
        assert_eq!(format_compact_stamp(""), None);
        assert_eq!(format_compact_stamp("0508"), None);
        assert_eq!(format_compact_stamp("050816467"), None);
        assert_eq!(format_compact_stamp("未提出です"), None);
    }

    #[test]
    fn test_format_compact_date() {
        assert_eq!(format_compact_date("0508"), Some("05/08".to_string()));
        assert_eq!(format_compact_date(""), None);
        assert_eq!(format_compact_date("05081646"), None);
    }

    // ========== time_left tests ==========

    #[test]
    fn test_time_left_expired() {
        let now = at(5, 8, 12, 0);
        assert_eq!(time_left(at(5, 8, 11, 59), now), TimeLeft::Expired);
    }

    #[test]
    fn test_time_left_hours() {
        let now = at(5, 8, 12, 0);
        assert_eq!(time_left(at(5, 8, 15, 30), now), TimeLeft::Hours(3));
        assert_eq!(time_left(at(5, 8, 12, 30), now), TimeLeft::Hours(0));
    }

    #[test]
    fn test_time_left_days() {
        let now = at(5, 8, 12, 0);
        assert_eq!(
            time_left(at(5, 10, 17, 0), now),
            TimeLeft::Days { days: 2, hours: 5 }
        );
        assert_eq!(
            time_left(at(5, 9, 12, 0), now),
            TimeLeft::Days { days: 1, hours: 0 }
        );
    }

    #[test]
    fn test_time_left_due_this_instant() {
        let now = at(5, 8, 12, 0);
        assert_eq!(time_left(now, now), TimeLeft::Hours(0));
    }

    // ========== classify tests ==========

    #[test]
    fn test_classify_missed_only_when_unsubmitted() {
        let now = at(5, 8, 12, 0);
        let past = at(5, 7, 12, 0);
        assert_eq!(classify(past, now, false), Urgency::Missed);
        assert_eq!(classify(past, now, true), Urgency::Normal);
    }

    #[test]
    fn test_classify_today_inclusive_boundary() {
        let now = at(5, 8, 12, 0);
        assert_eq!(classify(at(5, 8, 18, 0), now, false), Urgency::Today);
        // Exactly 24 hours out is still today
        assert_eq!(classify(at(5, 9, 12, 0), now, false), Urgency::Today);
    }

    #[test]
    fn test_classify_soon_inclusive_boundary() {
        let now = at(5, 8, 12, 0);
        assert_eq!(classify(at(5, 9, 12, 1), now, false), Urgency::Soon);
        // Exactly 72 hours out is still soon
        assert_eq!(classify(at(5, 11, 12, 0), now, false), Urgency::Soon);
    }

    #[test]
    fn test_classify_normal_beyond_soon() {
        let now = at(5, 8, 12, 0);
        assert_eq!(classify(at(5, 11, 12, 1), now, false), Urgency::Normal);
        assert_eq!(classify(at(6, 1, 0, 0), now, false), Urgency::Normal);
    }

    #[test]
    fn test_classify_ignores_submission_for_future_deadlines() {
        let now = at(5, 8, 12, 0);
        assert_eq!(classify(at(5, 8, 18, 0), now, true), Urgency::Today);
    }
}
