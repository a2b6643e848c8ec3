//! Timestamp parsing and formatting for timed rating data.
//!
//! All timestamps are seconds since the Unix epoch, interpreted as UTC.

use crate::data::Timestamp;
use crate::error::TimeParseError;
use once_cell::sync::Lazy;
use regex::Regex;

// Compiled regexes for timestamp parsing
static EPOCH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());
static DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})[ T](\d{2}):(\d{2}):(\d{2})(?:Z)?$").unwrap()
});

const SECONDS_PER_DAY: i64 = 86_400;

/// Parse a timestamp string to epoch seconds.
///
/// Supported formats:
/// - Epoch seconds: "874724710"
/// - Date: "1997-09-20" (midnight UTC)
/// - Date and time: "1997-09-20 03:05:10" or "1997-09-20T03:05:10Z"
pub fn parse_timestamp(input: &str) -> Result<Timestamp, TimeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimeParseError::EmptyInput);
    }

    if EPOCH_REGEX.is_match(trimmed) {
        return trimmed
            .parse::<i64>()
            .map_err(|_| TimeParseError::InvalidFormat(trimmed.to_string()));
    }

    if let Some(captures) = DATETIME_REGEX.captures(trimmed) {
        let field = |i: usize| captures[i].parse::<u32>().unwrap_or(u32::MAX);
        let days = checked_days(field(1) as i64, field(2), field(3))?;
        let (hour, minute, second) = (field(4), field(5), field(6));
        if hour > 23 || minute > 59 || second > 59 {
            return Err(TimeParseError::InvalidTimeOfDay(hour, minute, second));
        }
        return Ok(days * SECONDS_PER_DAY + (hour * 3600 + minute * 60 + second) as i64);
    }

    if let Some(captures) = DATE_REGEX.captures(trimmed) {
        let field = |i: usize| captures[i].parse::<u32>().unwrap_or(u32::MAX);
        let days = checked_days(field(1) as i64, field(2), field(3))?;
        return Ok(days * SECONDS_PER_DAY);
    }

    Err(TimeParseError::InvalidFormat(trimmed.to_string()))
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn format_timestamp(time: Timestamp) -> String {
    let days = time.div_euclid(SECONDS_PER_DAY);
    let secs = time.rem_euclid(SECONDS_PER_DAY);
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn checked_days(year: i64, month: u32, day: u32) -> Result<i64, TimeParseError> {
    if !(1..=12).contains(&month) {
        return Err(TimeParseError::InvalidMonth(month));
    }
    if day == 0 || day > days_in_month(year, month) {
        return Err(TimeParseError::InvalidDay(day));
    }
    Ok(days_from_civil(year, month, day))
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = (month as i64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_formats() {
        assert_eq!(parse_timestamp("874724710"), Ok(874_724_710));
        assert_eq!(parse_timestamp(" 0 "), Ok(0));
        assert_eq!(parse_timestamp("1997-09-20 03:05:10"), Ok(874_724_710));
        assert_eq!(parse_timestamp("1997-09-20T03:05:10Z"), Ok(874_724_710));
        assert_eq!(parse_timestamp("1970-01-02"), Ok(86_400));
        assert_eq!(parse_timestamp("1969-12-31"), Ok(-86_400));
    }

    #[test]
    fn rejects_invalid_dates() {
        assert_eq!(parse_timestamp(""), Err(TimeParseError::EmptyInput));
        assert_eq!(parse_timestamp("2000-02-29"), Ok(951_782_400));
        assert_eq!(parse_timestamp("1999-02-29"), Err(TimeParseError::InvalidDay(29)));
        assert_eq!(parse_timestamp("1999-13-01"), Err(TimeParseError::InvalidMonth(13)));
        assert_eq!(
            parse_timestamp("1999-01-01 24:00:00"),
            Err(TimeParseError::InvalidTimeOfDay(24, 0, 0))
        );
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(TimeParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn formats_epoch_seconds() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(874_724_710), "1997-09-20 03:05:10");
        assert_eq!(format_timestamp(-1), "1969-12-31 23:59:59");
    }

    #[test]
    fn format_then_parse_is_identity_for_sample_times() {
        for t in [951_782_400, 1_234_567_890, -2_208_988_800] {
            assert_eq!(parse_timestamp(&format_timestamp(t)), Ok(t));
        }
    }
}
