//! Rendering moments as text.
//!
//! [`letters`] accepts the classic one-letter date patterns (`"Y-m-d H:i:s e"`)
//! and rewrites them as chrono strftime items. Values chrono has no specifier
//! for, such as the zone identifier or the DST flag, are spliced in as literals.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, NaiveDate};

use crate::errors::{self, Error};
use crate::zone::{self, Zone};

pub const DATE_TIME: &str = "Y-m-d H:i:s";
pub const DATE: &str = "Y-m-d";

/// Format with one-letter date pattern characters. A backslash escapes the next character.
pub fn letters(datetime: &DateTime<Zone>, pattern: &str) -> String {
    let strftime = translate(datetime, pattern);
    datetime.format(&strftime).to_string()
}

/// Format with a chrono strftime pattern, rejecting unknown specifiers
pub fn strftime(datetime: &DateTime<Zone>, pattern: &str) -> Result<String, Error> {
    let items = StrftimeItems::new(pattern).collect::<Vec<Item>>();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(errors::new(
            errors::ErrorKind::Parse,
            "format",
            &format!("Invalid strftime pattern: {pattern:?}"),
        ));
    }

    Ok(datetime.format_with_items(items.iter()).to_string())
}

fn translate(datetime: &DateTime<Zone>, pattern: &str) -> String {
    let mut strftime = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars();

    while let Some(letter) = chars.next() {
        match letter {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    push_literal(&mut strftime, &escaped.to_string());
                }
            }
            // Day
            'd' => strftime.push_str("%d"),
            'D' => strftime.push_str("%a"),
            'j' => strftime.push_str("%-d"),
            'l' => strftime.push_str("%A"),
            'N' => strftime.push_str("%u"),
            'S' => push_literal(&mut strftime, ordinal_suffix(datetime.day())),
            'w' => strftime.push_str("%w"),
            'z' => push_literal(&mut strftime, &datetime.ordinal0().to_string()),
            // Week
            'W' => strftime.push_str("%V"),
            // Month
            'F' => strftime.push_str("%B"),
            'm' => strftime.push_str("%m"),
            'M' => strftime.push_str("%b"),
            'n' => strftime.push_str("%-m"),
            't' => push_literal(&mut strftime, &days_in_month(datetime).to_string()),
            // Year
            'L' => push_literal(&mut strftime, if is_leap_year(datetime) { "1" } else { "0" }),
            'o' => strftime.push_str("%G"),
            'Y' => strftime.push_str("%Y"),
            'y' => strftime.push_str("%y"),
            // Time
            'a' => strftime.push_str("%P"),
            'A' => strftime.push_str("%p"),
            'g' => strftime.push_str("%-I"),
            'G' => strftime.push_str("%-H"),
            'h' => strftime.push_str("%I"),
            'H' => strftime.push_str("%H"),
            'i' => strftime.push_str("%M"),
            's' => strftime.push_str("%S"),
            'u' => strftime.push_str("%6f"),
            'v' => strftime.push_str("%3f"),
            // Timezone
            'e' => push_literal(&mut strftime, &datetime.timezone().name()),
            'I' => push_literal(&mut strftime, if zone::is_dst(datetime) { "1" } else { "0" }),
            'O' => strftime.push_str("%z"),
            'P' => strftime.push_str("%:z"),
            'T' => strftime.push_str("%Z"),
            'Z' => push_literal(&mut strftime, &zone::offset_seconds(datetime).to_string()),
            // Full date/time
            'c' => strftime.push_str("%Y-%m-%dT%H:%M:%S%:z"),
            'r' => strftime.push_str("%a, %d %b %Y %H:%M:%S %z"),
            'U' => strftime.push_str("%s"),
            other => push_literal(&mut strftime, &other.to_string()),
        }
    }

    strftime
}

fn push_literal(strftime: &mut String, literal: &str) {
    strftime.push_str(&literal.replace('%', "%%"));
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn days_in_month(datetime: &DateTime<Zone>) -> u32 {
    let (year, month) = match datetime.month() {
        12 => (datetime.year() + 1, 1),
        month => (datetime.year(), month + 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

fn is_leap_year(datetime: &DateTime<Zone>) -> bool {
    NaiveDate::from_ymd_opt(datetime.year(), 2, 29).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone, Timelike};
    use chrono_tz::Tz;
    use pretty_assertions::assert_eq;

    fn toronto() -> DateTime<Zone> {
        Zone::Named(Tz::America__Toronto)
            .with_ymd_and_hms(2009, 9, 9, 9, 9, 9)
            .unwrap()
    }

    #[test]
    fn formats_date_time_with_zone_name() {
        assert_eq!(
            letters(&toronto(), "Y-m-d H:i:s e"),
            "2009-09-09 09:09:09 America/Toronto"
        );
    }

    #[test]
    fn formats_long_names() {
        let datetime = Zone::Named(Tz::UTC).timestamp_opt(1367186296, 0).unwrap();
        assert_eq!(
            letters(&datetime, "l j F Y H:i:s"),
            "Sunday 28 April 2013 21:58:16"
        );
        assert_eq!(letters(&datetime, "D, M jS y"), "Sun, Apr 28th 13");
        assert_eq!(letters(&datetime, "U"), "1367186296");
    }

    #[test]
    fn formats_zone_details() {
        let datetime = toronto();
        assert_eq!(letters(&datetime, "O P T I Z"), "-0400 -04:00 EDT 1 -14400");
        assert_eq!(letters(&datetime, "c"), "2009-09-09T09:09:09-04:00");
    }

    #[test]
    fn formats_fixed_offset_zones() {
        let zone = Zone::Fixed(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap());
        let datetime = zone.with_ymd_and_hms(2009, 9, 9, 9, 9, 9).unwrap();
        assert_eq!(
            letters(&datetime, "Y-m-d H:i:s e I Z"),
            "2009-09-09 09:09:09 +05:30 0 19800"
        );
    }

    #[test]
    fn formats_calendar_details() {
        let datetime = Zone::Named(Tz::UTC).with_ymd_and_hms(2024, 2, 3, 15, 4, 5).unwrap();
        assert_eq!(letters(&datetime, "t L z N w"), "29 1 33 6 6");
        assert_eq!(letters(&datetime, "g:i a, G:i A, h"), "3:04 pm, 15:04 PM, 03");
        assert_eq!(letters(&datetime, "n/j"), "2/3");
    }

    #[test]
    fn formats_sub_seconds() {
        let datetime = Zone::Named(Tz::UTC)
            .with_ymd_and_hms(2024, 2, 3, 15, 4, 5)
            .unwrap()
            .with_nanosecond(123_456_000)
            .unwrap();
        assert_eq!(letters(&datetime, "s.u s.v"), "05.123456 05.123");
    }

    #[test]
    fn escapes_and_percent_signs_are_literal() {
        assert_eq!(letters(&toronto(), "\\Y\\e\\s: Y 100%"), "Yes: 2009 100%");
    }

    #[test]
    fn ordinal_suffixes() {
        let suffixes = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 31]
            .iter()
            .map(|day| ordinal_suffix(*day))
            .collect::<Vec<&str>>();
        assert_eq!(
            suffixes,
            vec!["st", "nd", "rd", "th", "th", "th", "th", "st", "nd", "rd", "st"]
        );
    }

    #[test]
    fn strftime_passes_through_and_rejects_garbage() {
        assert_eq!(
            strftime(&toronto(), "%Y-%m-%d %H:%M:%S %Z").unwrap(),
            "2009-09-09 09:09:09 EDT"
        );
        assert!(strftime(&toronto(), "%Q").unwrap_err().is_parse());
    }
}
