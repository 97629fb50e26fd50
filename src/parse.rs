use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::errors::{self, Error};
use crate::relative;
use crate::zone::{self, Zone};

/// Local date-times without an offset, tried in order
const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

/// Date-times that carry their own UTC offset
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Parse an expression into an instant, expressed in `zone`.
///
/// Naive and relative expressions are read as wall-clock time in `zone`,
/// relative ones counted from `now`. An offset or zone name inside the
/// expression decides the instant, but the result is always shown in `zone`.
pub fn resolve(expression: &str, zone: Zone, now: DateTime<Utc>) -> Result<DateTime<Zone>, Error> {
    let expression = expression.trim();

    if expression.is_empty() {
        return Ok(now.with_timezone(&zone));
    }

    if let Some(seconds) = expression.strip_prefix('@') {
        return timestamp(seconds)
            .map(|instant| instant.with_timezone(&zone))
            .ok_or_else(|| errors::parse(expression));
    }

    if let Some(datetime) = with_offset(expression) {
        return Ok(datetime.with_timezone(&zone));
    }

    if let Some((rest, named)) = trailing_zone(expression) {
        return resolve(rest, named.into(), now).map(|datetime| datetime.with_timezone(&zone));
    }

    if let Some(naive) = naive(expression) {
        return zone::localize(zone, &naive);
    }

    relative::resolve(expression, &now.with_timezone(&zone))
}

/// "1367186296" or "1367186296.123456"
fn timestamp(seconds: &str) -> Option<DateTime<Utc>> {
    let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
    let negative = whole.starts_with('-');
    let whole = whole.parse::<i64>().ok()?;
    let nanos = if fraction.is_empty() {
        0
    } else {
        if fraction.len() > 9 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        format!("{fraction:0<9}").parse::<u32>().ok()?
    };

    // A negative timestamp's fraction still points further into the past
    if negative && nanos > 0 {
        DateTime::from_timestamp(whole.checked_sub(1)?, 1_000_000_000 - nanos)
    } else {
        DateTime::from_timestamp(whole, nanos)
    }
}

fn with_offset(expression: &str) -> Option<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_rfc3339(expression).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(expression, format).ok())
    })
}

/// "2009-09-09 09:09:09 Europe/Paris" splits into the date and the zone
fn trailing_zone(expression: &str) -> Option<(&str, Tz)> {
    let (rest, name) = expression.rsplit_once(char::is_whitespace)?;
    if !(name.contains('/') || name.eq_ignore_ascii_case("utc")) {
        return None;
    }
    let named = name.parse::<Tz>().ok()?;
    Some((rest.trim_end(), named))
}

fn naive(expression: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(expression, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(expression, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 10, 0, 0).unwrap()
    }

    fn local(expression: &str, tz: Tz) -> String {
        resolve(expression, tz.into(), now())
            .unwrap()
            .format("%Y-%m-%d %H:%M:%S%.f %:z")
            .to_string()
    }

    #[test]
    fn naive_strings_are_wall_clock_in_zone() {
        assert_eq!(
            local("2009-09-09 09:09:09", Tz::America__Toronto),
            "2009-09-09 09:09:09 -04:00"
        );
        assert_eq!(
            local("2009-09-09T09:09", Tz::Europe__Paris),
            "2009-09-09 09:09:00 +02:00"
        );
        assert_eq!(
            local("2009-09-09", Tz::Asia__Tokyo),
            "2009-09-09 00:00:00 +09:00"
        );
    }

    #[test]
    fn sub_seconds_survive() {
        let datetime = resolve("2009-09-09 09:09:09.123456", Tz::UTC.into(), now()).unwrap();
        assert_eq!(datetime.nanosecond(), 123_456_000);
    }

    #[test]
    fn offsets_decide_the_instant_and_zone_decides_the_display() {
        assert_eq!(
            local("2009-09-09T09:09:09+09:00", Tz::Europe__Paris),
            "2009-09-09 02:09:09 +02:00"
        );
        assert_eq!(
            local("2009-09-09 09:09:09 +0000", Tz::America__Toronto),
            "2009-09-09 05:09:09 -04:00"
        );
    }

    #[test]
    fn trailing_zone_names_decide_the_instant() {
        let datetime = resolve("2009-09-09 09:09:09 Asia/Tokyo", Tz::Europe__Paris.into(), now()).unwrap();
        assert_eq!(datetime.timezone(), Zone::Named(Tz::Europe__Paris));
        assert_eq!(
            datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2009-09-09 02:09:09"
        );
    }

    #[test]
    fn timestamps() {
        assert_eq!(local("@1367186296", Tz::UTC), "2013-04-28 21:58:16 +00:00");
        assert_eq!(local("@0.5", Tz::UTC), "1970-01-01 00:00:00.500 +00:00");
        assert_eq!(local("@-1.25", Tz::UTC), "1969-12-31 23:59:58.750 +00:00");
        assert_eq!(local("@-0.5", Tz::UTC), "1969-12-31 23:59:59.500 +00:00");
        assert!(resolve("@soon", Tz::UTC.into(), now()).unwrap_err().is_parse());
    }

    #[test]
    fn timestamps_beyond_the_calendar_fail() {
        for expression in [
            "@-9223372036854775808.5",
            "@-9223372036854775808",
            "@9223372036854775807",
            "@99999999999999999999",
            "@1.1234567891",
            "@1.-5",
            "@",
        ] {
            assert!(
                resolve(expression, Tz::UTC.into(), now()).unwrap_err().is_parse(),
                "{expression} should not parse"
            );
        }
    }

    #[test]
    fn empty_and_now_are_the_reference_instant() {
        assert_eq!(resolve("", Tz::UTC.into(), now()).unwrap(), now());
        assert_eq!(resolve("now", Tz::Asia__Tokyo.into(), now()).unwrap(), now());
    }

    #[test]
    fn fixed_offset_zones_show_the_instant() {
        let zone = zone::resolve("+05:30").unwrap();
        let datetime = resolve("2009-09-09 09:09:09 Asia/Tokyo", zone, now()).unwrap();
        assert_eq!(
            datetime.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
            "2009-09-09 05:39:09 +05:30"
        );
    }

    #[test]
    fn falls_back_to_relative_expressions() {
        assert_eq!(
            local("first day of January 2008", Tz::America__Toronto),
            "2008-01-01 00:00:00 -05:00"
        );
    }

    #[test]
    fn unparseable_strings_fail() {
        let error = resolve("not a date", Tz::UTC.into(), now()).unwrap_err();
        assert!(error.is_parse());
        assert!(resolve("2009-13-45 09:09:09", Tz::UTC.into(), now())
            .unwrap_err()
            .is_parse());
    }
}
