use std::fmt::{self, Display, Formatter};

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone,
};
use chrono_tz::{OffsetComponents, Tz, TzOffset};

use crate::errors::{self, Error};

/// The zone a moment is shown in: a zone from the database, or a bare UTC offset
/// such as "+05:30" that no named zone matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    Named(Tz),
    Fixed(FixedOffset),
}

/// The offset in effect for a [`Zone`] at some instant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneOffset {
    Named(TzOffset),
    Fixed(FixedOffset),
}

impl Zone {
    /// "America/Toronto" for named zones, "+05:30" for fixed offsets
    pub fn name(&self) -> String {
        match self {
            Zone::Named(tz) => tz.name().to_string(),
            Zone::Fixed(offset) => offset.to_string(),
        }
    }
}

impl Display for Zone {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<Tz> for Zone {
    fn from(tz: Tz) -> Self {
        Zone::Named(tz)
    }
}

impl From<FixedOffset> for Zone {
    fn from(offset: FixedOffset) -> Self {
        Zone::Fixed(offset)
    }
}

impl Offset for ZoneOffset {
    fn fix(&self) -> FixedOffset {
        match self {
            ZoneOffset::Named(offset) => offset.fix(),
            ZoneOffset::Fixed(offset) => *offset,
        }
    }
}

// Shown by the %Z specifier: "EDT" for named zones, "+05:30" otherwise
impl Display for ZoneOffset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ZoneOffset::Named(offset) => Display::fmt(offset, f),
            ZoneOffset::Fixed(offset) => Display::fmt(offset, f),
        }
    }
}

impl TimeZone for Zone {
    type Offset = ZoneOffset;

    fn from_offset(offset: &ZoneOffset) -> Self {
        match offset {
            ZoneOffset::Named(offset) => Zone::Named(Tz::from_offset(offset)),
            ZoneOffset::Fixed(offset) => Zone::Fixed(*offset),
        }
    }

    #[allow(deprecated)]
    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<ZoneOffset> {
        match self {
            Zone::Named(tz) => tz.offset_from_local_date(local).map(ZoneOffset::Named),
            Zone::Fixed(offset) => offset.offset_from_local_date(local).map(ZoneOffset::Fixed),
        }
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<ZoneOffset> {
        match self {
            Zone::Named(tz) => tz.offset_from_local_datetime(local).map(ZoneOffset::Named),
            Zone::Fixed(offset) => offset
                .offset_from_local_datetime(local)
                .map(ZoneOffset::Fixed),
        }
    }

    #[allow(deprecated)]
    fn offset_from_utc_date(&self, utc: &NaiveDate) -> ZoneOffset {
        match self {
            Zone::Named(tz) => ZoneOffset::Named(tz.offset_from_utc_date(utc)),
            Zone::Fixed(offset) => ZoneOffset::Fixed(offset.offset_from_utc_date(utc)),
        }
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> ZoneOffset {
        match self {
            Zone::Named(tz) => ZoneOffset::Named(tz.offset_from_utc_datetime(utc)),
            Zone::Fixed(offset) => ZoneOffset::Fixed(offset.offset_from_utc_datetime(utc)),
        }
    }
}

/// Anything that can name a timezone: an identifier or an already resolved zone
pub trait ToZone {
    fn to_zone(&self) -> Result<Zone, Error>;
}

impl ToZone for Zone {
    fn to_zone(&self) -> Result<Zone, Error> {
        Ok(*self)
    }
}

impl ToZone for &Zone {
    fn to_zone(&self) -> Result<Zone, Error> {
        Ok(**self)
    }
}

impl ToZone for Tz {
    fn to_zone(&self) -> Result<Zone, Error> {
        Ok(Zone::Named(*self))
    }
}

impl ToZone for &Tz {
    fn to_zone(&self) -> Result<Zone, Error> {
        Ok(Zone::Named(**self))
    }
}

impl ToZone for FixedOffset {
    fn to_zone(&self) -> Result<Zone, Error> {
        Ok(Zone::Fixed(*self))
    }
}

impl ToZone for &str {
    fn to_zone(&self) -> Result<Zone, Error> {
        resolve(self)
    }
}

impl ToZone for String {
    fn to_zone(&self) -> Result<Zone, Error> {
        resolve(self)
    }
}

impl ToZone for &String {
    fn to_zone(&self) -> Result<Zone, Error> {
        resolve(self)
    }
}

/// Resolve a zone identifier such as "Europe/Paris", or an offset like "GMT -7:00"
pub fn resolve(name: &str) -> Result<Zone, Error> {
    let name = name.trim();
    match name.parse::<Tz>() {
        Ok(tz) => Ok(Zone::Named(tz)),
        Err(_) => parse_gmt_to_timezone(name),
    }
}

/// Resolve an optional zone name, falling back to UTC when none is configured
pub fn resolve_or_utc(name: &Option<String>) -> Result<Zone, Error> {
    match name {
        None => Ok(Zone::Named(Tz::UTC)),
        Some(name) => resolve(name),
    }
}

/// For offsets like "GMT -7:00", "+05:30" or "-05"
fn parse_gmt_to_timezone(gmt: &str) -> Result<Zone, Error> {
    let offset = gmt
        .strip_prefix("GMT")
        .or_else(|| gmt.strip_prefix("UTC"))
        .unwrap_or(gmt)
        .trim();

    let (sign, rest) = match offset.chars().next() {
        Some('+') => (1, &offset[1..]),
        Some('-') => (-1, &offset[1..]),
        _ => return Err(errors::invalid_timezone(gmt)),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((hours, minutes)) => (hours, minutes),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => (rest, "00"),
    };
    if !is_digits(hours, 1..=2) || !is_digits(minutes, 2..=2) {
        return Err(errors::invalid_timezone(gmt));
    }

    let hours = hours
        .parse::<i32>()
        .map_err(|_| errors::invalid_timezone(gmt))?;
    let minutes = minutes
        .parse::<i32>()
        .map_err(|_| errors::invalid_timezone(gmt))?;
    if hours > 14 || minutes >= 60 {
        return Err(errors::invalid_timezone(gmt));
    }

    from_offset_seconds(sign * (hours * 3600 + minutes * 60))
        .map_err(|_| errors::invalid_timezone(gmt))
}

fn is_digits(field: &str, length: std::ops::RangeInclusive<usize>) -> bool {
    length.contains(&field.len()) && field.bytes().all(|byte| byte.is_ascii_digit())
}

/// The zone for an offset east of UTC. Whole hours map to the matching
/// Etc/GMT zone, anything else stays a fixed offset.
pub fn from_offset_seconds(seconds: i32) -> Result<Zone, Error> {
    if seconds % 3600 == 0 {
        let hours = seconds / 3600;
        // Etc/GMT names have the sign inverted
        let tz_string = match hours {
            0 => String::from("Etc/GMT"),
            _ => format!("Etc/GMT{}{}", if hours < 0 { "+" } else { "-" }, hours.abs()),
        };
        if let Ok(tz) = tz_string.parse::<Tz>() {
            return Ok(Zone::Named(tz));
        }
    }

    FixedOffset::east_opt(seconds)
        .map(Zone::Fixed)
        .ok_or_else(|| errors::invalid_timezone(&format!("offset of {seconds} seconds")))
}

/// Turn wall-clock fields in a zone into an instant.
///
/// An ambiguous time during a fall-back transition takes the earlier instant.
/// A time skipped by a spring-forward transition is moved forward by the gap.
pub fn localize(zone: Zone, naive: &NaiveDateTime) -> Result<DateTime<Zone>, Error> {
    match zone.from_local_datetime(naive) {
        LocalResult::Single(datetime) => Ok(datetime),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => {
            let gap = gap_seconds(zone, naive)
                .filter(|gap| *gap > 0)
                .ok_or_else(|| errors::out_of_range(&format!("local time {naive}")))?;
            let shifted = *naive + Duration::seconds(i64::from(gap));
            zone.from_local_datetime(&shifted)
                .earliest()
                .ok_or_else(|| errors::out_of_range(&format!("local time {naive}")))
        }
    }
}

/// How far the clocks jumped around `naive`, from the offsets a day either side
fn gap_seconds(zone: Zone, naive: &NaiveDateTime) -> Option<i32> {
    let day = Duration::try_days(1)?;
    let before = zone
        .from_local_datetime(&naive.checked_sub_signed(day)?)
        .earliest()?;
    let after = zone
        .from_local_datetime(&naive.checked_add_signed(day)?)
        .latest()?;
    Some(offset_seconds(&after) - offset_seconds(&before))
}

pub fn offset_seconds(datetime: &DateTime<Zone>) -> i32 {
    datetime.offset().fix().local_minus_utc()
}

/// Whole hours east of UTC, truncated
pub fn offset_hours(datetime: &DateTime<Zone>) -> i32 {
    offset_seconds(datetime) / 3600
}

/// Fixed offsets never observe daylight saving time
pub fn is_dst(datetime: &DateTime<Zone>) -> bool {
    match datetime.offset() {
        ZoneOffset::Named(offset) => offset.dst_offset() != Duration::zero(),
        ZoneOffset::Fixed(_) => false,
    }
}
