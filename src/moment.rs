use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, Offset, Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::{self, Error};
use crate::zone::{self, ToZone, Zone};
use crate::{clock, format, parse, relative};

/// An instant paired with the zone it is displayed in.
///
/// A `Moment` never changes once built. Everything that looks like a
/// modification (`with_timezone`, `add_days`, `start_of_day`, ...) returns a new one.
/// Equality, ordering and hashing only look at the instant, never the zone.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawMoment", into = "RawMoment")]
pub struct Moment {
    datetime: DateTime<Zone>,
}

/// The serialized shape of a moment
#[derive(Serialize, Deserialize)]
struct RawMoment {
    date: String,
    timezone: String,
}

/// Date values a moment can be built from
pub trait DateLike {
    fn instant(&self) -> DateTime<Utc>;
    fn zone(&self) -> Result<Zone, Error>;
}

impl DateLike for DateTime<Tz> {
    fn instant(&self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }

    fn zone(&self) -> Result<Zone, Error> {
        Ok(Zone::Named(self.timezone()))
    }
}

impl DateLike for DateTime<Zone> {
    fn instant(&self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }

    fn zone(&self) -> Result<Zone, Error> {
        Ok(self.timezone())
    }
}

impl DateLike for DateTime<Utc> {
    fn instant(&self) -> DateTime<Utc> {
        *self
    }

    fn zone(&self) -> Result<Zone, Error> {
        Ok(Zone::Named(Tz::UTC))
    }
}

/// Whole-hour offsets become the matching Etc/GMT zone, others keep the bare offset
impl DateLike for DateTime<FixedOffset> {
    fn instant(&self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }

    fn zone(&self) -> Result<Zone, Error> {
        zone::from_offset_seconds(self.offset().fix().local_minus_utc())
    }
}

impl DateLike for Moment {
    fn instant(&self) -> DateTime<Utc> {
        self.datetime.with_timezone(&Utc)
    }

    fn zone(&self) -> Result<Zone, Error> {
        Ok(self.timezone())
    }
}

impl Moment {
    // --- CONSTRUCTION ---

    /// The current instant in the configured default zone
    pub fn now(config: &Config) -> Result<Moment, Error> {
        Moment::now_in(config, config.tz()?)
    }

    pub fn now_in(config: &Config, zone: impl ToZone) -> Result<Moment, Error> {
        let tz = zone.to_zone()?;
        let instant = clock::now(&config.time_provider);
        Ok(Moment::from(instant.with_timezone(&tz)))
    }

    /// Midnight of the current day in the default zone
    pub fn today(config: &Config) -> Result<Moment, Error> {
        Moment::now(config)?.start_of_day()
    }

    pub fn tomorrow(config: &Config) -> Result<Moment, Error> {
        Moment::today(config)?.add_days(1)
    }

    pub fn yesterday(config: &Config) -> Result<Moment, Error> {
        Moment::today(config)?.add_days(-1)
    }

    /// Parse an absolute or relative expression in the default zone.
    ///
    /// `None` means now. Relative expressions such as `"first day of January 2008"`
    /// are counted from the current instant, frozen or not.
    pub fn parse<'a>(config: &Config, expression: impl Into<Option<&'a str>>) -> Result<Moment, Error> {
        Moment::parse_in(config, expression, config.tz()?)
    }

    /// Like [`Moment::parse`], displaying the result in `zone` whatever zone the expression implies
    pub fn parse_in<'a>(
        config: &Config,
        expression: impl Into<Option<&'a str>>,
        zone: impl ToZone,
    ) -> Result<Moment, Error> {
        let tz = zone.to_zone()?;
        let now = clock::now(&config.time_provider);
        let datetime = match expression.into() {
            None => now.with_timezone(&tz),
            Some(expression) => parse::resolve(expression, tz, now)?,
        };
        Ok(Moment::from(datetime))
    }

    /// Same instant and zone as `source`
    pub fn instance(source: &impl DateLike) -> Result<Moment, Error> {
        let tz = source.zone()?;
        Ok(Moment::from(source.instant().with_timezone(&tz)))
    }

    /// Same instant as `source`, shown in `zone`
    pub fn instance_in(source: &impl DateLike, zone: impl ToZone) -> Result<Moment, Error> {
        let tz = zone.to_zone()?;
        Ok(Moment::from(source.instant().with_timezone(&tz)))
    }

    /// `seconds` after the Unix epoch, shown in the default zone
    pub fn from_timestamp(config: &Config, seconds: i64) -> Result<Moment, Error> {
        Moment::from_timestamp_in(seconds, config.tz()?)
    }

    pub fn from_timestamp_in(seconds: i64, zone: impl ToZone) -> Result<Moment, Error> {
        let tz = zone.to_zone()?;
        let instant = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| errors::out_of_range(&format!("timestamp {seconds}")))?;
        Ok(Moment::from(instant.with_timezone(&tz)))
    }

    pub fn from_timestamp_millis(config: &Config, millis: i64) -> Result<Moment, Error> {
        Moment::from_timestamp_millis_in(millis, config.tz()?)
    }

    pub fn from_timestamp_millis_in(millis: i64, zone: impl ToZone) -> Result<Moment, Error> {
        let tz = zone.to_zone()?;
        let instant = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| errors::out_of_range(&format!("timestamp {millis}ms")))?;
        Ok(Moment::from(instant.with_timezone(&tz)))
    }

    /// Build from wall-clock fields in `zone`
    pub fn create(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        zone: impl ToZone,
    ) -> Result<Moment, Error> {
        let tz = zone.to_zone()?;
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(|| {
                errors::parse(&format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                ))
            })?;
        Ok(Moment::from(zone::localize(tz, &naive)?))
    }

    // --- ACCESSORS ---

    pub fn year(&self) -> i32 {
        self.datetime.year()
    }

    pub fn month(&self) -> u32 {
        self.datetime.month()
    }

    pub fn day(&self) -> u32 {
        self.datetime.day()
    }

    pub fn hour(&self) -> u32 {
        self.datetime.hour()
    }

    pub fn minute(&self) -> u32 {
        self.datetime.minute()
    }

    pub fn second(&self) -> u32 {
        self.datetime.second()
    }

    pub fn micro(&self) -> u32 {
        self.datetime.nanosecond() % 1_000_000_000 / 1_000
    }

    pub fn day_of_week(&self) -> Weekday {
        self.datetime.weekday()
    }

    /// 1 for January 1st
    pub fn day_of_year(&self) -> u32 {
        self.datetime.ordinal()
    }

    pub fn timestamp(&self) -> i64 {
        self.datetime.timestamp()
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.datetime.timestamp_millis()
    }

    pub fn timezone(&self) -> Zone {
        self.datetime.timezone()
    }

    /// The zone identifier, e.g. "America/Toronto", or the offset for fixed zones
    pub fn tz_name(&self) -> String {
        self.timezone().name()
    }

    pub fn offset_hours(&self) -> i32 {
        zone::offset_hours(&self.datetime)
    }

    pub fn offset_seconds(&self) -> i32 {
        zone::offset_seconds(&self.datetime)
    }

    pub fn is_dst(&self) -> bool {
        zone::is_dst(&self.datetime)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.datetime.with_timezone(&Utc)
    }

    pub fn datetime(&self) -> DateTime<Zone> {
        self.datetime
    }

    // --- FORMATTING ---

    /// Format with date letters such as `"Y-m-d H:i:s e"`
    pub fn format(&self, pattern: &str) -> String {
        format::letters(&self.datetime, pattern)
    }

    /// Format with a chrono strftime pattern such as `"%Y-%m-%d"`
    pub fn strftime(&self, pattern: &str) -> Result<String, Error> {
        format::strftime(&self.datetime, pattern)
    }

    pub fn to_date_time_string(&self) -> String {
        self.format(format::DATE_TIME)
    }

    pub fn to_date_string(&self) -> String {
        self.format(format::DATE)
    }

    pub fn to_iso8601_string(&self) -> String {
        self.datetime
            .to_rfc3339_opts(chrono::SecondsFormat::AutoSi, false)
    }

    // --- NEW MOMENTS ---

    /// The same instant shown in another zone
    pub fn with_timezone(&self, zone: impl ToZone) -> Result<Moment, Error> {
        Moment::instance_in(self, zone)
    }

    pub fn add(&self, duration: Duration) -> Result<Moment, Error> {
        self.datetime
            .checked_add_signed(duration)
            .map(Moment::from)
            .ok_or_else(|| errors::out_of_range(&format!("{self} + {duration}")))
    }

    pub fn sub(&self, duration: Duration) -> Result<Moment, Error> {
        self.datetime
            .checked_sub_signed(duration)
            .map(Moment::from)
            .ok_or_else(|| errors::out_of_range(&format!("{self} - {duration}")))
    }

    /// Move by calendar days, keeping the wall-clock time across DST changes
    pub fn add_days(&self, days: i64) -> Result<Moment, Error> {
        let naive = Duration::try_days(days)
            .and_then(|duration| self.datetime.naive_local().checked_add_signed(duration))
            .ok_or_else(|| errors::out_of_range(&format!("{self} + {days} days")))?;
        self.localized(&naive)
    }

    /// Move by calendar months, clamping to the end of shorter months
    pub fn add_months(&self, months: i32) -> Result<Moment, Error> {
        let local = self.datetime.naive_local();
        let magnitude = Months::new(months.unsigned_abs());
        let naive = if months < 0 {
            local.checked_sub_months(magnitude)
        } else {
            local.checked_add_months(magnitude)
        }
        .ok_or_else(|| errors::out_of_range(&format!("{self} + {months} months")))?;
        self.localized(&naive)
    }

    pub fn add_years(&self, years: i32) -> Result<Moment, Error> {
        let months = years
            .checked_mul(12)
            .ok_or_else(|| errors::out_of_range(&format!("{self} + {years} years")))?;
        self.add_months(months)
    }

    pub fn start_of_day(&self) -> Result<Moment, Error> {
        let naive = self
            .datetime
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| errors::out_of_range("start of day"))?;
        self.localized(&naive)
    }

    pub fn end_of_day(&self) -> Result<Moment, Error> {
        let naive = self
            .datetime
            .date_naive()
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .ok_or_else(|| errors::out_of_range("end of day"))?;
        self.localized(&naive)
    }

    pub fn start_of_month(&self) -> Result<Moment, Error> {
        self.with_day(1)?.start_of_day()
    }

    pub fn end_of_month(&self) -> Result<Moment, Error> {
        let last = relative::last_day_of_month(self.year(), self.month())
            .ok_or_else(|| errors::out_of_range("end of month"))?;
        self.with_day(last)?.end_of_day()
    }

    fn with_day(&self, day: u32) -> Result<Moment, Error> {
        let naive = self
            .datetime
            .naive_local()
            .with_day(day)
            .ok_or_else(|| errors::out_of_range(&format!("day {day}")))?;
        self.localized(&naive)
    }

    fn localized(&self, naive: &chrono::NaiveDateTime) -> Result<Moment, Error> {
        zone::localize(self.timezone(), naive).map(Moment::from)
    }

    // --- COMPARISON ---

    /// Same instant, whatever the zones
    pub fn eq(&self, other: &Moment) -> bool {
        self.instant() == other.instant()
    }

    pub fn ne(&self, other: &Moment) -> bool {
        !self.eq(other)
    }

    pub fn gt(&self, other: &Moment) -> bool {
        self.instant() > other.instant()
    }

    pub fn gte(&self, other: &Moment) -> bool {
        self.instant() >= other.instant()
    }

    pub fn lt(&self, other: &Moment) -> bool {
        self.instant() < other.instant()
    }

    pub fn lte(&self, other: &Moment) -> bool {
        self.instant() <= other.instant()
    }

    /// Inclusive of both ends, which may be given in either order
    pub fn between(&self, first: &Moment, second: &Moment) -> bool {
        let (low, high) = if first.lte(second) {
            (first, second)
        } else {
            (second, first)
        };
        self.gte(low) && self.lte(high)
    }

    /// Whole seconds from `self` to `other`, negative when `other` is earlier
    pub fn diff_in_seconds(&self, other: &Moment) -> i64 {
        other
            .instant()
            .signed_duration_since(self.instant())
            .num_seconds()
    }
}

impl From<DateTime<Zone>> for Moment {
    fn from(datetime: DateTime<Zone>) -> Self {
        Moment { datetime }
    }
}

impl From<DateTime<Tz>> for Moment {
    fn from(datetime: DateTime<Tz>) -> Self {
        let zone = Zone::Named(datetime.timezone());
        Moment::from(datetime.with_timezone(&zone))
    }
}

impl From<Moment> for DateTime<Zone> {
    fn from(moment: Moment) -> Self {
        moment.datetime
    }
}

impl PartialEq for Moment {
    fn eq(&self, other: &Self) -> bool {
        Moment::eq(self, other)
    }
}

impl Eq for Moment {}

impl PartialOrd for Moment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Moment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant().cmp(&other.instant())
    }
}

impl Hash for Moment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instant().hash(state);
    }
}

impl Display for Moment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_date_time_string())
    }
}

impl From<Moment> for RawMoment {
    fn from(moment: Moment) -> Self {
        RawMoment {
            date: moment
                .datetime
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, false),
            timezone: moment.tz_name(),
        }
    }
}

impl TryFrom<RawMoment> for Moment {
    type Error = Error;

    fn try_from(raw: RawMoment) -> Result<Self, Self::Error> {
        let tz = zone::resolve(&raw.timezone)?;
        let instant = DateTime::parse_from_rfc3339(&raw.date)?;
        Ok(Moment::from(instant.with_timezone(&tz)))
    }
}
