//! Relative and fuzzy date expressions.
//!
//! Expressions are a sequence of clauses such as `"first day of january 2008"`,
//! `"next monday 3pm"` or `"+2 weeks"`. Each clause only records what it asks
//! for. Resolution then applies explicit date fields, time, offsets, weekday
//! moves and finally first/last-day-of, so clause order in the text does not
//! matter. All calendar arithmetic is done by chrono.

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday,
};
use regex::Regex;

use crate::errors::{self, Error};
use crate::zone::{self, Zone};

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([+-]?)(\d+)$").unwrap());
static DAY_OF_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?:st|nd|rd|th)?$").unwrap());
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Fortnight,
    Month,
    Year,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DayOf {
    First,
    Last,
}

/// Which occurrence of a weekday: the coming one (today counts), strictly next, or strictly last
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    This,
    Next,
    Last,
}

#[derive(Debug, Default)]
struct Clauses {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    time: Option<NaiveTime>,
    reset_time: bool,
    offsets: Vec<(i64, Unit)>,
    weekday: Option<(Weekday, Direction)>,
    day_of: Option<DayOf>,
}

/// Resolve a relative expression against `now`, in `now`'s zone
pub fn resolve(expression: &str, now: &DateTime<Zone>) -> Result<DateTime<Zone>, Error> {
    let normalized = expression.to_lowercase().replace(',', " ");
    let tokens = normalized.split_whitespace().collect::<Vec<&str>>();
    if tokens.is_empty() {
        return Err(errors::parse(expression));
    }

    let clauses = read_clauses(&tokens).ok_or_else(|| errors::parse(expression))?;
    let naive = apply(&clauses, &now.naive_local()).ok_or_else(|| errors::parse(expression))?;

    zone::localize(now.timezone(), &naive)
}

fn read_clauses(tokens: &[&str]) -> Option<Clauses> {
    let mut clauses = Clauses::default();
    let mut index = 0;

    while index < tokens.len() {
        let token = tokens[index];
        let next = tokens.get(index + 1).copied();

        index += match token {
            "now" | "at" | "the" | "of" => 1,
            "today" | "midnight" => {
                clauses.reset_time = true;
                1
            }
            "noon" => {
                clauses.time = NaiveTime::from_hms_opt(12, 0, 0);
                1
            }
            "tomorrow" => {
                clauses.offsets.push((1, Unit::Day));
                clauses.reset_time = true;
                1
            }
            "yesterday" => {
                clauses.offsets.push((-1, Unit::Day));
                clauses.reset_time = true;
                1
            }
            "ago" => {
                for (amount, _) in clauses.offsets.iter_mut() {
                    *amount = -*amount;
                }
                1
            }
            "first" | "last" if next == Some("day") && tokens.get(index + 2) == Some(&"of") => {
                clauses.day_of = Some(if token == "first" {
                    DayOf::First
                } else {
                    DayOf::Last
                });
                3
            }
            "next" | "last" | "previous" | "this" => {
                let next = next?;
                if let Some(weekday) = parse_weekday(next) {
                    let direction = match token {
                        "next" => Direction::Next,
                        "this" => Direction::This,
                        _ => Direction::Last,
                    };
                    clauses.weekday = Some((weekday, direction));
                    clauses.reset_time = true;
                } else {
                    let unit = parse_unit(next)?;
                    let amount = match token {
                        "next" => 1,
                        "this" => 0,
                        _ => -1,
                    };
                    clauses.offsets.push((amount, unit));
                }
                2
            }
            "a" | "an" => {
                clauses.offsets.push((1, parse_unit(next?)?));
                2
            }
            _ => read_value(token, next, tokens.get(index + 2).copied(), &mut clauses)?,
        };
    }

    Some(clauses)
}

/// Clauses that start with a number, a name or a clock time. Returns how many tokens were used.
fn read_value(
    token: &str,
    next: Option<&str>,
    after: Option<&str>,
    clauses: &mut Clauses,
) -> Option<usize> {
    if let Some(weekday) = parse_weekday(token) {
        clauses.weekday = Some((weekday, Direction::This));
        clauses.reset_time = true;
        return Some(1);
    }

    if let Some(month) = parse_month(token) {
        clauses.month = Some(month);
        let mut used = 1;
        if let Some(day) = next.and_then(parse_day_of_month) {
            clauses.day = Some(day);
            used += 1;
            if let Some(year) = after.and_then(parse_year) {
                clauses.year = Some(year);
                used += 1;
            }
        } else if let Some(year) = next.and_then(parse_year) {
            clauses.year = Some(year);
            used += 1;
        }
        return Some(used);
    }

    if let Some(date) = parse_iso_date(token) {
        clauses.year = Some(date.year());
        clauses.month = Some(date.month());
        clauses.day = Some(date.day());
        return Some(1);
    }

    if let Some((time, used)) = parse_time(token, next) {
        clauses.time = Some(time);
        return Some(used);
    }

    if let Some(captures) = AMOUNT.captures(token) {
        if let Some(unit) = next.and_then(parse_unit) {
            let amount = captures[2].parse::<i64>().ok()?;
            let amount = if &captures[1] == "-" { -amount } else { amount };
            clauses.offsets.push((amount, unit));
            return Some(2);
        }
    }

    // "5th march 2020"
    if let (Some(day), Some(month)) = (parse_day_of_month(token), next.and_then(parse_month)) {
        clauses.day = Some(day);
        clauses.month = Some(month);
        if let Some(year) = after.and_then(parse_year) {
            clauses.year = Some(year);
            return Some(3);
        }
        return Some(2);
    }

    None
}

fn apply(clauses: &Clauses, now: &NaiveDateTime) -> Option<NaiveDateTime> {
    let today = now.date();
    let date_given = clauses.year.is_some() || clauses.month.is_some() || clauses.day.is_some();

    let year = clauses.year.unwrap_or(today.year());
    let month = clauses.month.unwrap_or(today.month());
    let day = match (clauses.day, clauses.year, clauses.month) {
        (Some(day), _, _) => day,
        // "january 2008" means the first
        (None, Some(_), Some(_)) => 1,
        (None, _, _) if clauses.day_of.is_some() => 1,
        (None, _, _) => today.day(),
    };
    let date = if clauses.day.is_some() {
        NaiveDate::from_ymd_opt(year, month, day)?
    } else {
        NaiveDate::from_ymd_opt(year, month, day.min(last_day_of_month(year, month)?))?
    };

    let time = match clauses.time {
        Some(time) => time,
        None if date_given || clauses.reset_time => NaiveTime::from_hms_opt(0, 0, 0)?,
        None => now.time(),
    };

    let mut datetime = date.and_time(time);
    for (amount, unit) in &clauses.offsets {
        datetime = add(datetime, *amount, *unit)?;
    }

    if let Some((weekday, direction)) = clauses.weekday {
        let date = move_to_weekday(datetime.date(), weekday, direction)?;
        datetime = date.and_time(datetime.time());
    }

    if let Some(day_of) = clauses.day_of {
        let day = match day_of {
            DayOf::First => 1,
            DayOf::Last => last_day_of_month(datetime.year(), datetime.month())?,
        };
        datetime = datetime.with_day(day)?;
    }

    Some(datetime)
}

fn add(datetime: NaiveDateTime, amount: i64, unit: Unit) -> Option<NaiveDateTime> {
    let duration = match unit {
        Unit::Second => Duration::try_seconds(amount)?,
        Unit::Minute => Duration::try_minutes(amount)?,
        Unit::Hour => Duration::try_hours(amount)?,
        Unit::Day => Duration::try_days(amount)?,
        Unit::Week => Duration::try_weeks(amount)?,
        Unit::Fortnight => Duration::try_weeks(amount.checked_mul(2)?)?,
        Unit::Month => return add_months(datetime, amount),
        Unit::Year => return add_months(datetime, amount.checked_mul(12)?),
    };
    datetime.checked_add_signed(duration)
}

fn add_months(datetime: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months < 0 {
        datetime.checked_sub_months(magnitude)
    } else {
        datetime.checked_add_months(magnitude)
    }
}

fn move_to_weekday(date: NaiveDate, weekday: Weekday, direction: Direction) -> Option<NaiveDate> {
    let current = i64::from(date.weekday().num_days_from_monday());
    let target = i64::from(weekday.num_days_from_monday());
    let days = match direction {
        Direction::This => (target - current).rem_euclid(7),
        Direction::Next => match (target - current).rem_euclid(7) {
            0 => 7,
            days => days,
        },
        Direction::Last => match (current - target).rem_euclid(7) {
            0 => -7,
            days => -days,
        },
    };
    date.checked_add_signed(Duration::try_days(days)?)
}

pub(crate) fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (year, month) = match month {
        12 => (year + 1, 1),
        month => (year, month + 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1)?
        .pred_opt()
        .map(|date| date.day())
}

fn parse_unit(token: &str) -> Option<Unit> {
    match token {
        "sec" | "secs" | "second" | "seconds" => Some(Unit::Second),
        "min" | "mins" | "minute" | "minutes" => Some(Unit::Minute),
        "hour" | "hours" => Some(Unit::Hour),
        "day" | "days" => Some(Unit::Day),
        "week" | "weeks" => Some(Unit::Week),
        "fortnight" | "fortnights" => Some(Unit::Fortnight),
        "month" | "months" => Some(Unit::Month),
        "year" | "years" => Some(Unit::Year),
        _ => None,
    }
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    match token {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_month(token: &str) -> Option<u32> {
    match token {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" | "sept" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

fn parse_day_of_month(token: &str) -> Option<u32> {
    let captures = DAY_OF_MONTH.captures(token)?;
    let day = captures[1].parse::<u32>().ok()?;
    (1..=31).contains(&day).then_some(day)
}

fn parse_year(token: &str) -> Option<i32> {
    if YEAR.is_match(token) {
        token.parse().ok()
    } else {
        None
    }
}

fn parse_iso_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(token, "%Y/%m/%d"))
        .ok()
}

/// "14:30", "14:30:15.250", "3pm", "3:15 pm". Returns the time and how many tokens it used.
fn parse_time(token: &str, next: Option<&str>) -> Option<(NaiveTime, usize)> {
    let (clock, meridiem, used) = match (token.strip_suffix("am"), token.strip_suffix("pm")) {
        (Some(clock), _) => (clock, Some(0), 1),
        (_, Some(clock)) => (clock, Some(12), 1),
        _ => match next {
            Some("am") => (token, Some(0), 2),
            Some("pm") => (token, Some(12), 2),
            _ => (token, None, 1),
        },
    };

    let time = match meridiem {
        None => NaiveTime::parse_from_str(clock, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(clock, "%H:%M"))
            .ok()?,
        Some(offset) => {
            let (hour, minute) = match clock.split_once(':') {
                Some((hour, minute)) => (hour.parse::<u32>().ok()?, minute.parse::<u32>().ok()?),
                None => (clock.parse::<u32>().ok()?, 0),
            };
            if !(1..=12).contains(&hour) {
                return None;
            }
            NaiveTime::from_hms_opt(hour % 12 + offset, minute, 0)?
        }
    };

    Some((time, used))
}
