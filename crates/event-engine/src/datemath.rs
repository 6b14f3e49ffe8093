//! Calendar arithmetic shared by the recurrence and repeat expanders.
//!
//! Every timestamp is a wall-clock `NaiveDateTime`: the host hands dates over
//! without zone information and instances are generated in the same wall-clock
//! frame, so "9:00 on the second Tuesday" stays 9:00 in every month.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::frequency::Frequency;

/// Format used when writing dates back into a record header (`03/06/2024 9:00 am`).
pub const HOST_FORMAT: &str = "%m/%d/%Y %-I:%M %P";

/// Accepted date-time layouts at the host boundary, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M%p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts; these resolve to midnight.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

const WEEK_ORDINALS: [&str; 5] = ["first", "second", "third", "fourth", "fifth"];

/// Parse a host date string into a timestamp.
///
/// Returns `None` when no accepted layout matches; callers attach the record
/// context and turn that into [`EngineError::InvalidDate`](crate::EngineError).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Render a timestamp in the host's header format.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(HOST_FORMAT).to_string()
}

/// Signed number of days that moves `from` onto `target` within the same
/// Sunday-based week. The result is in `-6..=6`.
pub fn weekday_distance(target: Weekday, from: Weekday) -> i64 {
    i64::from(target.num_days_from_sunday()) - i64::from(from.num_days_from_sunday())
}

/// Number of whole `freq` intervals between two timestamps, regardless of order.
///
/// Month and year counts follow calendar semantics with day-of-month clamping:
/// Jan 31 → Feb 29 is one whole month, Jan 31 → Feb 28 (leap year) is not.
pub fn count_intervals(freq: Frequency, from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    let (a, b) = if from <= to { (from, to) } else { (to, from) };
    match freq {
        Frequency::Daily => (b - a).num_days(),
        Frequency::Weekly => (b - a).num_days() / 7,
        Frequency::Monthly => whole_months_between(a, b),
        Frequency::Yearly => whole_months_between(a, b) / 12,
    }
}

/// Whole calendar months from `a` to `b`, where `a <= b`.
fn whole_months_between(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    let mut months =
        i64::from(b.year() - a.year()) * 12 + i64::from(b.month()) - i64::from(a.month());
    while months > 0 {
        let reached = u32::try_from(months)
            .ok()
            .and_then(|m| add_months(a, m))
            .is_some_and(|shifted| shifted <= b);
        if reached {
            break;
        }
        months -= 1;
    }
    months.max(0)
}

/// Add calendar months, clamping the day to the end of a shorter month.
pub fn add_months(ts: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    ts.checked_add_months(Months::new(months))
}

/// Which occurrence of its weekday `date` is within its month (1..=5).
pub fn week_of_month(date: NaiveDate) -> u8 {
    // day 1..=31 maps onto 1..=5, always fits in u8
    ((date.day() - 1) / 7 + 1) as u8
}

/// Human-readable ordinal for a week of month ("first" … "fifth").
pub fn week_ordinal(week: u8) -> Option<&'static str> {
    WEEK_ORDINALS.get(usize::from(week).checked_sub(1)?).copied()
}

/// Resolve "the `week`-th `weekday` of `month` `year`" to a date.
///
/// Returns `None` when the month has no such occurrence (a fifth Friday in a
/// four-Friday month) or the inputs are out of range.
pub fn nth_weekday_of_month(week: u8, weekday: Weekday, month: u32, year: i32) -> Option<NaiveDate> {
    if !(1..=5).contains(&week) {
        return None;
    }
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, week)
}

/// The last `weekday` of `month` `year`.
pub fn last_weekday_of_month(weekday: Weekday, month: u32, year: i32) -> Option<NaiveDate> {
    (1..=5)
        .rev()
        .find_map(|week| NaiveDate::from_weekday_of_month_opt(year, month, weekday, week))
}
