//! Frequency recurrence -- iteration counts and per-iteration date spans.
//!
//! Iteration 0 is the source record itself. For a bound of `count` whole
//! intervals between `start` and `until`, iterations `1..count` are generated,
//! so an occurrence falling exactly on `until` is never produced.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::datemath::{
    add_months, count_intervals, last_weekday_of_month, nth_weekday_of_month, week_of_month,
};
use crate::frequency::Frequency;

/// A start/end pair for one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateSpan {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// What to do when a monthly occurrence names a week the target month lacks,
/// e.g. the fifth Friday of a month with four Fridays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FifthWeekPolicy {
    /// Generate nothing for that month.
    #[default]
    Skip,
    /// Fall back to the last matching weekday of the month.
    ClampToLast,
}

/// Upper bound on iterations for `freq` between `start` and `until`.
///
/// An `until` at or before `start` yields 0.
pub fn calculate_count(freq: Frequency, start: NaiveDateTime, until: NaiveDateTime) -> i64 {
    if until <= start {
        return 0;
    }
    count_intervals(freq, start, until)
}

/// The date span of iteration `iteration` for a source spanning `span`.
///
/// Daily, weekly and yearly recurrences shift both ends by a uniform amount.
/// Monthly recurrences keep each end's "nth weekday of month" signature and
/// time of day. Returns `None` when the occurrence does not exist in the
/// calendar (see [`FifthWeekPolicy`]) or the arithmetic overflows.
pub fn calculate_new_dates(
    freq: Frequency,
    iteration: u32,
    span: DateSpan,
    fifth_week: FifthWeekPolicy,
) -> Option<DateSpan> {
    let shift = |ts: NaiveDateTime| -> Option<NaiveDateTime> {
        match freq {
            Frequency::Daily => ts.checked_add_signed(Duration::days(i64::from(iteration))),
            Frequency::Weekly => ts.checked_add_signed(Duration::weeks(i64::from(iteration))),
            Frequency::Monthly => shift_monthly(ts, iteration, fifth_week),
            Frequency::Yearly => add_months(ts, iteration.checked_mul(12)?),
        }
    };
    Some(DateSpan::new(shift(span.start)?, shift(span.end)?))
}

/// Move `ts` forward `months` months onto the same (week-of-month, weekday) slot.
fn shift_monthly(ts: NaiveDateTime, months: u32, fifth_week: FifthWeekPolicy) -> Option<NaiveDateTime> {
    let week = week_of_month(ts.date());
    let weekday: Weekday = ts.weekday();
    let target = first_of_month(ts.date())?.checked_add_months(Months::new(months))?;

    let date = match nth_weekday_of_month(week, weekday, target.month(), target.year()) {
        Some(date) => date,
        None => match fifth_week {
            FifthWeekPolicy::Skip => return None,
            FifthWeekPolicy::ClampToLast => {
                last_weekday_of_month(weekday, target.month(), target.year())?
            }
        },
    };
    Some(date.and_time(ts.time()))
}

fn first_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)
}

/// Default recurrence bound: `months` calendar months after `start`.
pub fn default_until(start: NaiveDateTime, months: u32) -> Option<NaiveDateTime> {
    add_months(start, months)
}

/// All generated spans for a frequency recurrence, in iteration order.
///
/// Iterations whose occurrence does not exist are omitted; the source span
/// (iteration 0) is not included.
pub fn recurrence_spans(
    freq: Frequency,
    span: DateSpan,
    until: NaiveDateTime,
    fifth_week: FifthWeekPolicy,
) -> Vec<(u32, DateSpan)> {
    let count = u32::try_from(calculate_count(freq, span.start, until)).unwrap_or(u32::MAX);
    (1..count)
        .filter_map(|i| calculate_new_dates(freq, i, span, fifth_week).map(|s| (i, s)))
        .collect()
}
