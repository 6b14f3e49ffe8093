//! Weekly repeat expansion -- sibling occurrences on other weekdays of the
//! source's own week.

use chrono::{Datelike, Duration, Weekday};

use crate::datemath::weekday_distance;
use crate::recurrence::DateSpan;

/// A sibling occurrence generated by one weekday rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyOccurrence {
    pub rule: Weekday,
    pub span: DateSpan,
}

/// Compute the sibling spans for a multi-weekday repeat pattern.
///
/// A single-day pattern produces nothing: the source already sits on its day.
/// For each rule the start and end are moved by their own weekday distance, so
/// an event whose end falls on a later weekday keeps its end weekday aligned
/// with the rule. Rules naming the source's own weekday are skipped.
///
/// If moving the end independently would put it before the moved start, the
/// end is moved by the start's offset instead and the duration is kept.
pub fn expand_weekly(span: DateSpan, days: &[Weekday]) -> Vec<WeeklyOccurrence> {
    if days.len() <= 1 {
        return Vec::new();
    }

    let start_dow = span.start.weekday();
    let end_dow = span.end.weekday();

    days.iter()
        .filter_map(|&rule| {
            let start_diff = weekday_distance(rule, start_dow);
            if start_diff == 0 {
                return None;
            }
            let end_diff = weekday_distance(rule, end_dow);

            let start = span.start.checked_add_signed(Duration::days(start_diff))?;
            let mut end = span.end.checked_add_signed(Duration::days(end_diff))?;
            if end < start {
                end = span.end.checked_add_signed(Duration::days(start_diff))?;
            }
            Some(WeeklyOccurrence {
                rule,
                span: DateSpan::new(start, end),
            })
        })
        .collect()
}
