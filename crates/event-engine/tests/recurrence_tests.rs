//! Tests for frequency recurrence counts and per-iteration dates.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use event_engine::frequency::{parse_repeat, weekday_code, weekday_from_code, UnknownFrequency};
use event_engine::recurrence::{
    calculate_count, calculate_new_dates, default_until, recurrence_spans,
};
use event_engine::{DateSpan, FifthWeekPolicy, Frequency};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn span(start: NaiveDateTime, end: NaiveDateTime) -> DateSpan {
    DateSpan::new(start, end)
}

// ── Frequency and weekday codes ─────────────────────────────────────────────

#[test]
fn frequency_parses_case_insensitively() {
    assert_eq!("monthly".parse::<Frequency>(), Ok(Frequency::Monthly));
    assert_eq!(" Weekly ".parse::<Frequency>(), Ok(Frequency::Weekly));
    assert_eq!(
        "fortnightly".parse::<Frequency>(),
        Err(UnknownFrequency("fortnightly".to_string()))
    );
    assert_eq!(Frequency::Yearly.to_string(), "yearly");
}

#[test]
fn weekday_codes_round_trip() {
    for code in ['M', 'T', 'W', 'R', 'F', 'S', 'U'] {
        let day = weekday_from_code(code).expect("valid code");
        assert_eq!(weekday_code(day), code);
    }
    assert_eq!(weekday_from_code('r'), Some(Weekday::Thu));
    assert_eq!(weekday_from_code('X'), None);
}

#[test]
fn repeat_string_keeps_order_and_drops_duplicates() {
    let parsed = parse_repeat("FMWM");
    assert_eq!(parsed.days, vec![Weekday::Fri, Weekday::Mon, Weekday::Wed]);
    assert!(parsed.invalid.is_empty());

    let spaced = parse_repeat("M, W, F");
    assert_eq!(spaced.days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
}

#[test]
fn repeat_string_reports_unknown_codes() {
    let parsed = parse_repeat("MXW");
    assert_eq!(parsed.days, vec![Weekday::Mon, Weekday::Wed]);
    assert_eq!(parsed.invalid, vec!['X']);
}

// ── calculate_count ─────────────────────────────────────────────────────────

#[test]
fn count_monthly_quarter() {
    assert_eq!(
        calculate_count(Frequency::Monthly, at(2024, 1, 1, 9, 0), at(2024, 4, 1, 9, 0)),
        3
    );
}

#[test]
fn count_is_zero_when_until_not_after_start() {
    let start = at(2024, 4, 1, 9, 0);
    assert_eq!(calculate_count(Frequency::Daily, start, start), 0);
    assert_eq!(calculate_count(Frequency::Daily, start, at(2024, 1, 1, 9, 0)), 0);
}

// ── calculate_new_dates: uniform offsets ────────────────────────────────────

#[test]
fn daily_weekly_yearly_shift_uniformly() {
    let source = span(at(2024, 3, 4, 9, 0), at(2024, 3, 4, 10, 30));
    let policy = FifthWeekPolicy::Skip;

    assert_eq!(
        calculate_new_dates(Frequency::Daily, 3, source, policy),
        Some(span(at(2024, 3, 7, 9, 0), at(2024, 3, 7, 10, 30)))
    );
    assert_eq!(
        calculate_new_dates(Frequency::Weekly, 2, source, policy),
        Some(span(at(2024, 3, 18, 9, 0), at(2024, 3, 18, 10, 30)))
    );
    assert_eq!(
        calculate_new_dates(Frequency::Yearly, 1, source, policy),
        Some(span(at(2025, 3, 4, 9, 0), at(2025, 3, 4, 10, 30)))
    );
}

#[test]
fn yearly_from_leap_day_clamps() {
    let source = span(at(2024, 2, 29, 10, 0), at(2024, 2, 29, 11, 0));
    assert_eq!(
        calculate_new_dates(Frequency::Yearly, 1, source, FifthWeekPolicy::Skip),
        Some(span(at(2025, 2, 28, 10, 0), at(2025, 2, 28, 11, 0)))
    );
}

// ── calculate_new_dates: monthly ────────────────────────────────────────────

#[test]
fn monthly_keeps_first_monday() {
    // 2024-01-01 is the first Monday of January.
    let source = span(at(2024, 1, 1, 9, 0), at(2024, 1, 1, 10, 0));
    assert_eq!(
        calculate_new_dates(Frequency::Monthly, 1, source, FifthWeekPolicy::Skip),
        Some(span(at(2024, 2, 5, 9, 0), at(2024, 2, 5, 10, 0)))
    );
    assert_eq!(
        calculate_new_dates(Frequency::Monthly, 2, source, FifthWeekPolicy::Skip),
        Some(span(at(2024, 3, 4, 9, 0), at(2024, 3, 4, 10, 0)))
    );
}

#[test]
fn monthly_keeps_second_tuesday_and_time() {
    let source = span(at(2024, 1, 9, 18, 30), at(2024, 1, 9, 20, 0));
    let feb = calculate_new_dates(Frequency::Monthly, 1, source, FifthWeekPolicy::Skip).unwrap();
    let mar = calculate_new_dates(Frequency::Monthly, 2, source, FifthWeekPolicy::Skip).unwrap();

    assert_eq!(feb, span(at(2024, 2, 13, 18, 30), at(2024, 2, 13, 20, 0)));
    assert_eq!(mar, span(at(2024, 3, 12, 18, 30), at(2024, 3, 12, 20, 0)));
    assert_eq!(mar.start.weekday(), Weekday::Tue);
}

#[test]
fn monthly_crosses_year_boundary() {
    // Third Thursday of November 2024 → third Thursday of January 2025.
    let source = span(at(2024, 11, 21, 12, 0), at(2024, 11, 21, 13, 0));
    assert_eq!(
        calculate_new_dates(Frequency::Monthly, 2, source, FifthWeekPolicy::Skip),
        Some(span(at(2025, 1, 16, 12, 0), at(2025, 1, 16, 13, 0)))
    );
}

#[test]
fn fifth_friday_skipped_when_month_has_four() {
    let source = span(at(2024, 3, 29, 19, 0), at(2024, 3, 29, 21, 0));
    assert_eq!(
        calculate_new_dates(Frequency::Monthly, 1, source, FifthWeekPolicy::Skip),
        None
    );
    // May 2024 does have a fifth Friday.
    assert_eq!(
        calculate_new_dates(Frequency::Monthly, 2, source, FifthWeekPolicy::Skip),
        Some(span(at(2024, 5, 31, 19, 0), at(2024, 5, 31, 21, 0)))
    );
}

#[test]
fn fifth_friday_clamped_to_last_friday() {
    let source = span(at(2024, 3, 29, 19, 0), at(2024, 3, 29, 21, 0));
    assert_eq!(
        calculate_new_dates(Frequency::Monthly, 1, source, FifthWeekPolicy::ClampToLast),
        Some(span(at(2024, 4, 26, 19, 0), at(2024, 4, 26, 21, 0)))
    );
}

// ── recurrence_spans ────────────────────────────────────────────────────────

#[test]
fn until_boundary_is_exclusive() {
    let source = span(at(2024, 1, 1, 9, 0), at(2024, 1, 1, 10, 0));
    let spans = recurrence_spans(
        Frequency::Monthly,
        source,
        at(2024, 4, 1, 9, 0),
        FifthWeekPolicy::Skip,
    );

    let starts: Vec<_> = spans.iter().map(|(_, s)| s.start).collect();
    assert_eq!(starts, vec![at(2024, 2, 5, 9, 0), at(2024, 3, 4, 9, 0)]);
    assert!(spans.iter().all(|(_, s)| s.start.month() != 4));
}

#[test]
fn daily_default_until_matches_day_count() {
    let start = at(2024, 1, 1, 9, 0);
    let until = default_until(start, 6).unwrap();
    assert_eq!(until, at(2024, 7, 1, 9, 0));

    let spans = recurrence_spans(
        Frequency::Daily,
        span(start, at(2024, 1, 1, 10, 0)),
        until,
        FifthWeekPolicy::Skip,
    );
    // The source itself is occurrence 0, so source + spans == day count.
    assert_eq!(spans.len() + 1, 182);
    assert_eq!(spans.last().unwrap().1.start, at(2024, 6, 30, 9, 0));
}

#[test]
fn fifth_week_policy_changes_span_count() {
    let source = span(at(2024, 3, 29, 19, 0), at(2024, 3, 29, 21, 0));
    let until = at(2024, 9, 1, 0, 0);

    let skipped = recurrence_spans(Frequency::Monthly, source, until, FifthWeekPolicy::Skip);
    let clamped = recurrence_spans(Frequency::Monthly, source, until, FifthWeekPolicy::ClampToLast);

    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0], (2, span(at(2024, 5, 31, 19, 0), at(2024, 5, 31, 21, 0))));

    let clamped_days: Vec<_> = clamped.iter().map(|(_, s)| s.start.date()).collect();
    assert_eq!(
        clamped_days,
        vec![
            NaiveDate::from_ymd_opt(2024, 4, 26).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 26).unwrap(),
        ]
    );
}
