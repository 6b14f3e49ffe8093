//! The three-phase expansion pass over a whole catalog.
//!
//! 1. **Preprocess** -- parse every record's `event:` block into a
//!    [`Schedule`], default `until`, derive `event_*` taxonomy, collect
//!    categories, register taxonomy.
//! 2. **Weekly** -- records with a multi-weekday `repeat` get one sibling per
//!    other weekday.
//! 3. **Frequency** -- the catalog is read again so weekly siblings are seen;
//!    every record with `freq` and `until` is cloned forward in time. Siblings
//!    are always cloned from the record they were generated from.
//!
//! The pass keeps no state between calls: categories and counters live in the
//! returned [`Expansion`].

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::catalog::{Catalog, TaxonomyIndex};
use crate::datemath::{format_timestamp, parse_timestamp, week_ordinal, week_of_month};
use crate::error::{EngineError, Result};
use crate::frequency::{parse_repeat, weekday_code, weekday_name, Frequency};
use crate::materialize::{Materialized, Materializer};
use crate::model::{Record, RecordId, Schedule, Taxonomy};
use crate::recurrence::{calculate_count, default_until, recurrence_spans, FifthWeekPolicy};
use crate::repeat::expand_weekly;

/// Tunables for one expansion pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionOptions {
    /// Recurrence bound applied when a record has `freq` but no `until`.
    pub default_until_months: u32,
    pub fifth_week: FifthWeekPolicy,
    /// Reject unknown frequencies and weekday codes. When off, the offending
    /// field is ignored with a warning.
    pub strict: bool,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            default_until_months: 6,
            fifth_week: FifthWeekPolicy::default(),
            strict: true,
        }
    }
}

/// Pipeline states, in the only order they are ever entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Phase {
    Preprocessed,
    WeeklyExpanded,
    FrequencyExpanded,
    Done,
}

/// Distinct category names seen on event records, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventCategories(BTreeSet<String>);

impl EventCategories {
    pub fn insert(&mut self, category: impl Into<String>) -> bool {
        self.0.insert(category.into())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Category names in sorted order.
    pub fn sorted(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> Extend<S> for EventCategories {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

/// Counters and warnings collected during a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionReport {
    pub completed: Vec<Phase>,
    /// Records that carried an event and were normalized.
    pub preprocessed: usize,
    /// Records without an event start; left untouched.
    pub skipped: usize,
    /// New weekly siblings written to the catalog.
    pub weekly_instances: usize,
    /// New frequency clones written to the catalog.
    pub frequency_instances: usize,
    /// Occurrences whose instance id was already taken, by an earlier pass or
    /// by another expansion of the same original.
    pub existing: usize,
    /// Occurrences dropped because they fell on an exception date.
    pub suppressed: usize,
    /// Monthly occurrences whose week of month does not exist.
    pub unresolved: usize,
    pub warnings: Vec<String>,
}

/// Result of [`expand_all`]. The catalog itself is mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Expansion {
    pub categories: EventCategories,
    pub report: ExpansionReport,
}

impl Expansion {
    /// Sorted category names aggregated over the pass.
    pub fn event_categories(&self) -> Vec<String> {
        self.categories.sorted()
    }

    /// Instances new to the catalog after this pass.
    pub fn instances_added(&self) -> usize {
        self.report.weekly_instances + self.report.frequency_instances
    }
}

/// Run the full pipeline: preprocess, weekly expansion, frequency expansion.
///
/// # Errors
/// Returns `EngineError::InvalidDate` for an unparseable date anywhere in the
/// catalog, `EngineError::UnknownFrequency` / `EngineError::InvalidRepeat` in
/// strict mode (the default), and any collaborator failure. No partial result
/// is returned.
#[instrument(skip_all, fields(strict = options.strict))]
pub fn expand_all<C, T>(
    catalog: &mut C,
    taxonomy: &mut T,
    options: &ExpansionOptions,
) -> Result<Expansion>
where
    C: Catalog + ?Sized,
    T: TaxonomyIndex + ?Sized,
{
    let mut report = ExpansionReport::default();

    let categories = preprocess(catalog, taxonomy, options, &mut report)?;
    report.completed.push(Phase::Preprocessed);

    expand_weekly_phase(catalog, taxonomy, &mut report)?;
    report.completed.push(Phase::WeeklyExpanded);

    expand_frequency_phase(catalog, taxonomy, options, &mut report)?;
    report.completed.push(Phase::FrequencyExpanded);
    report.completed.push(Phase::Done);

    info!(
        preprocessed = report.preprocessed,
        weekly = report.weekly_instances,
        frequency = report.frequency_instances,
        existing = report.existing,
        suppressed = report.suppressed,
        categories = categories.len(),
        "event expansion complete"
    );

    Ok(Expansion { categories, report })
}

/// Phase 1: normalize every source record's event data in place.
///
/// Generated instances already in the catalog are left alone.
///
/// # Errors
/// See [`expand_all`].
#[instrument(skip_all)]
pub fn preprocess<C, T>(
    catalog: &mut C,
    taxonomy: &mut T,
    options: &ExpansionOptions,
    report: &mut ExpansionReport,
) -> Result<EventCategories>
where
    C: Catalog + ?Sized,
    T: TaxonomyIndex + ?Sized,
{
    let mut categories = EventCategories::default();

    for mut record in catalog.list_all()? {
        if record.is_instance() {
            continue;
        }
        if !preprocess_record(&mut record, options, &mut report.warnings)? {
            debug!(record = %record.id, "no event start, skipping");
            report.skipped += 1;
            continue;
        }

        if let Some(names) = record.taxonomy.get("category") {
            categories.extend(names.iter().cloned());
        }
        taxonomy.register_taxonomy(&record, &record.taxonomy)?;
        catalog.update(record)?;
        report.preprocessed += 1;
    }

    Ok(categories)
}

/// Normalize one record. Returns `false` when it has no event start.
fn preprocess_record(
    record: &mut Record,
    options: &ExpansionOptions,
    warnings: &mut Vec<String>,
) -> Result<bool> {
    let id = record.id.clone();
    let Some(event) = record.header.event.as_mut() else {
        return Ok(false);
    };
    let Some(start_raw) = event.start.clone() else {
        return Ok(false);
    };

    let start = parse_date(&id, &start_raw)?;
    let end = match event.end.as_deref() {
        Some(raw) => parse_date(&id, raw)?,
        None => {
            note(warnings, format!("record '{id}' has no event end; using its start"));
            start
        }
    };

    let freq = match event.freq.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<Frequency>() {
            Ok(freq) => Some(freq),
            Err(_) if options.strict => {
                return Err(EngineError::UnknownFrequency {
                    record: id.to_string(),
                    value: raw.to_string(),
                })
            }
            Err(err) => {
                note(warnings, format!("record '{id}': {err}; no recurrence generated"));
                None
            }
        },
    };

    let until = match (event.until.as_deref(), freq) {
        (Some(raw), _) => Some(parse_date(&id, raw)?),
        (None, Some(_)) => {
            let until = default_until(start, options.default_until_months).ok_or_else(|| {
                EngineError::InvalidDate {
                    record: id.to_string(),
                    value: start_raw.clone(),
                }
            })?;
            event.until = Some(format_timestamp(until));
            Some(until)
        }
        (None, None) => None,
    };

    let repeat = match event.repeat.as_deref() {
        None => Vec::new(),
        Some(raw) => {
            let codes = parse_repeat(raw);
            if let Some(&code) = codes.invalid.first() {
                if options.strict {
                    return Err(EngineError::InvalidRepeat {
                        record: id.to_string(),
                        code,
                    });
                }
                note(
                    warnings,
                    format!("record '{id}': ignoring repeat codes {:?}", codes.invalid),
                );
            }
            codes.days
        }
    };

    if !repeat.is_empty() {
        let names: Vec<&str> = repeat.iter().map(|&day| weekday_name(day)).collect();
        event.repeat_display = Some(names.join(", "));
        event.repeat_week = week_ordinal(week_of_month(start.date())).map(str::to_string);
    }

    let exceptions = event
        .exceptions
        .iter()
        .map(|ex| parse_date(&id, ex.as_str()).map(|ts| ts.date()))
        .collect::<Result<Vec<_>>>()?;

    let location = event.location.clone();
    let event_categories = event.category.clone();

    let mut derived = Taxonomy::new();
    derived.insert("type".to_string(), vec!["event".to_string()]);
    if let Some(freq) = freq {
        derived.insert("event_freq".to_string(), vec![freq.to_string()]);
    }
    if !repeat.is_empty() {
        derived.insert(
            "event_repeat".to_string(),
            repeat.iter().map(|&day| weekday_code(day).to_string()).collect(),
        );
    }
    if let Some(location) = &location {
        derived.insert("event_location".to_string(), vec![location.clone()]);
    }
    record.taxonomy.extend(derived);

    if !event_categories.is_empty() {
        let merged = record.taxonomy.entry("category".to_string()).or_default();
        for category in event_categories {
            if !merged.contains(&category) {
                merged.push(category);
            }
        }
    }

    record.header.date = Some(start_raw);
    record.schedule = Some(Schedule {
        start,
        end,
        until,
        freq,
        repeat,
        location,
        exceptions,
    });

    Ok(true)
}

/// Phase 2: one sibling per additional weekday of a `repeat` pattern.
#[instrument(skip_all)]
fn expand_weekly_phase<C, T>(
    catalog: &mut C,
    taxonomy: &mut T,
    report: &mut ExpansionReport,
) -> Result<()>
where
    C: Catalog + ?Sized,
    T: TaxonomyIndex + ?Sized,
{
    let records = catalog.list_all()?;
    let mut materializer = Materializer::new(catalog, taxonomy);

    for record in records.iter().filter(|r| !r.is_instance()) {
        let Some(schedule) = &record.schedule else {
            continue;
        };
        for occurrence in expand_weekly(schedule.span(), &schedule.repeat) {
            match materializer.materialize(record, occurrence.span, Some(occurrence.rule))? {
                Materialized::Added(_) => report.weekly_instances += 1,
                Materialized::Refreshed(_) | Materialized::Shadowed => report.existing += 1,
                Materialized::Suppressed => report.suppressed += 1,
            }
        }
    }

    Ok(())
}

/// Phase 3: clone every `freq` record forward until its bound.
///
/// Reads the catalog afresh so the siblings written in phase 2 take part.
#[instrument(skip_all)]
fn expand_frequency_phase<C, T>(
    catalog: &mut C,
    taxonomy: &mut T,
    options: &ExpansionOptions,
    report: &mut ExpansionReport,
) -> Result<()>
where
    C: Catalog + ?Sized,
    T: TaxonomyIndex + ?Sized,
{
    let records = catalog.list_all()?;
    let by_id: HashMap<&RecordId, &Record> = records.iter().map(|r| (&r.id, r)).collect();
    let mut materializer = Materializer::new(catalog, taxonomy);

    for record in &records {
        // Only sources and weekly siblings recur; frequency clones never do.
        if record.is_instance() && record.linkage.is_none() {
            continue;
        }
        let Some(schedule) = &record.schedule else {
            continue;
        };
        let (Some(freq), Some(until)) = (schedule.freq, schedule.until) else {
            continue;
        };

        let source = match &record.linkage {
            Some(linkage) => match by_id.get(&linkage.original) {
                Some(original) => *original,
                None => {
                    note(
                        &mut report.warnings,
                        format!(
                            "record '{}': original '{}' not in catalog; cloning the sibling",
                            record.id, linkage.original
                        ),
                    );
                    record
                }
            },
            None => record,
        };

        let span = schedule.span();
        let spans = recurrence_spans(freq, span, until, options.fifth_week);
        report.unresolved += expected_iterations(freq, span.start, until) - spans.len();

        for (_, next) in spans {
            match materializer.materialize(source, next, None)? {
                Materialized::Added(_) => report.frequency_instances += 1,
                Materialized::Refreshed(_) | Materialized::Shadowed => report.existing += 1,
                Materialized::Suppressed => report.suppressed += 1,
            }
        }
    }

    Ok(())
}

fn expected_iterations(freq: Frequency, start: NaiveDateTime, until: NaiveDateTime) -> usize {
    usize::try_from(calculate_count(freq, start, until).saturating_sub(1)).unwrap_or(0)
}

fn parse_date(record: &RecordId, value: &str) -> Result<NaiveDateTime> {
    parse_timestamp(value).ok_or_else(|| EngineError::InvalidDate {
        record: record.to_string(),
        value: value.to_string(),
    })
}

fn note(warnings: &mut Vec<String>, message: String) {
    warn!("{message}");
    warnings.push(message);
}
