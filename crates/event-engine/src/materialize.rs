//! Instance materialization -- turns a source record and a computed date span
//! into a uniquely addressable catalog record.

use chrono::{NaiveDateTime, Weekday};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::catalog::{Catalog, Placement, TaxonomyIndex};
use crate::datemath::format_timestamp;
use crate::error::Result;
use crate::model::{Record, RecordId, RecurrenceLinkage};
use crate::recurrence::DateSpan;

/// Length of an instance token in hex characters.
pub const TOKEN_LEN: usize = 6;

/// Deterministic 6-character token for an occurrence of `source` starting at `start`.
///
/// The same (source, start) pair always yields the same token, so an instance
/// keeps its address across passes. Collisions between occurrences of one
/// source are possible in principle (24 bits) and are not detected here.
pub fn fingerprint(source: &RecordId, start: NaiveDateTime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(format_timestamp(start).as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..TOKEN_LEN].to_string()
}

/// Build the instance record for `source` at `span` without touching any
/// collaborator.
///
/// Returns `None` when `span.start` falls on one of the source's exception
/// dates. `rule` is set when the call comes from weekly-repeat expansion; the
/// instance is then linked back to `source` for the frequency phase.
pub fn build_instance(source: &Record, span: DateSpan, rule: Option<Weekday>) -> Option<Record> {
    if source
        .schedule
        .as_ref()
        .is_some_and(|schedule| schedule.is_exception(span.start))
    {
        return None;
    }

    let token = fingerprint(&source.id, span.start);
    let mut instance = source.clone();

    let start = format_timestamp(span.start);
    instance.header.date = Some(start.clone());
    if let Some(event) = instance.header.event.as_mut() {
        event.start = Some(start);
        event.end = Some(format_timestamp(span.end));
    }
    instance.header.token = Some(token.clone());
    instance.generated = true;
    instance.schedule = source.schedule.as_ref().map(|s| s.with_span(span));

    // A source that is itself a weekly sibling already ends in its own token.
    let (base_path, base_route) = match &source.linkage {
        Some(linkage) => {
            let segment = format!("/{}", linkage.token);
            (
                strip_segment(&source.path, &segment),
                strip_segment(&source.route, &segment),
            )
        }
        None => (source.path.as_str(), source.route.as_str()),
    };
    instance.path = format!("{base_path}/{token}");
    instance.route = format!("{base_route}/{token}");
    instance.id = RecordId::new(instance.path.clone());

    instance.linkage = rule.map(|rule| RecurrenceLinkage {
        rule,
        token,
        original: source.id.clone(),
    });

    Some(instance)
}

fn strip_segment<'a>(value: &'a str, segment: &str) -> &'a str {
    value.strip_suffix(segment).unwrap_or(value)
}

/// What [`Materializer::materialize`] did with one occurrence.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// A new instance was written.
    Added(Record),
    /// An instance with the same id was already present and was rewritten.
    Refreshed(Record),
    /// A weekly sibling already holds this occurrence; the catalog is unchanged.
    Shadowed,
    /// The occurrence falls on an exception date.
    Suppressed,
}

impl Materialized {
    /// Whether the catalog gained a record.
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// Writes materialized instances into the catalog and taxonomy index.
pub struct Materializer<'a, C: ?Sized, T: ?Sized> {
    catalog: &'a mut C,
    taxonomy: &'a mut T,
}

impl<'a, C, T> Materializer<'a, C, T>
where
    C: Catalog + ?Sized,
    T: TaxonomyIndex + ?Sized,
{
    pub fn new(catalog: &'a mut C, taxonomy: &'a mut T) -> Self {
        Self { catalog, taxonomy }
    }

    /// Materialize and register one occurrence.
    ///
    /// A frequency clone (`rule == None`) never replaces an instance that
    /// carries a [`RecurrenceLinkage`].
    ///
    /// # Errors
    /// Propagates catalog and taxonomy failures.
    pub fn materialize(
        &mut self,
        source: &Record,
        span: DateSpan,
        rule: Option<Weekday>,
    ) -> Result<Materialized> {
        let Some(instance) = build_instance(source, span, rule) else {
            debug!(source = %source.id, start = %span.start, "occurrence falls on an exception date");
            return Ok(Materialized::Suppressed);
        };

        if rule.is_none() {
            let existing = self.catalog.get(&instance.id)?;
            if existing.is_some_and(|r| r.is_instance() && r.linkage.is_some()) {
                debug!(source = %source.id, route = %instance.route, "occurrence held by a weekly sibling");
                return Ok(Materialized::Shadowed);
            }
        }

        let placement = self.catalog.add_instance(instance.clone())?;
        self.taxonomy
            .register_taxonomy(&instance, &instance.taxonomy)?;
        debug!(source = %source.id, route = %instance.route, start = %span.start, ?placement, "instance written");
        Ok(match placement {
            Placement::Inserted => Materialized::Added(instance),
            Placement::Replaced => Materialized::Refreshed(instance),
        })
    }
}
