//! # event-engine
//!
//! Deterministic expansion of declarative event records into concrete, dated
//! catalog instances.
//!
//! A record's `event` block may declare a weekly repeat pattern (`repeat: MWF`)
//! and/or a frequency recurrence (`freq: monthly`, bounded by `until`). The
//! engine enumerates every resulting occurrence, gives each a stable 6-character
//! token and a unique path, honours exception dates, and aggregates categories
//! across the pass.
//!
//! ## Modules
//!
//! - [`datemath`] — weekday distance, interval counts, "nth weekday of month"
//! - [`frequency`] — `daily | weekly | monthly | yearly` and weekday codes
//! - [`recurrence`] — iteration counts and per-iteration date spans
//! - [`repeat`] — sibling instances for multi-weekday repeat patterns
//! - [`materialize`] — turns a source record + date span into an instance
//! - [`pipeline`] — the three-phase pass over a whole catalog
//! - [`catalog`] — collaborator traits and in-memory implementations
//! - [`model`] — records, headers, event definitions
//! - [`error`] — Error types

pub mod catalog;
pub mod datemath;
pub mod error;
pub mod frequency;
pub mod materialize;
pub mod model;
pub mod pipeline;
pub mod recurrence;
pub mod repeat;

pub use catalog::{Catalog, MemoryCatalog, MemoryTaxonomy, Placement, TaxonomyIndex};
pub use error::EngineError;
pub use frequency::Frequency;
pub use materialize::Materialized;
pub use model::{EventDefinition, Record, RecordId};
pub use pipeline::{expand_all, EventCategories, Expansion, ExpansionOptions, ExpansionReport, Phase};
pub use recurrence::{DateSpan, FifthWeekPolicy};
