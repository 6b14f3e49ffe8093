//! Catalog records and the event data attached to them.
//!
//! [`EventDefinition`] is the `event:` block exactly as the host stores it
//! (strings). Preprocessing turns it into a [`Schedule`] with structured
//! timestamps, checked once, which the later phases read instead of the raw
//! strings.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use crate::frequency::Frequency;
use crate::recurrence::DateSpan;

/// Taxonomy of a record: key (`type`, `category`, `event_freq`, …) to values.
pub type Taxonomy = BTreeMap<String, Vec<String>>;

/// Stable identifier of a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// An exception date, either a bare string or a `{ date: ... }` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExceptionDate {
    Bare(String),
    Entry { date: String },
}

impl ExceptionDate {
    pub fn as_str(&self) -> &str {
        match self {
            ExceptionDate::Bare(date) | ExceptionDate::Entry { date } => date,
        }
    }
}

/// The `event:` block of a record header, as written by the author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<String>,
    /// Weekday codes, e.g. `"MWF"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<ExceptionDate>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub category: Vec<String>,
    /// Derived during preprocessing: `"Monday, Wednesday"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_display: Option<String>,
    /// Derived during preprocessing: week of month of the start, `"first"` …
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_week: Option<String>,
}

impl EventDefinition {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_freq(mut self, freq: impl Into<String>) -> Self {
        self.freq = Some(freq.into());
        self
    }

    #[must_use]
    pub fn with_until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }

    #[must_use]
    pub fn with_repeat(mut self, repeat: impl Into<String>) -> Self {
        self.repeat = Some(repeat.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_exception(mut self, date: impl Into<String>) -> Self {
        self.exceptions.push(ExceptionDate::Entry { date: date.into() });
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category.push(category.into());
        self
    }
}

/// Record header (front matter). Unknown keys are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Page date; preprocessing sets it to the event start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventDefinition>,
    /// Occurrence token written by the engine on generated instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The structured form of an [`EventDefinition`], built during preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Present whenever `freq` is; defaulted during preprocessing.
    pub until: Option<NaiveDateTime>,
    pub freq: Option<Frequency>,
    pub repeat: Vec<Weekday>,
    pub location: Option<String>,
    pub exceptions: Vec<NaiveDate>,
}

impl Schedule {
    pub fn span(&self) -> DateSpan {
        DateSpan::new(self.start, self.end)
    }

    /// Same calendar day as one of the exception dates.
    pub fn is_exception(&self, start: NaiveDateTime) -> bool {
        self.exceptions.contains(&start.date())
    }

    #[must_use]
    pub fn with_span(&self, span: DateSpan) -> Self {
        Self {
            start: span.start,
            end: span.end,
            ..self.clone()
        }
    }
}

/// Bookkeeping on a weekly-repeat sibling so the frequency phase can find the
/// record it was generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceLinkage {
    pub rule: Weekday,
    pub token: String,
    pub original: RecordId,
}

/// A page in the catalog: either a source record or a generated instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub path: String,
    pub route: String,
    #[serde(default)]
    pub header: Header,
    #[serde(default, deserialize_with = "taxonomy_map")]
    pub taxonomy: Taxonomy,
    #[serde(default = "no_media")]
    pub media: Arc<[String]>,
    #[serde(skip)]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkage: Option<RecurrenceLinkage>,
    /// Set by the engine on every instance it writes. Header keys such as
    /// `token` are author-controlled and do not mark a record as generated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generated: bool,
}

impl Record {
    pub fn new(id: impl Into<String>, route: impl Into<String>) -> Self {
        let route = route.into();
        Self {
            id: RecordId::new(id),
            path: route.clone(),
            route,
            header: Header::default(),
            taxonomy: Taxonomy::new(),
            media: no_media(),
            schedule: None,
            linkage: None,
            generated: false,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.header.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_event(mut self, event: EventDefinition) -> Self {
        self.header.event = Some(event);
        self
    }

    #[must_use]
    pub fn with_taxonomy<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.taxonomy
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_media<I, S>(mut self, media: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.media = media.into_iter().map(Into::into).collect();
        self
    }

    pub fn event(&self) -> Option<&EventDefinition> {
        self.header.event.as_ref()
    }

    /// Whether this record was generated by the engine.
    pub fn is_instance(&self) -> bool {
        self.generated
    }
}

fn no_media() -> Arc<[String]> {
    Arc::from(Vec::<String>::new())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    OneOrMany::deserialize(deserializer).map(Into::into)
}

fn taxonomy_map<'de, D>(deserializer: D) -> Result<Taxonomy, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into())).collect())
}
