//! Collaborators the pipeline reads from and writes into.
//!
//! The host owns storage; the engine only needs a readable/writable view of
//! the records ([`Catalog`]) and an index to notify of taxonomy
//! ([`TaxonomyIndex`]). In-memory implementations back the CLI and tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{EngineError, Result};
use crate::model::{Record, RecordId, Taxonomy};

/// Read/write access to the records of a content catalog.
///
/// `list_all` must reflect every earlier `update` and `add_instance` made
/// through the same value.
pub trait Catalog {
    /// Snapshot of every record, in catalog order.
    fn list_all(&self) -> Result<Vec<Record>>;

    fn get(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Replace an existing record (matched by id).
    fn update(&mut self, record: Record) -> Result<()>;

    /// Insert a generated instance. Must never overwrite a source record.
    fn add_instance(&mut self, record: Record) -> Result<Placement>;
}

/// Where [`Catalog::add_instance`] put a generated record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The id was new to the catalog.
    Inserted,
    /// An instance with the same id was overwritten.
    Replaced,
}

/// Taxonomy lookup index ("all records tagged event", "category = music").
pub trait TaxonomyIndex {
    fn register_taxonomy(&mut self, record: &Record, taxonomy: &Taxonomy) -> Result<()>;
}

/// Insertion-ordered catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from source records.
    ///
    /// # Errors
    /// Returns `EngineError::Catalog` if two records share an id.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Result<Self> {
        let mut catalog = Self::new();
        for record in records {
            catalog.insert(record)?;
        }
        Ok(catalog)
    }

    /// Add a source record.
    ///
    /// # Errors
    /// Returns `EngineError::Catalog` if the id is already present.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        if self.index.contains_key(&record.id) {
            return Err(EngineError::Catalog(format!(
                "duplicate record id '{}'",
                record.id
            )));
        }
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Generated instances, in insertion order.
    pub fn instances(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_instance())
    }

    pub fn find_by_route(&self, route: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.route == route)
    }
}

impl Catalog for MemoryCatalog {
    fn list_all(&self) -> Result<Vec<Record>> {
        Ok(self.records.clone())
    }

    fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        Ok(self.index.get(id).map(|&pos| self.records[pos].clone()))
    }

    fn update(&mut self, record: Record) -> Result<()> {
        let pos = *self
            .index
            .get(&record.id)
            .ok_or_else(|| EngineError::Catalog(format!("no record with id '{}'", record.id)))?;
        self.records[pos] = record;
        Ok(())
    }

    fn add_instance(&mut self, record: Record) -> Result<Placement> {
        match self.index.get(&record.id) {
            Some(&pos) if self.records[pos].is_instance() => {
                self.records[pos] = record;
                Ok(Placement::Replaced)
            }
            Some(_) => Err(EngineError::Catalog(format!(
                "instance '{}' would overwrite a source record",
                record.id
            ))),
            None => {
                self.index.insert(record.id.clone(), self.records.len());
                self.records.push(record);
                Ok(Placement::Inserted)
            }
        }
    }
}

/// `key → value → record ids` taxonomy index held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTaxonomy {
    map: BTreeMap<String, BTreeMap<String, BTreeSet<RecordId>>>,
}

impl MemoryTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records registered under `key = value`, sorted by id.
    pub fn find(&self, key: &str, value: &str) -> Vec<RecordId> {
        self.map
            .get(key)
            .and_then(|values| values.get(value))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Distinct values registered under `key`, sorted.
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.map
            .get(key)
            .map(|values| values.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

impl TaxonomyIndex for MemoryTaxonomy {
    fn register_taxonomy(&mut self, record: &Record, taxonomy: &Taxonomy) -> Result<()> {
        for (key, values) in taxonomy {
            let by_value = self.map.entry(key.clone()).or_default();
            for value in values {
                by_value
                    .entry(value.clone())
                    .or_default()
                    .insert(record.id.clone());
            }
        }
        Ok(())
    }
}
