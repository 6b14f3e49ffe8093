//! Error types for event-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid date in record '{record}': {value:?}")]
    InvalidDate { record: String, value: String },

    #[error("Unknown frequency in record '{record}': {value:?}")]
    UnknownFrequency { record: String, value: String },

    #[error("Invalid repeat code in record '{record}': {code:?}")]
    InvalidRepeat { record: String, code: char },

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Taxonomy error: {0}")]
    Taxonomy(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
