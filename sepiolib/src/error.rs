//! Единый тип ошибок публичного API.

use crate::model::ValidationResult;
use crate::schema::MessageFamily;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SepioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed XML: {0}")]
    MalformedXml(String),

    #[error("unrecognized namespace: {0}")]
    UnrecognizedNamespace(String),

    #[error("unsupported {family} version {version}")]
    UnsupportedVersion {
        family: MessageFamily,
        version: String,
    },

    #[error("schema validation failed: {0}")]
    SchemaValidation(ValidationResult),

    #[error("entry {index}: missing required {field}")]
    IncompleteEntry { index: usize, field: &'static str },

    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, SepioError>;
