//! Error taxonomy for the transformation engine.
//!
//! Only [`ConfigError`] and [`TransferError`] ever abort an operation. The others are collected
//! per attribute or per field and reported next to whatever could be assembled.

use crate::canonical::CanonicalField;

/// Failure to fetch or decode a single remote resource.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("resource not found: {locator}")]
    NotFound { locator: String },

    #[error("resource unreachable at {locator}: {reason}")]
    Unreachable { locator: String, reason: String },

    #[error("malformed payload from {locator}: {reason}")]
    MalformedPayload { locator: String, reason: String },

    #[error("invalid locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("remote system reported an error at {locator}: {message}")]
    Remote { locator: String, message: String },
}

impl ResolutionError {
    pub fn locator(&self) -> &str {
        match self {
            ResolutionError::NotFound { locator }
            | ResolutionError::Unreachable { locator, .. }
            | ResolutionError::MalformedPayload { locator, .. }
            | ResolutionError::InvalidLocator { locator, .. }
            | ResolutionError::Remote { locator, .. } => locator,
        }
    }
}

/// A resolved attribute that is structurally unusable.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("attribute {link_id} of type {type_id} is missing {missing}")]
    IncompleteAttribute {
        link_id: String,
        type_id: String,
        missing: &'static str,
    },
}

/// A canonical value the reverse projection could not carry into the source payload.
///
/// Informational: projection always produces a payload.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
    #[error("{field} cannot be represented in the source system: {reason}")]
    UnmappableField { field: String, reason: String },
}

/// Two or more fragments targeted a field that normally holds one value. Both were kept.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{count} values assembled into {field:?}; all were kept")]
pub struct AssemblyInconsistency {
    pub field: CanonicalField,
    pub count: usize,
}

/// The receiving system refused or never saw a submitted payload.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// The remote system answered with an error; `message` is its own text.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("ingestion endpoint unreachable: {reason}")]
    Unreachable { reason: String },
}

/// Invalid startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Failure of a whole transfer operation.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("search failed: {0}")]
    Search(#[source] ResolutionError),

    #[error("failed to fetch record: {0}")]
    RecordFetch(#[source] ResolutionError),

    #[error("patient summary {uuid} has no link to its record")]
    MissingRecordLink { uuid: String },

    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),
}

pub type TransferResult<T> = std::result::Result<T, TransferError>;
