//! Source-system wire/boundary support.
//!
//! The source system exposes patients through a small proxy in front of an OpenMRS/Bahmni
//! installation. Demographic facts arrive as *person attributes*: each one a link that must be
//! dereferenced before its type or value is known. This crate models those payloads as they
//! appear on the wire:
//! - search results ([`search::PatientSummary`])
//! - the partially-populated source record ([`record::SourceRecord`])
//! - attribute links and their dereferenced details ([`attribute`])
//! - dereferenced person addresses ([`address::AddressDetail`])
//! - the proxy's `{data, message, status}` envelope ([`Envelope`])
//! - attribute values sent back on ingestion ([`ingest`])
//!
//! Clinical meaning (which attribute type is a phone number, and so on) lives in
//! `bridge-core`. This crate handles payload shapes only.

pub mod address;
pub mod attribute;
pub mod ingest;
pub mod record;
pub mod search;

pub use address::AddressDetail;
pub use attribute::{AttributeLink, AttributeLinkWire, AttributeTypeRef, PersonAttributeDetail};
pub use ingest::{PersonAttributeInput, RemoteMessage};
pub use record::{PartialAddress, RecordResponse, SourceRecord};
pub use search::{Link, PatientSummary, SearchResponse};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the `openmrs` boundary crate.
#[derive(Debug, Error)]
pub enum OpenmrsError {
    #[error("payload schema mismatch at {path}: {message}")]
    Schema { path: String, message: String },

    #[error("source system reported an error: {0}")]
    Remote(String),
}

/// Type alias for Results that can fail with an [`OpenmrsError`].
pub type OpenmrsResult<T> = Result<T, OpenmrsError>;

/// Wrapper the proxy puts around every dereferenced resource.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Envelope<T> {
    pub data: T,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub status: Option<String>,
}

/// Decode a JSON value into `T`, reporting the failing member path.
///
/// # Errors
///
/// Returns [`OpenmrsError::Schema`] if the value does not match `T`.
pub fn decode<T>(value: serde_json::Value) -> OpenmrsResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = err.path().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        OpenmrsError::Schema {
            path,
            message: err.into_inner().to_string(),
        }
    })
}
