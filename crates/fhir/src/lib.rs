//! FHIR wire/boundary support for the record bridge.
//!
//! This crate provides **wire models** and **format helpers** for the FHIR side of a transfer:
//! - the `Patient` resource as exchanged with a FHIR R4 server
//! - search `Bundle`s returned by name queries
//!
//! This crate focuses on:
//! - serialisation/deserialisation with field-path error reporting
//! - small constructors that keep the mapping code readable
//!
//! It carries no mapping rules. Which extension URL means what is decided by `bridge-core`.

pub mod bundle;
pub mod patient;

pub use bundle::Bundle;
pub use patient::{
    Address, CodeableConcept, Coding, ContactPoint, Extension, HumanName, Identifier,
    IdentifierType, NameUse, Patient,
};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
