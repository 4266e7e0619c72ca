//! # Bridge Core
//!
//! Transformation and resolution engine for moving patient records between a person-attribute
//! source system and a FHIR server.
//!
//! The forward path runs:
//! - [`resolver`]: follow every attribute link concurrently, one result per link
//! - [`mapper`]: project resolved attributes through the [`bindings`] table
//! - [`address`]: follow the address link and merge it with the embedded partial address
//! - [`assembler`]: fold everything into a [`canonical::CanonicalPatientRecord`]
//! - [`render`]: render the canonical record as a FHIR `Patient`
//!
//! The reverse path reads a FHIR `Patient` with [`render::from_fhir`] and builds the source
//! ingestion payload with [`projector::project`].
//!
//! **No transport concerns**: HTTP clients live in `bridge-transport` and are handed in through
//! the traits in [`source`]. [`transfer::TransferService`] wires the stages together.

pub mod address;
pub mod assembler;
pub mod bindings;
pub mod canonical;
pub mod codes;
pub mod config;
pub mod constants;
pub mod error;
pub mod mapper;
pub mod projector;
pub mod render;
pub mod resolver;
pub mod source;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use canonical::CanonicalPatientRecord;
pub use config::{BridgeConfig, EnvValues};
pub use error::{
    AssemblyInconsistency, ConfigError, IngestError, MappingError, ProjectionError,
    ResolutionError, TransferError, TransferResult,
};
pub use projector::{ReverseProjection, SourcePayload};
pub use source::{IngestAck, SourceSystem, TargetSystem};
pub use transfer::{ForwardOutcome, ForwardTransfer, ReverseOutcome, TransferReport, TransferService};
