//! Collaborator boundary.
//!
//! The engine never speaks HTTP itself. It is handed implementations of these traits: the
//! `bridge-transport` crate provides the real ones, tests provide in-memory fakes. Retries,
//! authentication and connection pooling are the implementor's business.

use async_trait::async_trait;
use openmrs::{PatientSummary, SourceRecord};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::error::{IngestError, ResolutionError};
use crate::projector::SourcePayload;

/// Acknowledgement of an accepted submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IngestAck {
    pub status: u16,
    /// Identifier the receiving system assigned, when it reports one.
    pub id: Option<String>,
    /// The response body, verbatim.
    pub body: Value,
}

/// The person-attribute system (system A).
#[async_trait]
pub trait SourceSystem: Send + Sync {
    /// Query by name. The order of the returned summaries is the system's own.
    async fn search(&self, name: &str) -> Result<Vec<PatientSummary>, ResolutionError>;

    /// Fetch the source-shaped record a summary points at.
    async fn fetch_record(&self, record_id: &str) -> Result<SourceRecord, ResolutionError>;

    /// Dereference a single link and return the resource body.
    async fn dereference(&self, locator: &Url) -> Result<Value, ResolutionError>;

    /// Submit a reverse-projected payload.
    async fn ingest(&self, payload: &SourcePayload) -> Result<IngestAck, IngestError>;
}

/// The FHIR server (system B).
#[async_trait]
pub trait TargetSystem: Send + Sync {
    async fn search(&self, name: &str) -> Result<Vec<fhir::Patient>, ResolutionError>;

    async fn fetch_patient(&self, id: &str) -> Result<fhir::Patient, ResolutionError>;

    async fn create_patient(&self, patient: &fhir::Patient) -> Result<IngestAck, IngestError>;
}

#[async_trait]
impl<S: SourceSystem + ?Sized> SourceSystem for Arc<S> {
    async fn search(&self, name: &str) -> Result<Vec<PatientSummary>, ResolutionError> {
        (**self).search(name).await
    }

    async fn fetch_record(&self, record_id: &str) -> Result<SourceRecord, ResolutionError> {
        (**self).fetch_record(record_id).await
    }

    async fn dereference(&self, locator: &Url) -> Result<Value, ResolutionError> {
        (**self).dereference(locator).await
    }

    async fn ingest(&self, payload: &SourcePayload) -> Result<IngestAck, IngestError> {
        (**self).ingest(payload).await
    }
}

#[async_trait]
impl<T: TargetSystem + ?Sized> TargetSystem for Arc<T> {
    async fn search(&self, name: &str) -> Result<Vec<fhir::Patient>, ResolutionError> {
        (**self).search(name).await
    }

    async fn fetch_patient(&self, id: &str) -> Result<fhir::Patient, ResolutionError> {
        (**self).fetch_patient(id).await
    }

    async fn create_patient(&self, patient: &fhir::Patient) -> Result<IngestAck, IngestError> {
        (**self).create_patient(patient).await
    }
}
