//! Transfer workflow.
//!
//! [`TransferService`] wires the engine stages to a pair of collaborators:
//!
//! - forward: fetch source record → resolve attributes and address concurrently → map →
//!   assemble → render → create on the FHIR server;
//! - reverse: fetch FHIR patient → read into canonical form → project → ingest into source.
//!
//! Partial results are normal. Per-link failures, drops and inconsistencies go into a
//! [`TransferReport`] next to the record; only whole-operation failures are errors.

use openmrs::PatientSummary;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::address::resolve_address;
use crate::assembler::assemble;
use crate::bindings::ProjectionContext;
use crate::canonical::CanonicalPatientRecord;
use crate::error::{ResolutionError, TransferError, TransferResult};
use crate::mapper::{map_attributes, DroppedAttribute};
use crate::projector::{project, ReverseProjection};
use crate::render::{from_fhir, normalise_addresses, to_fhir};
use crate::resolver::{partition, resolve_attributes, ResolutionFailure};
use crate::source::{IngestAck, SourceSystem, TargetSystem};

/// What went wrong, short of failing, while building a canonical record.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TransferReport {
    pub resolution_failures: Vec<ResolutionFailure>,
    pub address_failure: Option<String>,
    pub mapping_errors: Vec<String>,
    pub dropped: Vec<DroppedAttribute>,
    pub inconsistencies: Vec<String>,
}

impl TransferReport {
    pub fn is_clean(&self) -> bool {
        self.resolution_failures.is_empty()
            && self.address_failure.is_none()
            && self.mapping_errors.is_empty()
            && self.dropped.is_empty()
            && self.inconsistencies.is_empty()
    }

    /// One line per entry, in report order.
    pub fn messages(&self) -> Vec<String> {
        let resolution = self
            .resolution_failures
            .iter()
            .map(|f| format!("attribute {} not resolved: {}", f.link_id, f.error));
        let address = self
            .address_failure
            .iter()
            .map(|err| format!("address not resolved: {err}"));
        let dropped = self.dropped.iter().map(|d| {
            format!(
                "attribute {} of type {} dropped: {}",
                d.link_id,
                d.type_id,
                d.reason.as_str()
            )
        });

        resolution
            .chain(address)
            .chain(self.mapping_errors.iter().cloned())
            .chain(dropped)
            .chain(self.inconsistencies.iter().cloned())
            .collect()
    }
}

/// A canonical record assembled from the source system.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForwardTransfer {
    pub record: CanonicalPatientRecord,
    pub report: TransferReport,
}

/// Outcome of creating a source record on the FHIR server.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForwardOutcome {
    pub transfer: ForwardTransfer,
    pub submitted: fhir::Patient,
    pub ack: IngestAck,
}

/// Outcome of ingesting a FHIR patient into the source system.
#[derive(Clone, Debug, PartialEq)]
pub struct ReverseOutcome {
    pub projection: ReverseProjection,
    pub ack: IngestAck,
}

pub struct TransferService<S, T> {
    source: S,
    target: T,
    fetch_timeout: Duration,
}

impl<S, T> TransferService<S, T>
where
    S: SourceSystem,
    T: TargetSystem,
{
    pub fn new(source: S, target: T, fetch_timeout: Duration) -> Self {
        Self {
            source,
            target,
            fetch_timeout,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    // ------------------------------------------------------------------------
    // Forward
    // ------------------------------------------------------------------------

    /// Search the source system by name.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Search`] if the source cannot be queried.
    pub async fn search_source(&self, name: &str) -> TransferResult<Vec<PatientSummary>> {
        self.timed("source search", self.source.search(name))
            .await
            .map_err(TransferError::Search)
    }

    /// Build a canonical record for the record a search summary points at.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::MissingRecordLink`] if the summary has no usable link, and
    /// otherwise as [`TransferService::load_canonical`].
    pub async fn load_summary(&self, summary: &PatientSummary) -> TransferResult<ForwardTransfer> {
        let record_id = summary
            .record_id()
            .ok_or_else(|| TransferError::MissingRecordLink {
                uuid: summary.uuid.clone(),
            })?;
        self.load_canonical(record_id).await
    }

    /// Fetch a source record and assemble its canonical form.
    ///
    /// Attribute links and the address link are resolved concurrently. Individual failures
    /// are reported in the returned [`TransferReport`].
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::RecordFetch`] if the record itself cannot be fetched.
    pub async fn load_canonical(&self, record_id: &str) -> TransferResult<ForwardTransfer> {
        let record = self
            .timed("source record", self.source.fetch_record(record_id))
            .await
            .map_err(TransferError::RecordFetch)?;

        let links = record.attribute_links();
        let (resolutions, address) = tokio::join!(
            resolve_attributes(&self.source, &links, self.fetch_timeout),
            resolve_address(&self.source, &record, self.fetch_timeout),
        );

        let (mut resolved, resolution_failures) = partition(resolutions);
        let address_failure = match address {
            Ok(address) => {
                resolved.push(address);
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "address resolution failed");
                Some(err.to_string())
            }
        };

        let ctx = ProjectionContext {
            administrative_gender: record.gender.as_deref(),
        };
        let mapped = map_attributes(&resolved, &ctx);
        let assembled = assemble(&record, &mapped);

        let report = TransferReport {
            resolution_failures,
            address_failure,
            mapping_errors: mapped.errors.iter().map(ToString::to_string).collect(),
            dropped: mapped.dropped.clone(),
            inconsistencies: assembled
                .inconsistencies
                .iter()
                .map(ToString::to_string)
                .collect(),
        };

        tracing::info!(
            record_id,
            links = links.len(),
            failures = report.resolution_failures.len(),
            clean = report.is_clean(),
            "assembled canonical record"
        );

        Ok(ForwardTransfer {
            record: assembled.record,
            report,
        })
    }

    /// Assemble a source record and create it on the FHIR server.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Ingest`] with the server's own message if it rejects the
    /// patient, and otherwise as [`TransferService::load_canonical`].
    pub async fn transfer_to_target(&self, record_id: &str) -> TransferResult<ForwardOutcome> {
        let transfer = self.load_canonical(record_id).await?;

        let mut patient = to_fhir(&transfer.record);
        patient.id = None;
        normalise_addresses(&mut patient.address);

        let ack = self.target.create_patient(&patient).await?;
        tracing::info!(record_id, status = ack.status, target_id = ?ack.id, "created on target");

        Ok(ForwardOutcome {
            transfer,
            submitted: patient,
            ack,
        })
    }

    // ------------------------------------------------------------------------
    // Reverse
    // ------------------------------------------------------------------------

    /// Search the FHIR server by name.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Search`] if the server cannot be queried.
    pub async fn search_target(&self, name: &str) -> TransferResult<Vec<fhir::Patient>> {
        self.timed("target search", self.target.search(name))
            .await
            .map_err(TransferError::Search)
    }

    /// Fetch a FHIR patient and project it into a source payload without submitting it.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::RecordFetch`] if the patient cannot be fetched.
    pub async fn prepare_reverse(&self, patient_id: &str) -> TransferResult<ReverseProjection> {
        let patient = self
            .timed("target patient", self.target.fetch_patient(patient_id))
            .await
            .map_err(TransferError::RecordFetch)?;

        let record = from_fhir(&patient);
        let projection = project(&record);
        if !projection.unmapped.is_empty() {
            tracing::warn!(
                patient_id,
                unmapped = projection.unmapped.len(),
                "some fields have no source representation"
            );
        }
        Ok(projection)
    }

    /// Fetch a FHIR patient, project it and ingest it into the source system.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Ingest`] with the source's own message if it rejects the
    /// payload, and otherwise as [`TransferService::prepare_reverse`].
    pub async fn transfer_to_source(&self, patient_id: &str) -> TransferResult<ReverseOutcome> {
        let projection = self.prepare_reverse(patient_id).await?;
        let ack = self.source.ingest(&projection.payload).await?;
        tracing::info!(patient_id, status = ack.status, "ingested into source");
        Ok(ReverseOutcome { projection, ack })
    }

    async fn timed<V, F>(&self, what: &str, fut: F) -> Result<V, ResolutionError>
    where
        F: Future<Output = Result<V, ResolutionError>>,
    {
        match tokio::time::timeout(self.fetch_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ResolutionError::Unreachable {
                locator: what.to_string(),
                reason: format!("timed out after {} ms", self.fetch_timeout.as_millis()),
            }),
        }
    }
}
