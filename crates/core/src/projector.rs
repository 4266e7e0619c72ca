//! Reverse projection: canonical record → source ingestion payload.
//!
//! The payload is the FHIR rendering of the record, normalised for the source system's
//! ingestion endpoint, plus the flat person-attribute list re-derived through
//! [`crate::bindings::BINDINGS`]. Normalisation runs in a fixed order:
//!
//! 1. strip the resource id;
//! 2. lower-case the administrative gender (defaulting to `unknown`);
//! 3. derive the ingestion extensions and attributes from the binding table;
//! 4. drop blank address lines, then addresses with nothing left.
//!
//! Anything the source system has no attribute type for is reported, never fatal. That
//! includes target members the canonical record could not model (see
//! [`CanonicalPatientRecord::unmodelled`]), one report per member path.

use fhir::{Extension, Patient};
use openmrs::PersonAttributeInput;
use serde::Serialize;

use crate::bindings::{Placement, BINDINGS};
use crate::canonical::{CanonicalPatientRecord, PassThrough, TelecomSystem};
use crate::constants::DEFAULT_GENDER;
use crate::error::ProjectionError;
use crate::render::{normalise_addresses, to_fhir};

/// What gets posted to the source ingestion endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourcePayload {
    #[serde(flatten)]
    pub patient: Patient,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<PersonAttributeInput>,
}

/// A payload and the canonical values it could not carry as source attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct ReverseProjection {
    pub payload: SourcePayload,
    pub unmapped: Vec<ProjectionError>,
}

/// Project a canonical record into a source ingestion payload.
pub fn project(record: &CanonicalPatientRecord) -> ReverseProjection {
    let mut patient = to_fhir(record);
    let mut unmapped = Vec::new();

    patient.id = None;
    patient.gender = Some(normalise_gender(record.gender.as_deref()));

    let mut attributes = Vec::new();
    for binding in BINDINGS {
        let values = (binding.extract)(record);
        let type_id = binding.type_id_string();

        for value in values {
            if let Some(ingest) = binding.ingest_extension {
                add_extension(&mut patient, ingest.placement, ingest.url, &value);
            }
            attributes.push(PersonAttributeInput {
                attribute_type: type_id.clone(),
                value,
            });
        }
    }

    for passthrough in &record.unclassified {
        match passthrough {
            PassThrough::SourceAttribute(attr) => attributes.push(PersonAttributeInput {
                attribute_type: attr.type_id.clone(),
                value: attr.display.clone(),
            }),
            PassThrough::TargetExtension(ext) => unmapped.push(ProjectionError::UnmappableField {
                field: format!("extension {}", ext.url),
                reason: "no source attribute type for this extension".into(),
            }),
        }
    }

    for member in &record.unmodelled {
        unmapped.push(ProjectionError::UnmappableField {
            field: member.path.clone(),
            reason: "no canonical or source representation".into(),
        });
    }

    collect_unmappable(record, &mut unmapped);

    for index in normalise_addresses(&mut patient.address) {
        unmapped.push(ProjectionError::UnmappableField {
            field: format!("address[{index}]"),
            reason: "address is empty once blank lines are removed".into(),
        });
    }

    for err in &unmapped {
        tracing::debug!(error = %err, "not carried into source payload");
    }

    ReverseProjection {
        payload: SourcePayload {
            patient,
            attributes,
        },
        unmapped,
    }
}

fn normalise_gender(gender: Option<&str>) -> String {
    gender
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| DEFAULT_GENDER.to_string())
}

/// Add `url = value` at `placement` unless an identical extension is already there.
fn add_extension(patient: &mut Patient, placement: Placement, url: &str, value: &str) {
    let target = match placement {
        Placement::Record => &mut patient.extension,
        Placement::Name => {
            if patient.name.is_empty() {
                patient.name.push(fhir::HumanName::default());
            }
            &mut patient.name[0].extension
        }
    };

    let present = target
        .iter()
        .any(|e| e.url == url && e.value_string.as_deref() == Some(value));
    if !present {
        target.push(Extension::string(url, value));
    }
}

fn collect_unmappable(record: &CanonicalPatientRecord, unmapped: &mut Vec<ProjectionError>) {
    for (index, telecom) in record.telecom.iter().enumerate() {
        if !matches!(telecom.system, TelecomSystem::Phone | TelecomSystem::Email) {
            unmapped.push(ProjectionError::UnmappableField {
                field: format!("telecom[{index}]"),
                reason: format!(
                    "no source attribute type for system '{}'",
                    telecom.system.to_wire()
                ),
            });
        }
    }

    for (index, identifier) in record.identifiers.iter().enumerate() {
        if !identifier.is_national_identifier() {
            unmapped.push(ProjectionError::UnmappableField {
                field: format!("identifier[{index}]"),
                reason: "only the official national identifier has a source attribute type"
                    .into(),
            });
        }
    }
}
