//! In-memory collaborators and fixtures for engine tests.

use async_trait::async_trait;
use openmrs::{AttributeLink, PatientSummary, SourceRecord};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;
use url::Url;

use crate::error::{IngestError, ResolutionError};
use crate::projector::SourcePayload;
use crate::resolver::ResolvedAttribute;
use crate::source::{IngestAck, SourceSystem, TargetSystem};

fn key(locator: &str) -> String {
    Url::parse(locator)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| locator.to_string())
}

/// A source system backed by hash maps.
#[derive(Default)]
pub struct FakeSource {
    resources: HashMap<String, (Value, u64)>,
    records: HashMap<String, SourceRecord>,
    summaries: Vec<PatientSummary>,
    barrier: Option<Arc<Barrier>>,
    calls: AtomicUsize,
    ingested: Mutex<Vec<SourcePayload>>,
    reject_with: Option<IngestError>,
}

impl FakeSource {
    pub fn with(self, locator: &str, body: Value) -> Self {
        self.with_delayed(locator, body, 0)
    }

    pub fn with_delayed(mut self, locator: &str, body: Value, delay_ms: u64) -> Self {
        self.resources.insert(key(locator), (body, delay_ms));
        self
    }

    /// Every dereference waits on `barrier` before answering.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn with_record(mut self, record_id: &str, record: Value) -> Self {
        let record: SourceRecord = serde_json::from_value(record).expect("fixture record");
        self.records.insert(record_id.to_string(), record);
        self
    }

    pub fn with_summary(mut self, uuid: &str, display: &str, uri: &str) -> Self {
        self.summaries.push(
            serde_json::from_value(serde_json::json!({
                "uuid": uuid,
                "display": display,
                "links": [{ "rel": "self", "uri": uri }]
            }))
            .expect("fixture summary"),
        );
        self
    }

    pub fn rejecting(mut self, err: IngestError) -> Self {
        self.reject_with = Some(err);
        self
    }

    /// Number of dereferences issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn ingested(&self) -> Vec<SourcePayload> {
        self.ingested.lock().expect("lock").clone()
    }
}

#[async_trait]
impl SourceSystem for FakeSource {
    async fn search(&self, name: &str) -> Result<Vec<PatientSummary>, ResolutionError> {
        let needle = name.to_lowercase();
        Ok(self
            .summaries
            .iter()
            .filter(|s| s.display.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn fetch_record(&self, record_id: &str) -> Result<SourceRecord, ResolutionError> {
        self.records
            .get(record_id)
            .cloned()
            .ok_or_else(|| ResolutionError::NotFound {
                locator: record_id.to_string(),
            })
    }

    async fn dereference(&self, locator: &Url) -> Result<Value, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        let Some((body, delay_ms)) = self.resources.get(locator.as_str()) else {
            return Err(ResolutionError::NotFound {
                locator: locator.to_string(),
            });
        };
        if *delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
        }
        Ok(body.clone())
    }

    async fn ingest(&self, payload: &SourcePayload) -> Result<IngestAck, IngestError> {
        if let Some(err) = &self.reject_with {
            return Err(err.clone());
        }
        self.ingested.lock().expect("lock").push(payload.clone());
        Ok(IngestAck {
            status: 200,
            id: Some("new-source-id".into()),
            body: serde_json::json!({ "status": "ok" }),
        })
    }
}

/// A FHIR server backed by a hash map.
#[derive(Default)]
pub struct FakeTarget {
    patients: HashMap<String, fhir::Patient>,
    created: Mutex<Vec<fhir::Patient>>,
    reject_with: Option<IngestError>,
}

impl FakeTarget {
    pub fn with_patient(mut self, id: &str, patient: fhir::Patient) -> Self {
        self.patients.insert(id.to_string(), patient);
        self
    }

    pub fn rejecting(mut self, err: IngestError) -> Self {
        self.reject_with = Some(err);
        self
    }

    pub fn created(&self) -> Vec<fhir::Patient> {
        self.created.lock().expect("lock").clone()
    }
}

#[async_trait]
impl TargetSystem for FakeTarget {
    async fn search(&self, name: &str) -> Result<Vec<fhir::Patient>, ResolutionError> {
        let needle = name.to_lowercase();
        let mut ids: Vec<_> = self.patients.keys().collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.patients.get(id))
            .filter(|p| {
                p.name.iter().any(|n| {
                    n.family
                        .iter()
                        .chain(n.given.iter())
                        .any(|part| part.to_lowercase().contains(&needle))
                })
            })
            .cloned()
            .collect())
    }

    async fn fetch_patient(&self, id: &str) -> Result<fhir::Patient, ResolutionError> {
        self.patients
            .get(id)
            .cloned()
            .ok_or_else(|| ResolutionError::NotFound {
                locator: format!("Patient/{id}"),
            })
    }

    async fn create_patient(&self, patient: &fhir::Patient) -> Result<IngestAck, IngestError> {
        if let Some(err) = &self.reject_with {
            return Err(err.clone());
        }
        self.created.lock().expect("lock").push(patient.clone());
        Ok(IngestAck {
            status: 201,
            id: Some("2001".into()),
            body: serde_json::json!({ "resourceType": "Patient", "id": "2001" }),
        })
    }
}

/// Body of a dereferenced person attribute.
pub fn attribute_body(type_id: &str, display: &str) -> Value {
    serde_json::json!({
        "uuid": format!("attr-{display}"),
        "display": display,
        "value": display,
        "attributeType": { "uuid": type_id },
        "voided": false
    })
}

pub fn link(id: &str, locator: &str) -> AttributeLink {
    AttributeLink {
        id: id.to_string(),
        display: String::new(),
        locator: Some(locator.to_string()),
    }
}

pub fn resolved(type_id: &str, display: &str) -> ResolvedAttribute {
    ResolvedAttribute {
        link_id: format!("link-{type_id}"),
        type_id: type_id.to_string(),
        type_display: None,
        display: display.to_string(),
        voided: false,
        address: None,
    }
}
