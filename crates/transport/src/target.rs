//! Client for the FHIR server.

use async_trait::async_trait;
use bridge_core::{IngestAck, IngestError, ResolutionError, TargetSystem};
use fhir::{Bundle, Patient};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::http::{check_status, endpoint, read_json, remote_message, send_error};
use crate::TransportResult;

const FHIR_JSON: &str = "application/fhir+json";

pub struct TargetHttpClient {
    http: Client,
    base: Url,
}

impl TargetHttpClient {
    /// Create a client for the FHIR server at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TransportError::Client`] if the HTTP client cannot be built.
    pub fn new(base: Url, timeout: Duration) -> TransportResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    async fn get(&self, url: &Url) -> Result<Value, ResolutionError> {
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url.clone())
            .header("Accept", FHIR_JSON)
            .send()
            .await
            .map_err(|e| send_error(url, &e))?;
        let response = check_status(url, response).await?;
        read_json(url, response).await
    }
}

fn malformed(url: &Url, err: fhir::FhirError) -> ResolutionError {
    ResolutionError::MalformedPayload {
        locator: url.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl TargetSystem for TargetHttpClient {
    async fn search(&self, name: &str) -> Result<Vec<Patient>, ResolutionError> {
        let url = endpoint(&self.base, &["Patient"], &[("name", name)])?;
        let body = self.get(&url).await?;
        Bundle::patients_from_value(body).map_err(|e| malformed(&url, e))
    }

    async fn fetch_patient(&self, id: &str) -> Result<Patient, ResolutionError> {
        let url = endpoint(&self.base, &["Patient", id], &[])?;
        let body = self.get(&url).await?;
        Patient::from_value(body).map_err(|e| malformed(&url, e))
    }

    async fn create_patient(&self, patient: &Patient) -> Result<IngestAck, IngestError> {
        let url = endpoint(&self.base, &["Patient"], &[]).map_err(|e| IngestError::Unreachable {
            reason: e.to_string(),
        })?;
        let body = serde_json::to_vec(patient).map_err(|e| IngestError::Rejected {
            status: 0,
            message: format!("could not serialise patient: {e}"),
        })?;
        tracing::debug!(%url, "POST");

        let response = self
            .http
            .post(url.clone())
            .header("Content-Type", FHIR_JSON)
            .header("Accept", FHIR_JSON)
            .body(body)
            .send()
            .await
            .map_err(|e| IngestError::Unreachable {
                reason: send_error(&url, &e).to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(IngestError::Rejected {
                status: status.as_u16(),
                message: remote_message(status, &text),
            });
        }

        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        let id = body.get("id").and_then(Value::as_str).map(str::to_string);
        Ok(IngestAck {
            status: status.as_u16(),
            id,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> TargetHttpClient {
        let base = Url::parse(&format!("{}/fhir", server.uri())).expect("url");
        TargetHttpClient::new(base, Duration::from_secs(2)).expect("client")
    }

    #[tokio::test]
    async fn search_reads_patients_from_bundle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhir/Patient"))
            .and(query_param("name", "Soto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "resourceType": "Bundle",
                "type": "searchset",
                "entry": [
                    { "resource": { "resourceType": "Patient", "id": "1", "name": [{ "family": "Soto" }] } },
                    { "resource": { "resourceType": "OperationOutcome" } }
                ]
            })))
            .mount(&server)
            .await;

        let patients = client(&server).await.search("Soto").await.expect("search");
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn missing_patient_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhir/Patient/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .fetch_patient("404")
            .await
            .expect_err("missing");
        assert!(matches!(err, ResolutionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_posts_fhir_json_and_reads_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fhir/Patient"))
            .and(header("Content-Type", FHIR_JSON))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "resourceType": "Patient", "id": "2001"
            })))
            .mount(&server)
            .await;

        let ack = client(&server)
            .await
            .create_patient(&Patient::default())
            .await
            .expect("created");
        assert_eq!(ack.status, 201);
        assert_eq!(ack.id.as_deref(), Some("2001"));
    }

    #[tokio::test]
    async fn rejection_returns_operation_outcome_diagnostics() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fhir/Patient"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "resourceType": "OperationOutcome",
                "issue": [{ "severity": "error", "diagnostics": "Patient.birthDate: invalid date" }]
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .create_patient(&Patient::default())
            .await
            .expect_err("rejected");
        assert_eq!(
            err,
            IngestError::Rejected {
                status: 422,
                message: "Patient.birthDate: invalid date".into()
            }
        );
    }
}
