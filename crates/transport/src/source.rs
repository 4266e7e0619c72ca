//! Client for the proxy in front of the person-attribute system.
//!
//! Endpoints:
//! - `GET search?name=` → `{results}` or `{error}`
//! - `GET search_by_id?id=` → `{fhir}`
//! - `GET review_url?url=` → `{data, message, status}`; only `data` is returned
//! - `POST map` accepts a reverse-projected payload

use async_trait::async_trait;
use bridge_core::{IngestAck, IngestError, ResolutionError, SourcePayload, SourceSystem};
use openmrs::{Envelope, PatientSummary, RecordResponse, SearchResponse, SourceRecord};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::http::{check_status, endpoint, read_json, remote_message, send_error};
use crate::TransportResult;

pub struct SourceHttpClient {
    http: Client,
    base: Url,
}

impl SourceHttpClient {
    /// Create a client for the proxy at `base`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TransportError::Client`] if the HTTP client cannot be built.
    pub fn new(base: Url, timeout: Duration) -> TransportResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    async fn get_json(&self, url: Url) -> Result<Value, ResolutionError> {
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| send_error(&url, &e))?;
        let response = check_status(&url, response).await?;
        read_json(&url, response).await
    }
}

fn decode<T: serde::de::DeserializeOwned>(url: &Url, value: Value) -> Result<T, ResolutionError> {
    openmrs::decode(value).map_err(|e| ResolutionError::MalformedPayload {
        locator: url.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl SourceSystem for SourceHttpClient {
    async fn search(&self, name: &str) -> Result<Vec<PatientSummary>, ResolutionError> {
        let url = endpoint(&self.base, &["search"], &[("name", name)])?;
        let body: SearchResponse = decode(&url, self.get_json(url.clone()).await?)?;
        body.into_results().map_err(|e| ResolutionError::Remote {
            locator: url.to_string(),
            message: match e {
                openmrs::OpenmrsError::Remote(message) => message,
                other => other.to_string(),
            },
        })
    }

    async fn fetch_record(&self, record_id: &str) -> Result<SourceRecord, ResolutionError> {
        let url = endpoint(&self.base, &["search_by_id"], &[("id", record_id)])?;
        let body: RecordResponse = decode(&url, self.get_json(url.clone()).await?)?;
        Ok(body.fhir)
    }

    async fn dereference(&self, locator: &Url) -> Result<Value, ResolutionError> {
        let url = endpoint(&self.base, &["review_url"], &[("url", locator.as_str())])?;
        let envelope: Envelope<Value> = decode(&url, self.get_json(url.clone()).await?)?;

        if envelope.data.is_null() {
            return Err(ResolutionError::NotFound {
                locator: locator.to_string(),
            });
        }
        Ok(envelope.data)
    }

    async fn ingest(&self, payload: &SourcePayload) -> Result<IngestAck, IngestError> {
        let url = endpoint(&self.base, &["map"], &[]).map_err(|e| IngestError::Unreachable {
            reason: e.to_string(),
        })?;
        tracing::debug!(%url, "POST");

        let response = self
            .http
            .post(url.clone())
            .json(payload)
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
        let id = ["uuid", "id"]
            .iter()
            .find_map(|k| body.get(*k).or_else(|| body.get("data").and_then(|d| d.get(*k))))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(IngestAck {
            status: status.as_u16(),
            id,
            body,
        })
    }
}
