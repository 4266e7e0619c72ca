//! Request building and response classification shared by both clients.

use bridge_core::ResolutionError;
use openmrs::RemoteMessage;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use url::Url;

/// `base` with `segments` appended as path segments and `query` as query pairs.
pub(crate) fn endpoint(
    base: &Url,
    segments: &[&str],
    query: &[(&str, &str)],
) -> Result<Url, ResolutionError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ResolutionError::InvalidLocator {
            locator: base.to_string(),
            reason: "base URL cannot carry a path".into(),
        })?
        .pop_if_empty()
        .extend(segments);

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

pub(crate) fn send_error(url: &Url, err: &reqwest::Error) -> ResolutionError {
    let reason = if err.is_timeout() {
        "timed out".to_string()
    } else {
        err.to_string()
    };
    tracing::warn!(%url, %reason, "request failed");
    ResolutionError::Unreachable {
        locator: url.to_string(),
        reason,
    }
}

/// Turn a non-success response into the matching [`ResolutionError`].
pub(crate) async fn check_status(url: &Url, response: Response) -> Result<Response, ResolutionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = remote_message(status, &body);
    let locator = url.to_string();

    Err(match status {
        StatusCode::NOT_FOUND => ResolutionError::NotFound { locator },
        s if s.is_server_error() => ResolutionError::Unreachable {
            locator,
            reason: format!("{}: {message}", s.as_u16()),
        },
        _ => ResolutionError::Remote { locator, message },
    })
}

/// Read the body as JSON.
pub(crate) async fn read_json(url: &Url, response: Response) -> Result<Value, ResolutionError> {
    let bytes = response.bytes().await.map_err(|e| send_error(url, &e))?;
    serde_json::from_slice(&bytes).map_err(|e| ResolutionError::MalformedPayload {
        locator: url.to_string(),
        reason: e.to_string(),
    })
}

/// Best human-readable message in an error body.
///
/// Tries the proxy's `{message}`/`{error}` shape, then a FHIR `OperationOutcome`, then the raw
/// text, then the status reason.
pub(crate) fn remote_message(status: StatusCode, body: &str) -> String {
    if let Ok(remote) = serde_json::from_str::<RemoteMessage>(body) {
        if let Some(text) = remote.text() {
            return text.to_string();
        }
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let diagnostics = value
            .get("issue")
            .and_then(Value::as_array)
            .and_then(|issues| issues.first())
            .and_then(|issue| issue.get("diagnostics"))
            .and_then(Value::as_str);
        if let Some(text) = diagnostics {
            return text.to_string();
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}
