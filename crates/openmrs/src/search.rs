//! Name search results.

use crate::{OpenmrsError, OpenmrsResult};
use serde::{Deserialize, Serialize};

/// A navigable link attached to a source resource.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,

    pub uri: String,

    #[serde(
        rename = "resourceAlias",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_alias: Option<String>,
}

/// Minimal reference to a person, as returned by a name search.
///
/// Carries no demographic data of its own; it exists only to reach the full record.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PatientSummary {
    pub uuid: String,

    #[serde(default)]
    pub display: String,

    #[serde(default)]
    pub links: Vec<Link>,
}

impl PatientSummary {
    /// Identifier to use when fetching the full record.
    ///
    /// This is the last path segment of the first link, with any query string or fragment
    /// removed. Returns `None` when the summary has no links or the link has no path segment.
    pub fn record_id(&self) -> Option<&str> {
        let uri = &self.links.first()?.uri;
        last_path_segment(uri)
    }
}

/// Last non-empty `/`-separated segment of `uri`, ignoring `?query` and `#fragment`.
pub fn last_path_segment(uri: &str) -> Option<&str> {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    uri[..end].split('/').rev().find(|s| !s.is_empty())
}

/// Body of the proxy's `/search` endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<PatientSummary>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    /// Turn the response into an ordered result list.
    ///
    /// A missing `results` member with no `error` is an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`OpenmrsError::Remote`] carrying the proxy's message when `error` is set.
    pub fn into_results(self) -> OpenmrsResult<Vec<PatientSummary>> {
        if let Some(message) = self.error {
            return Err(OpenmrsError::Remote(message));
        }
        Ok(self.results.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(uri: &str) -> PatientSummary {
        PatientSummary {
            uuid: "p-1".into(),
            display: "BAH200001 - Ana Soto".into(),
            links: vec![Link {
                rel: Some("self".into()),
                uri: uri.into(),
                resource_alias: None,
            }],
        }
    }

    #[test]
    fn record_id_is_last_segment_without_query() {
        let s = summary("http://bahmni/openmrs/ws/rest/v1/patient/0f1e2d3c?v=full#top");
        assert_eq!(s.record_id(), Some("0f1e2d3c"));
    }

    #[test]
    fn record_id_ignores_trailing_slash() {
        let s = summary("http://bahmni/openmrs/ws/rest/v1/patient/abc/");
        assert_eq!(s.record_id(), Some("abc"));
    }

    #[test]
    fn record_id_requires_a_link() {
        let mut s = summary("x");
        s.links.clear();
        assert_eq!(s.record_id(), None);
    }

    #[test]
    fn error_member_becomes_remote_error() {
        let response: SearchResponse =
            serde_json::from_str(r#"{ "error": "backend down" }"#).expect("parse");
        match response.into_results() {
            Err(OpenmrsError::Remote(msg)) => assert_eq!(msg, "backend down"),
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[test]
    fn missing_results_is_empty() {
        let response: SearchResponse = serde_json::from_str("{}").expect("parse");
        assert!(response.into_results().expect("ok").is_empty());
    }
}
