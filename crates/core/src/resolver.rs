//! Linked-attribute resolution.
//!
//! A source record carries its person attributes as links. [`resolve_attributes`] follows all
//! of them at once and returns one [`Resolution`] per link, in input order, whatever order the
//! fetches completed in. A link that fails (bad locator, timeout, 404, undecodable body) fails
//! alone; it never takes the batch down and never disappears from the result.
//!
//! No retries happen here. Each fetch gets its own timeout.

use chrono::{DateTime, FixedOffset};
use futures_util::future::join_all;
use openmrs::{AttributeLink, PersonAttributeDetail};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::ResolutionError;
use crate::source::SourceSystem;

// ============================================================================
// Resolved values
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Period during which an address was valid. Open ends are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidityInterval {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
}

/// Structured fields of an address-like resolved attribute.
///
/// See [`crate::address`] for which of these the canonical address actually takes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StructuredAddress {
    /// Street lines. `None` when the source carried no `line` member at all.
    pub lines: Option<Vec<String>>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub validity: ValidityInterval,
    pub preferred: bool,
}

/// The realised value of an [`AttributeLink`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedAttribute {
    /// Id of the link this was resolved from.
    pub link_id: String,
    /// Attribute-type identifier assigned by the source system.
    pub type_id: String,
    /// The source system's name for the type. Informational only.
    pub type_display: Option<String>,
    /// Human-readable value.
    pub display: String,
    pub voided: bool,
    /// Present only for address-like attributes.
    pub address: Option<StructuredAddress>,
}

impl ResolvedAttribute {
    pub fn from_detail(link_id: &str, detail: PersonAttributeDetail) -> Self {
        let display = detail.value_text().unwrap_or_default().to_string();
        ResolvedAttribute {
            link_id: link_id.to_string(),
            type_id: detail.attribute_type.uuid,
            type_display: detail.attribute_type.display,
            display,
            voided: detail.voided,
            address: None,
        }
    }
}

/// Outcome of resolving one link.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub link: AttributeLink,
    pub outcome: Result<ResolvedAttribute, ResolutionError>,
}

/// A link that could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolutionFailure {
    pub link_id: String,
    pub error: String,
}

/// Split resolutions into successes and failures, keeping input order within each.
pub fn partition(
    resolutions: Vec<Resolution>,
) -> (Vec<ResolvedAttribute>, Vec<ResolutionFailure>) {
    let mut resolved = Vec::with_capacity(resolutions.len());
    let mut failed = Vec::new();

    for Resolution { link, outcome } in resolutions {
        match outcome {
            Ok(attribute) => resolved.push(attribute),
            Err(err) => failed.push(ResolutionFailure {
                link_id: link.id,
                error: err.to_string(),
            }),
        }
    }

    (resolved, failed)
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve every link concurrently.
///
/// Returns exactly `links.len()` resolutions, aligned with `links`.
pub async fn resolve_attributes<S>(
    source: &S,
    links: &[AttributeLink],
    timeout: Duration,
) -> Vec<Resolution>
where
    S: SourceSystem + ?Sized,
{
    tracing::debug!(count = links.len(), "resolving attribute links");

    let fetches = links.iter().map(|link| async move {
        let outcome = resolve_attribute(source, link, timeout).await;
        if let Err(err) = &outcome {
            tracing::warn!(link_id = %link.id, error = %err, "attribute resolution failed");
        }
        Resolution {
            link: link.clone(),
            outcome,
        }
    });

    join_all(fetches).await
}

async fn resolve_attribute<S>(
    source: &S,
    link: &AttributeLink,
    timeout: Duration,
) -> Result<ResolvedAttribute, ResolutionError>
where
    S: SourceSystem + ?Sized,
{
    let locator = parse_locator(link.locator.as_deref())?;
    let body = fetch(source, &locator, timeout).await?;

    let detail: PersonAttributeDetail =
        openmrs::decode(body).map_err(|e| ResolutionError::MalformedPayload {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;

    Ok(ResolvedAttribute::from_detail(&link.id, detail))
}

/// Validate a link's locator.
///
/// # Errors
///
/// Returns [`ResolutionError::InvalidLocator`] if the locator is missing, does not parse, or
/// is not an http(s) URL.
pub fn parse_locator(raw: Option<&str>) -> Result<Url, ResolutionError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(ResolutionError::InvalidLocator {
            locator: String::new(),
            reason: "link has no locator".into(),
        });
    };

    let url = Url::parse(raw).map_err(|e| ResolutionError::InvalidLocator {
        locator: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ResolutionError::InvalidLocator {
            locator: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(url)
}

/// Dereference `locator` under its own timeout.
pub(crate) async fn fetch<S>(
    source: &S,
    locator: &Url,
    timeout: Duration,
) -> Result<Value, ResolutionError>
where
    S: SourceSystem + ?Sized,
{
    tracing::debug!(%locator, "dereferencing");
    match tokio::time::timeout(timeout, source.dereference(locator)).await {
        Ok(result) => result,
        Err(_) => Err(ResolutionError::Unreachable {
            locator: locator.to_string(),
            reason: format!("timed out after {} ms", timeout.as_millis()),
        }),
    }
}

/// Parse a source timestamp. Accepts RFC 3339 and the source's `+0000` offset form.
pub(crate) fn parse_source_datetime(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}
