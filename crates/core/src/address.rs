//! Address resolution.
//!
//! The source record embeds a partial address (free-text lines plus a link) and the link leads
//! to the full address. The canonical address takes its street lines from the embedded copy
//! and its city from the dereferenced one. Nothing else is merged.
//!
//! The dereferenced district, region, postal code, country, coordinates and validity are kept
//! on [`StructuredAddress`] but are not copied into [`CanonicalAddress`]. That is a known gap,
//! not an oversight to be patched here.

use openmrs::{AddressDetail, SourceRecord};
use std::time::Duration;

use crate::canonical::CanonicalAddress;
use crate::error::{MappingError, ResolutionError};
use crate::resolver::{
    self, parse_source_datetime, Coordinates, ResolvedAttribute, StructuredAddress,
    ValidityInterval,
};
use crate::source::SourceSystem;

/// Type identifier given to the resolved primary address.
///
/// Not a source attribute type: the source models addresses separately. Resolved addresses
/// travel through the mapper with this type so they share one path with other attributes.
pub const ADDRESS_ATTRIBUTE_TYPE: &str = "person-address";

const ADDRESS_LINK_ID: &str = "address";

/// Resolve a record's primary address.
///
/// A record without an address link resolves to an empty address.
///
/// # Errors
///
/// Returns a [`ResolutionError`] if the link is invalid, the fetch fails or times out, or the
/// body is not an address.
pub async fn resolve_address<S>(
    source: &S,
    record: &SourceRecord,
    timeout: Duration,
) -> Result<ResolvedAttribute, ResolutionError>
where
    S: SourceSystem + ?Sized,
{
    let Some(link) = record.primary_address_link() else {
        tracing::debug!("record has no address link");
        return Ok(address_attribute(
            ADDRESS_LINK_ID.to_string(),
            String::new(),
            StructuredAddress::default(),
        ));
    };

    let locator = resolver::parse_locator(Some(link))?;
    let body = resolver::fetch(source, &locator, timeout).await?;
    let detail: AddressDetail =
        openmrs::decode(body).map_err(|e| ResolutionError::MalformedPayload {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;

    let embedded_lines = record.primary_address().and_then(|a| a.line.clone());
    let link_id = detail
        .uuid
        .clone()
        .unwrap_or_else(|| ADDRESS_LINK_ID.to_string());
    let display = detail.display.clone().unwrap_or_default();
    let voided = detail.voided;

    let mut attribute = address_attribute(link_id, display, merge(embedded_lines, detail));
    attribute.voided = voided;
    Ok(attribute)
}

fn address_attribute(
    link_id: String,
    display: String,
    address: StructuredAddress,
) -> ResolvedAttribute {
    ResolvedAttribute {
        link_id,
        type_id: ADDRESS_ATTRIBUTE_TYPE.to_string(),
        type_display: None,
        display,
        voided: false,
        address: Some(address),
    }
}

/// Street lines come from the embedded partial address; everything else from the detail.
fn merge(embedded_lines: Option<Vec<String>>, detail: AddressDetail) -> StructuredAddress {
    let coordinates = match (
        parse_coordinate(detail.latitude.as_deref()),
        parse_coordinate(detail.longitude.as_deref()),
    ) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    };

    StructuredAddress {
        lines: embedded_lines,
        city: non_blank(detail.city_village),
        district: non_blank(detail.county_district),
        region: non_blank(detail.state_province),
        postal_code: non_blank(detail.postal_code),
        country: non_blank(detail.country),
        coordinates,
        validity: ValidityInterval {
            start: detail.start_date.as_deref().and_then(parse_source_datetime),
            end: detail.end_date.as_deref().and_then(parse_source_datetime),
        },
        preferred: detail.preferred,
    }
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse().ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Project an address-typed attribute into a canonical address.
///
/// Only street lines and city are taken.
///
/// # Errors
///
/// Returns [`MappingError::IncompleteAttribute`] if the attribute carries no structured address.
pub fn project_address(attribute: &ResolvedAttribute) -> Result<CanonicalAddress, MappingError> {
    let structured =
        attribute
            .address
            .as_ref()
            .ok_or_else(|| MappingError::IncompleteAttribute {
                link_id: attribute.link_id.clone(),
                type_id: attribute.type_id.clone(),
                missing: "structured address",
            })?;

    Ok(CanonicalAddress {
        lines: structured.lines.clone(),
        city: structured.city.clone(),
        ..CanonicalAddress::default()
    })
}
