//! The source record returned when a patient summary is followed.
//!
//! The proxy renders OpenMRS patients in a FHIR-like shape, but with two indirections left
//! unresolved:
//! - `extension` holds person-attribute *links*, not extension values;
//! - `address[n].url` points at the full address, while the embedded entry carries only the
//!   free-text lines.

use crate::attribute::{AttributeLink, AttributeLinkWire};
use serde::{Deserialize, Serialize};

/// Embedded, partially-populated address.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PartialAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(
        rename = "postalCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub postal_code: Option<String>,

    /// Link to the full address resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A source-shaped patient record.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SourceRecord {
    #[serde(rename = "resourceType", default)]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub identifier: Vec<fhir::Identifier>,

    #[serde(default)]
    pub name: Vec<fhir::HumanName>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(rename = "birthDate", default)]
    pub birth_date: Option<String>,

    #[serde(default)]
    pub address: Vec<PartialAddress>,

    #[serde(default)]
    pub telecom: Vec<fhir::ContactPoint>,

    #[serde(default)]
    pub extension: Vec<AttributeLinkWire>,
}

impl SourceRecord {
    /// The record's attribute links, in wire order.
    pub fn attribute_links(&self) -> Vec<AttributeLink> {
        self.extension
            .iter()
            .cloned()
            .map(AttributeLink::from)
            .collect()
    }

    /// The primary (first) embedded address, if any.
    pub fn primary_address(&self) -> Option<&PartialAddress> {
        self.address.first()
    }

    /// Link to the primary address's full resource, if present and non-blank.
    pub fn primary_address_link(&self) -> Option<&str> {
        self.primary_address()
            .and_then(|a| a.url.as_deref())
            .filter(|u| !u.trim().is_empty())
    }
}

/// Body of the proxy's `/search_by_id` endpoint.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RecordResponse {
    pub fhir: SourceRecord,
}
