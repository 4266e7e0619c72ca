//! Dereferenced person addresses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A person address as returned when following a record's address link.
///
/// Street lines are taken from the record's embedded partial address, so the fifteen
/// `addressN` members here are left unmodelled in [`AddressDetail::other`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AddressDetail {
    #[serde(default)]
    pub uuid: Option<String>,

    #[serde(default)]
    pub display: Option<String>,

    #[serde(rename = "cityVillage", default)]
    pub city_village: Option<String>,

    #[serde(rename = "countyDistrict", default)]
    pub county_district: Option<String>,

    #[serde(rename = "stateProvince", default)]
    pub state_province: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(rename = "postalCode", default)]
    pub postal_code: Option<String>,

    #[serde(default)]
    pub latitude: Option<String>,

    #[serde(default)]
    pub longitude: Option<String>,

    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,

    #[serde(rename = "endDate", default)]
    pub end_date: Option<String>,

    #[serde(default)]
    pub preferred: bool,

    #[serde(default)]
    pub voided: bool,

    /// `addressN` members and anything else not modelled above.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}
