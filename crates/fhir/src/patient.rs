//! FHIR R4 `Patient` wire models and parse/render helpers.
//!
//! These structs mirror the JSON exchanged with a FHIR server closely enough to round-trip the
//! fields the bridge reads or writes:
//! - `name` (with name-level extensions such as a second family name)
//! - `gender`, `birthDate`
//! - `identifier` (with typed codings and type-level extensions)
//! - `telecom`, `address`
//! - record-level `extension`
//!
//! Every struct keeps the members it does not model in an `other` map, so nothing a server
//! sends is lost on parse. Extensions use theirs for `value[x]` variants; the patient and its
//! datatypes use theirs for members such as `active`, `name[].prefix` or `address[].use`.
//! Callers decide what to do with them.

use crate::{FhirError, FhirResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Expected value of `resourceType` for patient resources.
pub const PATIENT_RESOURCE_TYPE: &str = "Patient";

// ============================================================================
// Coded values
// ============================================================================

/// Purpose of a human name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameUse {
    /// Official name.
    Official,
    /// Usual/preferred name.
    Usual,
    /// Temporary name.
    Temp,
    /// Nickname or informal name.
    Nickname,
    /// Anonymous name.
    Anonymous,
    /// Old name (no longer in use).
    Old,
    /// Maiden name.
    Maiden,
}

// ============================================================================
// Datatypes
// ============================================================================

/// A single code from a code system.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: &str, code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            system: Some(system.to_string()),
            code: Some(code.into()),
            display: Some(display.into()),
        }
    }
}

/// A concept expressed as one or more codings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    /// The first coding, which is the one both systems treat as authoritative.
    pub fn first(&self) -> Option<&Coding> {
        self.coding.first()
    }
}

/// An extension, possibly nested.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub url: String,

    #[serde(rename = "valueString", skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(
        rename = "valueCodeableConcept",
        skip_serializing_if = "Option::is_none"
    )]
    pub value_codeable_concept: Option<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    /// Any other `value[x]` members, kept verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Extension {
    pub fn string(url: &str, value: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            value_string: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn codeable(url: &str, coding: Coding) -> Self {
        Self {
            url: url.to_string(),
            value_codeable_concept: Some(CodeableConcept::from_coding(coding)),
            ..Self::default()
        }
    }

    /// Extension whose value lives in nested sub-extensions.
    pub fn complex(url: &str, extension: Vec<Extension>) -> Self {
        Self {
            url: url.to_string(),
            extension,
            ..Self::default()
        }
    }

    /// First coding of `valueCodeableConcept`, if any.
    pub fn first_coding(&self) -> Option<&Coding> {
        self.value_codeable_concept
            .as_ref()
            .and_then(CodeableConcept::first)
    }
}

/// A human name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<NameUse>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    /// `prefix`, `suffix`, `text`, `period` and anything else not modelled above.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The `type` of an identifier: codings plus type-level extensions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentifierType {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
}

/// A business identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<IdentifierType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A phone number, email address or other contact point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A postal address.
///
/// `line` is optional rather than an empty list so that "no line key" and "empty line list"
/// stay distinguishable when reading payloads produced elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(rename = "postalCode", skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Address {
    /// True when none of the postal members carries a value. `other` is not considered.
    pub fn is_empty(&self) -> bool {
        self.line.is_none()
            && self.city.is_none()
            && self.district.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }
}

// ============================================================================
// Patient resource
// ============================================================================

/// A FHIR `Patient` resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(rename = "birthDate", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    /// `meta`, `active`, `maritalStatus` and every other member not modelled above.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Default for Patient {
    fn default() -> Self {
        Self {
            resource_type: PATIENT_RESOURCE_TYPE.to_string(),
            id: None,
            identifier: Vec::new(),
            name: Vec::new(),
            telecom: Vec::new(),
            gender: None,
            birth_date: None,
            address: Vec::new(),
            extension: Vec::new(),
            other: Map::new(),
        }
    }
}

impl Patient {
    /// Parse a patient resource from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort "path" (e.g. `name[0].given`)
    /// to the failing field when the JSON does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the JSON does not represent a patient resource,
    /// - any modelled field has an unexpected type,
    /// - resourceType is not "Patient".
    pub fn parse(json_text: &str) -> FhirResult<Patient> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let patient = deserialize_with_path(&mut deserializer)?;
        check_resource_type(patient)
    }

    /// Parse a patient resource from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Patient::parse`].
    pub fn from_value(value: Value) -> FhirResult<Patient> {
        let patient = deserialize_with_path(value)?;
        check_resource_type(patient)
    }

    /// Render as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if serialisation fails.
    pub fn render_json(&self) -> FhirResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise patient: {e}")))
    }

    /// Render as YAML, for human review.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if serialisation fails.
    pub fn render_yaml(&self) -> FhirResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise patient: {e}")))
    }

    /// First record-level extension with the given URL.
    pub fn find_extension(&self, url: &str) -> Option<&Extension> {
        self.extension.iter().find(|ext| ext.url == url)
    }
}

fn deserialize_with_path<'de, D>(deserializer: D) -> FhirResult<Patient>
where
    D: serde::Deserializer<'de>,
    D::Error: std::fmt::Display,
{
    serde_path_to_error::deserialize::<_, Patient>(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        FhirError::Translation(format!("Patient schema mismatch at {path}: {source}"))
    })
}

fn check_resource_type(patient: Patient) -> FhirResult<Patient> {
    if patient.resource_type != PATIENT_RESOURCE_TYPE {
        return Err(FhirError::InvalidInput(format!(
            "Expected resourceType 'Patient', got '{}'",
            patient.resource_type
        )));
    }
    Ok(patient)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "resourceType": "Patient",
  "id": "1001",
  "meta": { "versionId": "1" },
  "identifier": [{
    "use": "official",
    "system": "https://hl7chile.cl/fhir/ig/clcore/CodeSystem/CSIdentificadoresCL",
    "type": {
      "coding": [{ "system": "https://hl7chile.cl/fhir/ig/clcore/CodeSystem/CSCodigoDNI", "code": "NNCHL", "display": "Chile" }]
    },
    "value": "12.345.678-5"
  }],
  "name": [{
    "use": "official",
    "family": "Soto",
    "given": ["Ana", "María"],
    "extension": [{ "url": "https://hl7chile.cl/fhir/ig/clcore/StructureDefinition/SegundoApellido", "valueString": "Rojas" }]
  }],
  "telecom": [{ "system": "phone", "value": "+56911111111", "use": "mobile" }],
  "gender": "female",
  "birthDate": "1990-04-02",
  "address": [{ "line": ["Av. Siempre Viva 742"], "city": "Santiago" }],
  "extension": [{ "url": "http://example.org/flag", "valueBoolean": true }]
}"#;

    #[test]
    fn parses_sample_and_keeps_server_metadata_aside() {
        let patient = Patient::parse(SAMPLE).expect("parse json");
        assert_eq!(patient.id.as_deref(), Some("1001"));
        assert_eq!(patient.name[0].given, vec!["Ana", "María"]);
        assert_eq!(patient.name[0].use_type, Some(NameUse::Official));
        assert_eq!(patient.identifier[0].value.as_deref(), Some("12.345.678-5"));
        assert_eq!(patient.address[0].city.as_deref(), Some("Santiago"));
        assert_eq!(patient.other.keys().collect::<Vec<_>>(), vec!["meta"]);
        assert!(patient.name[0].other.is_empty());
    }

    #[test]
    fn collects_unmodelled_members_of_datatypes() {
        let input = r#"{
          "resourceType": "Patient",
          "active": true,
          "name": [{ "family": "Soto", "prefix": ["Sra."] }],
          "telecom": [{ "system": "email", "value": "a@b.cl", "rank": 1 }],
          "address": [{ "use": "home", "city": "Talca" }]
        }"#;
        let patient = Patient::parse(input).expect("parse json");
        assert_eq!(patient.other.get("active"), Some(&Value::Bool(true)));
        assert!(patient.name[0].other.contains_key("prefix"));
        assert!(patient.telecom[0].other.contains_key("rank"));
        assert!(patient.address[0].other.contains_key("use"));
        assert!(!patient.address[0].is_empty());

        let rendered = patient.render_json().expect("render");
        assert!(rendered.contains("\"prefix\""));
        assert!(rendered.contains("\"active\": true"));
    }

    #[test]
    fn keeps_unmodelled_extension_values() {
        let patient = Patient::parse(SAMPLE).expect("parse json");
        let flag = patient
            .find_extension("http://example.org/flag")
            .expect("extension present");
        assert_eq!(flag.other.get("valueBoolean"), Some(&Value::Bool(true)));

        let rendered = patient.render_json().expect("render");
        assert!(rendered.contains("\"valueBoolean\": true"));
    }

    #[test]
    fn reports_path_of_wrong_types() {
        let input = r#"{ "resourceType": "Patient", "name": [{ "given": "Ana" }] }"#;
        let err = Patient::parse(input).expect_err("should reject wrong type");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("given"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_resource_type() {
        let input = r#"{ "resourceType": "Observation", "id": "1" }"#;
        let err = Patient::parse(input).expect_err("should reject invalid resourceType");
        match err {
            FhirError::InvalidInput(msg) => {
                assert!(msg.contains("Patient"));
                assert!(msg.contains("Observation"));
            }
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn renders_minimal_patient_without_optional_keys() {
        let json = Patient::default().render_json().expect("render");
        assert!(json.contains("\"resourceType\": \"Patient\""));
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("\"name\""));
        assert!(!json.contains("\"address\""));
    }

    #[test]
    fn renders_yaml_for_review() {
        let patient = Patient::parse(SAMPLE).expect("parse json");
        let yaml = patient.render_yaml().expect("render yaml");
        assert!(yaml.contains("resourceType: Patient"));
        assert!(yaml.contains("family: Soto"));
    }

    #[test]
    fn empty_line_list_is_distinct_from_missing_line() {
        let with_empty: Address = serde_json::from_str(r#"{ "line": [] }"#).expect("parse");
        let without: Address = serde_json::from_str(r#"{}"#).expect("parse");
        assert_eq!(with_empty.line, Some(vec![]));
        assert!(without.line.is_none());
        assert!(without.is_empty());
        assert!(!with_empty.is_empty());
    }
}
