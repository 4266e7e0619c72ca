//! Search result bundles.
//!
//! A FHIR search returns a `Bundle` of type `searchset`. The bridge only needs the patients
//! inside it, so entries whose resource is not a `Patient` are skipped rather than rejected.

use crate::patient::{Patient, PATIENT_RESOURCE_TYPE};
use crate::{FhirError, FhirResult};
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
struct BundleWire {
    #[serde(rename = "resourceType")]
    resource_type: String,

    #[serde(default)]
    entry: Vec<BundleEntryWire>,
}

#[derive(Clone, Debug, Deserialize)]
struct BundleEntryWire {
    #[serde(default)]
    resource: Option<Value>,
}

/// Search bundle operations.
pub struct Bundle;

impl Bundle {
    /// Extract the patients of a search bundle, in bundle order.
    ///
    /// A bundle without an `entry` member is an empty result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if the text is not a bundle, or if an entry claims to be a
    /// patient but does not match the patient wire schema.
    pub fn patients(json_text: &str) -> FhirResult<Vec<Patient>> {
        let value: Value = serde_json::from_str(json_text)?;
        Self::patients_from_value(value)
    }

    /// As [`Bundle::patients`], for a body that has already been parsed.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] under the same conditions as [`Bundle::patients`].
    pub fn patients_from_value(value: Value) -> FhirResult<Vec<Patient>> {
        let wire: BundleWire = serde_json::from_value(value)?;
        if wire.resource_type != "Bundle" {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Bundle', got '{}'",
                wire.resource_type
            )));
        }

        wire.entry
            .into_iter()
            .filter_map(|entry| entry.resource)
            .filter(|resource| {
                resource.get("resourceType").and_then(Value::as_str) == Some(PATIENT_RESOURCE_TYPE)
            })
            .map(Patient::from_value)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_patients_in_order() {
        let input = r#"{
          "resourceType": "Bundle",
          "type": "searchset",
          "entry": [
            { "resource": { "resourceType": "Patient", "id": "a", "gender": "male" } },
            { "resource": { "resourceType": "OperationOutcome" } },
            { "resource": { "resourceType": "Patient", "id": "b" } }
          ]
        }"#;

        let patients = Bundle::patients(input).expect("parse bundle");
        let ids: Vec<_> = patients.iter().map(|p| p.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("a"), Some("b")]);
    }

    #[test]
    fn missing_entry_is_empty_result() {
        let patients = Bundle::patients(r#"{ "resourceType": "Bundle", "total": 0 }"#)
            .expect("parse bundle");
        assert!(patients.is_empty());
    }

    #[test]
    fn reads_an_already_parsed_body() {
        let body = serde_json::json!({
            "resourceType": "Bundle",
            "entry": [{ "resource": { "resourceType": "Patient", "id": "c", "active": true } }]
        });

        let patients = Bundle::patients_from_value(body).expect("parse bundle");

        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].id.as_deref(), Some("c"));
        assert_eq!(patients[0].other.get("active"), Some(&Value::Bool(true)));
    }

    #[test]
    fn value_without_resource_type_is_invalid_json() {
        let err = Bundle::patients_from_value(serde_json::json!({ "entry": [] }))
            .expect_err("no resourceType");
        assert!(matches!(err, FhirError::InvalidJson(_)));
    }

    #[test]
    fn rejects_non_bundle() {
        let err = Bundle::patients(r#"{ "resourceType": "Patient" }"#).expect_err("not a bundle");
        assert!(matches!(err, FhirError::InvalidInput(_)));
    }
}
