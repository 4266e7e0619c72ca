//! Conversion between the canonical record and the FHIR `Patient` resource.
//!
//! [`to_fhir`] renders a canonical record in the target profile; [`from_fhir`] reads a target
//! record back into canonical form, classifying extensions by URL. Unknown extensions survive
//! both directions verbatim. Other members the canonical record has no field for are listed in
//! [`CanonicalPatientRecord::unmodelled`] rather than dropped.

use bridge_types::NonEmptyText;
use fhir::{
    Address, ContactPoint, Extension, HumanName, Identifier, IdentifierType, NameUse, Patient,
};
use serde_json::{Map, Value};

use crate::canonical::{
    CanonicalAddress, CanonicalIdentifier, CanonicalName, CanonicalPatientRecord, PassThrough,
    Telecom, TelecomSystem, TelecomUse, UnmodelledMember,
};
use crate::constants::{
    BIOLOGICAL_SEX_URL, GENDER_IDENTITY_URL, GENDER_IDENTITY_VALUE_URL, LEGACY_NATIONALITY_URL,
    NATIONALITY_URL, SECOND_FAMILY_NAME_URL, SOURCE_ATTRIBUTE_URL_PREFIX,
};
use crate::resolver::ResolvedAttribute;

// ============================================================================
// Canonical -> FHIR
// ============================================================================

/// Render a canonical record as a FHIR patient.
///
/// The primary name keeps its recorded use, or is marked `official` when it has none. Empty
/// addresses are omitted; blank address lines
/// are left for [`normalise_addresses`] so callers can see what was dropped.
pub fn to_fhir(record: &CanonicalPatientRecord) -> Patient {
    let primary_use = record.name.use_type.or(Some(NameUse::Official));
    let mut name = vec![name_to_fhir(&record.name, primary_use)];
    name.extend(record.other_names.iter().map(|n| name_to_fhir(n, n.use_type)));

    let mut extension = Vec::new();
    extension.extend(
        record
            .nationality
            .iter()
            .map(|c| Extension::codeable(NATIONALITY_URL, c.clone())),
    );
    extension.extend(record.gender_identity.iter().map(|c| {
        Extension::complex(
            GENDER_IDENTITY_URL,
            vec![Extension::codeable(GENDER_IDENTITY_VALUE_URL, c.clone())],
        )
    }));
    extension.extend(
        record
            .biological_sex
            .iter()
            .map(|c| Extension::codeable(BIOLOGICAL_SEX_URL, c.clone())),
    );
    extension.extend(record.unclassified.iter().map(passthrough_to_fhir));

    Patient {
        id: record.source_id.clone(),
        identifier: record.identifiers.iter().map(identifier_to_fhir).collect(),
        name,
        telecom: record.telecom.iter().map(telecom_to_fhir).collect(),
        gender: record.gender.clone(),
        birth_date: record.birth_date.clone(),
        address: record
            .addresses
            .iter()
            .filter(|a| !a.is_empty())
            .map(address_to_fhir)
            .collect(),
        extension,
        ..Patient::default()
    }
}

fn name_to_fhir(name: &CanonicalName, use_type: Option<NameUse>) -> HumanName {
    let mut extension: Vec<Extension> = name
        .second_family
        .iter()
        .map(|s| Extension::string(SECOND_FAMILY_NAME_URL, s.clone()))
        .collect();
    extension.extend(name.extension.iter().cloned());

    HumanName {
        use_type,
        family: name.family.clone(),
        given: name.given.clone(),
        extension,
        ..HumanName::default()
    }
}

fn identifier_to_fhir(id: &CanonicalIdentifier) -> Identifier {
    let type_ = if id.type_coding.is_empty() && id.type_extension.is_empty() {
        None
    } else {
        Some(IdentifierType {
            extension: id.type_extension.clone(),
            coding: id.type_coding.clone(),
        })
    };

    Identifier {
        use_type: id.use_type.clone(),
        system: id.system.clone(),
        type_,
        value: Some(id.value.as_str().to_string()),
        ..Identifier::default()
    }
}

fn telecom_to_fhir(t: &Telecom) -> ContactPoint {
    ContactPoint {
        system: Some(t.system.to_wire().to_string()),
        value: Some(t.value.clone()),
        use_type: t.use_type.map(|u| u.to_wire().to_string()),
        ..ContactPoint::default()
    }
}

fn address_to_fhir(a: &CanonicalAddress) -> Address {
    Address {
        line: a.lines.clone(),
        city: a.city.clone(),
        district: a.district.clone(),
        state: a.state.clone(),
        postal_code: a.postal_code.clone(),
        country: a.country.clone(),
        ..Address::default()
    }
}

fn passthrough_to_fhir(p: &PassThrough) -> Extension {
    match p {
        PassThrough::SourceAttribute(attr) => Extension::string(
            &format!("{SOURCE_ATTRIBUTE_URL_PREFIX}{}", attr.type_id),
            attr.display.clone(),
        ),
        PassThrough::TargetExtension(ext) => ext.clone(),
    }
}

/// Remove `line` members that are empty or all blank, then remove addresses left with nothing.
///
/// Returns the original indices of removed addresses.
pub fn normalise_addresses(addresses: &mut Vec<Address>) -> Vec<usize> {
    for address in addresses.iter_mut() {
        let blank = address
            .line
            .as_ref()
            .is_some_and(|lines| lines.iter().all(|l| l.trim().is_empty()));
        if blank {
            address.line = None;
        }
    }

    let mut removed = Vec::new();
    let mut index = 0;
    addresses.retain(|a| {
        let keep = !a.is_empty();
        if !keep {
            removed.push(index);
        }
        index += 1;
        keep
    });
    removed
}

// ============================================================================
// FHIR -> canonical
// ============================================================================

/// Read a FHIR patient into canonical form.
///
/// There is always exactly one primary name: the first one, or an empty name when the
/// resource has none. Identifiers and telecom entries with blank values are skipped.
/// Unmodelled members are collected with paths indexed as in `patient`, so a skipped entry
/// does not shift the paths of those after it.
pub fn from_fhir(patient: &Patient) -> CanonicalPatientRecord {
    let mut names = patient.name.iter().map(name_from_fhir);
    let name = names.next().unwrap_or_default();
    let other_names = names.collect();

    let mut record = CanonicalPatientRecord {
        source_id: patient.id.clone(),
        name,
        other_names,
        birth_date: patient.birth_date.clone(),
        gender: patient.gender.clone(),
        addresses: patient
            .address
            .iter()
            .map(address_from_fhir)
            .filter(|a| !a.is_empty())
            .collect(),
        telecom: patient.telecom.iter().filter_map(telecom_from_fhir).collect(),
        identifiers: patient
            .identifier
            .iter()
            .filter_map(identifier_from_fhir)
            .collect(),
        unmodelled: unmodelled_members(patient),
        ..CanonicalPatientRecord::default()
    };

    for ext in &patient.extension {
        classify_extension(&mut record, ext);
    }

    record
}

fn unmodelled_members(patient: &Patient) -> Vec<UnmodelledMember> {
    let mut members = Vec::new();
    collect_members(&mut members, "", &patient.other);
    for (i, name) in patient.name.iter().enumerate() {
        collect_members(&mut members, &format!("name[{i}]."), &name.other);
    }
    for (i, id) in patient.identifier.iter().enumerate() {
        collect_members(&mut members, &format!("identifier[{i}]."), &id.other);
    }
    for (i, cp) in patient.telecom.iter().enumerate() {
        collect_members(&mut members, &format!("telecom[{i}]."), &cp.other);
    }
    for (i, address) in patient.address.iter().enumerate() {
        collect_members(&mut members, &format!("address[{i}]."), &address.other);
    }
    members
}

fn collect_members(out: &mut Vec<UnmodelledMember>, prefix: &str, other: &Map<String, Value>) {
    out.extend(other.iter().map(|(key, value)| UnmodelledMember {
        path: format!("{prefix}{key}"),
        value: value.clone(),
    }));
}

fn classify_extension(record: &mut CanonicalPatientRecord, ext: &Extension) {
    let url = ext.url.as_str();

    let coding = match url {
        NATIONALITY_URL | LEGACY_NATIONALITY_URL => ext.first_coding(),
        BIOLOGICAL_SEX_URL => ext.first_coding(),
        GENDER_IDENTITY_URL => ext
            .extension
            .iter()
            .find(|sub| sub.url == GENDER_IDENTITY_VALUE_URL)
            .and_then(Extension::first_coding),
        SECOND_FAMILY_NAME_URL => {
            if let Some(value) = ext.value_string.as_deref().filter(|v| !v.trim().is_empty()) {
                record.name.second_family.push(value.to_string());
                return;
            }
            None
        }
        _ => None,
    };

    match (url, coding) {
        (NATIONALITY_URL | LEGACY_NATIONALITY_URL, Some(c)) => record.nationality.push(c.clone()),
        (BIOLOGICAL_SEX_URL, Some(c)) => record.biological_sex.push(c.clone()),
        (GENDER_IDENTITY_URL, Some(c)) => record.gender_identity.push(c.clone()),
        _ => record.unclassified.push(passthrough_from_fhir(ext)),
    }
}

fn passthrough_from_fhir(ext: &Extension) -> PassThrough {
    let source_type = ext
        .url
        .strip_prefix(SOURCE_ATTRIBUTE_URL_PREFIX)
        .filter(|t| !t.is_empty());

    match (source_type, ext.value_string.as_deref()) {
        (Some(type_id), Some(display)) => PassThrough::SourceAttribute(ResolvedAttribute {
            link_id: ext.url.clone(),
            type_id: type_id.to_string(),
            type_display: None,
            display: display.to_string(),
            voided: false,
            address: None,
        }),
        _ => PassThrough::TargetExtension(ext.clone()),
    }
}

/// Name-level `SegundoApellido` extensions become second family names; other extensions are
/// kept on the name.
pub(crate) fn name_from_fhir(name: &HumanName) -> CanonicalName {
    let mut second_family = Vec::new();
    let mut extension = Vec::new();

    for ext in &name.extension {
        match ext.value_string.as_deref() {
            Some(value) if ext.url == SECOND_FAMILY_NAME_URL && !value.trim().is_empty() => {
                second_family.push(value.to_string())
            }
            _ => extension.push(ext.clone()),
        }
    }

    CanonicalName {
        use_type: name.use_type,
        given: name.given.clone(),
        family: name.family.clone(),
        second_family,
        extension,
    }
}

/// `None` when the identifier has no usable value.
pub(crate) fn identifier_from_fhir(id: &Identifier) -> Option<CanonicalIdentifier> {
    let value = NonEmptyText::from_optional(id.value.as_deref())?;
    let (type_coding, type_extension) = id
        .type_
        .as_ref()
        .map(|t| (t.coding.clone(), t.extension.clone()))
        .unwrap_or_default();

    Some(CanonicalIdentifier {
        use_type: id.use_type.clone(),
        system: id.system.clone(),
        type_coding,
        type_extension,
        value,
    })
}

pub(crate) fn telecom_from_fhir(cp: &ContactPoint) -> Option<Telecom> {
    let value = NonEmptyText::from_optional(cp.value.as_deref())?;
    Some(Telecom {
        system: cp
            .system
            .as_deref()
            .map(TelecomSystem::from_wire)
            .unwrap_or(TelecomSystem::Other),
        value: value.into_inner(),
        use_type: cp.use_type.as_deref().and_then(TelecomUse::from_wire),
    })
}

fn address_from_fhir(a: &Address) -> CanonicalAddress {
    CanonicalAddress {
        lines: a.line.clone(),
        city: a.city.clone(),
        district: a.district.clone(),
        state: a.state.clone(),
        postal_code: a.postal_code.clone(),
        country: a.country.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::national_identifier;
    use fhir::Coding;

    fn hapi_patient() -> Patient {
        Patient::parse(
            r#"{
              "resourceType": "Patient",
              "id": "1042",
              "identifier": [
                { "use": "official",
                  "system": "https://hl7chile.cl/fhir/ig/clcore/CodeSystem/CSIdentificadoresCL",
                  "value": "12.345.678-5" },
                { "system": "http://hospital/mrn", "value": "  " }
              ],
              "name": [{
                "use": "official", "family": "Soto", "given": ["Ana", "María"],
                "extension": [{
                  "url": "https://hl7chile.cl/fhir/ig/clcore/StructureDefinition/SegundoApellido",
                  "valueString": "Pérez"
                }]
              }],
              "telecom": [{ "system": "email", "value": "ana@example.cl", "use": "home" }],
              "gender": "female",
              "address": [{ "line": [""], "city": "Santiago" }],
              "extension": [
                { "url": "https://hl7chile.cl/fhir/ig/clcore/StructureDefinition/Nacionalidad",
                  "valueCodeableConcept": { "coding": [{ "system": "urn:iso:std:iso:3166", "code": "152", "display": "Chile" }] } },
                { "url": "http://hl7.org/fhir/StructureDefinition/individual-genderIdentity",
                  "extension": [{ "url": "value", "valueCodeableConcept": { "coding": [{ "code": "2", "display": "Femenino" }] } }] },
                { "url": "http://example.org/religion", "valueString": "none" },
                { "url": "urn:uuid:0a1b2c3d-0000-0000-0000-000000000001", "valueString": "docente" }
              ]
            }"#,
        )
        .expect("valid patient")
    }

    #[test]
    fn classifies_extensions_by_url() {
        let record = from_fhir(&hapi_patient());

        assert_eq!(record.nationality[0].code.as_deref(), Some("152"));
        assert_eq!(record.gender_identity[0].display.as_deref(), Some("Femenino"));
        assert!(record.biological_sex.is_empty());
        assert_eq!(record.name.second_family, vec!["Pérez"]);
        assert!(record.name.extension.is_empty());

        match &record.unclassified[..] {
            [PassThrough::TargetExtension(ext), PassThrough::SourceAttribute(attr)] => {
                assert_eq!(ext.url, "http://example.org/religion");
                assert_eq!(attr.type_id, "0a1b2c3d-0000-0000-0000-000000000001");
                assert_eq!(attr.display, "docente");
            }
            other => panic!("unexpected passthrough {other:?}"),
        }
    }

    #[test]
    fn blank_identifiers_are_skipped() {
        let record = from_fhir(&hapi_patient());
        assert_eq!(record.identifiers.len(), 1);
        assert!(record.identifiers[0].is_national_identifier());
    }

    #[test]
    fn patient_without_names_still_has_a_primary_name() {
        let record = from_fhir(&Patient::default());
        assert_eq!(record.name, CanonicalName::default());
        assert!(record.other_names.is_empty());
    }

    #[test]
    fn legacy_nationality_url_is_recognised() {
        let patient = Patient {
            extension: vec![Extension::codeable(
                LEGACY_NATIONALITY_URL,
                Coding::new("urn:iso:std:iso:3166", "604", "Perú"),
            )],
            ..Patient::default()
        };
        assert_eq!(from_fhir(&patient).nationality.len(), 1);
    }

    #[test]
    fn renders_profile_extensions() {
        let record = CanonicalPatientRecord {
            name: CanonicalName {
                use_type: None,
                given: vec!["Ana".into()],
                family: Some("Soto".into()),
                second_family: vec!["Pérez".into()],
                extension: vec![],
            },
            nationality: vec![Coding::new("urn:iso:std:iso:3166", "152", "Chile")],
            gender_identity: vec![Coding::new("x", "2", "Femenino")],
            identifiers: vec![national_identifier(
                NonEmptyText::new("12.345.678-5").expect("non-empty"),
            )],
            ..CanonicalPatientRecord::default()
        };

        let patient = to_fhir(&record);

        assert_eq!(patient.name[0].use_type, Some(NameUse::Official));
        assert_eq!(patient.name[0].extension[0].url, SECOND_FAMILY_NAME_URL);
        assert!(patient.find_extension(NATIONALITY_URL).is_some());
        let identity = patient.find_extension(GENDER_IDENTITY_URL).expect("identity");
        assert_eq!(identity.extension[0].url, GENDER_IDENTITY_VALUE_URL);
        assert_eq!(
            patient.identifier[0]
                .type_
                .as_ref()
                .map(|t| t.coding[0].code.as_deref()),
            Some(Some("NNCHL"))
        );
    }

    #[test]
    fn recorded_name_use_survives_rendering() {
        let patient = Patient::parse(
            r#"{ "resourceType": "Patient",
                 "name": [{ "use": "usual", "given": ["Ana"] }, { "use": "maiden", "family": "Rojas" }] }"#,
        )
        .expect("valid patient");

        let rendered = to_fhir(&from_fhir(&patient));

        assert_eq!(rendered.name[0].use_type, Some(NameUse::Usual));
        assert_eq!(rendered.name[1].use_type, Some(NameUse::Maiden));
    }

    #[test]
    fn unmodelled_members_are_listed_with_resource_paths() {
        let patient = Patient::parse(
            r#"{ "resourceType": "Patient",
                 "active": true,
                 "meta": { "versionId": "3" },
                 "identifier": [{ "value": " " }, { "value": "X1", "period": { "start": "2020" } }],
                 "address": [{ "use": "home", "city": "Talca" }] }"#,
        )
        .expect("valid patient");

        let record = from_fhir(&patient);
        let paths: Vec<&str> = record.unmodelled.iter().map(|m| m.path.as_str()).collect();

        assert_eq!(
            paths,
            vec!["active", "meta", "identifier[1].period", "address[0].use"]
        );
        assert_eq!(record.unmodelled[0].value, Value::Bool(true));
        assert!(from_fhir(&hapi_patient()).unmodelled.is_empty());
    }

    #[test]
    fn round_trip_keeps_profile_fields() {
        let original = from_fhir(&hapi_patient());
        let again = from_fhir(&to_fhir(&original));
        assert_eq!(again, original);
    }

    #[test]
    fn normalising_drops_blank_lines_and_empty_addresses() {
        let mut addresses = vec![
            Address {
                line: Some(vec!["".into(), "  ".into()]),
                city: Some("Santiago".into()),
                ..Address::default()
            },
            Address {
                line: Some(vec![]),
                ..Address::default()
            },
            Address {
                line: Some(vec!["Av. Siempre Viva 742".into()]),
                ..Address::default()
            },
        ];

        let removed = normalise_addresses(&mut addresses);

        assert_eq!(removed, vec![1]);
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].line, None);
        assert_eq!(addresses[0].city.as_deref(), Some("Santiago"));
        assert_eq!(
            addresses[1].line,
            Some(vec!["Av. Siempre Viva 742".to_string()])
        );
    }
}
