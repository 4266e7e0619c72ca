//! Canonical record assembly.
//!
//! Assembly is a pure fold: seed from the source record's own top-level fields, then append
//! every mapped fragment to its field. Fragments never overwrite seeded values and repeated
//! fragments are all kept. Fields that normally hold one value but ended up with several are
//! reported as [`AssemblyInconsistency`] so the caller can see them.

use openmrs::SourceRecord;

use crate::canonical::{CanonicalField, CanonicalFragment, CanonicalPatientRecord};
use crate::error::AssemblyInconsistency;
use crate::mapper::MappedAttributes;
use crate::render::{identifier_from_fhir, name_from_fhir, telecom_from_fhir};

/// An assembled record and whatever looked inconsistent while building it.
#[derive(Clone, Debug, PartialEq)]
pub struct Assembled {
    pub record: CanonicalPatientRecord,
    pub inconsistencies: Vec<AssemblyInconsistency>,
}

/// Assemble a canonical record from a source record and its mapped attributes.
pub fn assemble(source: &SourceRecord, mapped: &MappedAttributes) -> Assembled {
    let mut record = seed(source);

    for fragment in &mapped.fragments {
        append(&mut record, fragment.clone());
    }
    record
        .unclassified
        .extend(mapped.passthrough.iter().cloned());

    let inconsistencies = check_single_valued(&record);
    for inconsistency in &inconsistencies {
        tracing::warn!(
            field = ?inconsistency.field,
            count = inconsistency.count,
            "single-valued field assembled more than once"
        );
    }

    Assembled {
        record,
        inconsistencies,
    }
}

fn seed(source: &SourceRecord) -> CanonicalPatientRecord {
    let mut names = source.name.iter().map(name_from_fhir);
    let name = names.next().unwrap_or_default();

    CanonicalPatientRecord {
        source_id: source.id.clone(),
        name,
        other_names: names.collect(),
        birth_date: source.birth_date.clone(),
        gender: source.gender.clone(),
        identifiers: source
            .identifier
            .iter()
            .filter_map(identifier_from_fhir)
            .collect(),
        telecom: source.telecom.iter().filter_map(telecom_from_fhir).collect(),
        ..CanonicalPatientRecord::default()
    }
}

fn append(record: &mut CanonicalPatientRecord, fragment: CanonicalFragment) {
    match fragment {
        CanonicalFragment::Telecom(t) => record.telecom.push(t),
        CanonicalFragment::Identifier(i) => record.identifiers.push(i),
        CanonicalFragment::Nationality(c) => record.nationality.push(c),
        CanonicalFragment::BiologicalSex(c) => record.biological_sex.push(c),
        CanonicalFragment::GenderIdentity(c) => record.gender_identity.push(c),
        CanonicalFragment::SecondFamilyName(s) => record.name.second_family.push(s),
        CanonicalFragment::Address(a) => {
            if !a.is_empty() {
                record.addresses.push(a);
            }
        }
    }
}

fn check_single_valued(record: &CanonicalPatientRecord) -> Vec<AssemblyInconsistency> {
    [
        (CanonicalField::Nationality, record.nationality.len()),
        (CanonicalField::BiologicalSex, record.biological_sex.len()),
        (CanonicalField::GenderIdentity, record.gender_identity.len()),
        (
            CanonicalField::SecondFamilyName,
            record.name.second_family.len(),
        ),
    ]
    .into_iter()
    .filter(|(field, count)| field.is_single_valued() && *count > 1)
    .map(|(field, count)| AssemblyInconsistency { field, count })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{CanonicalAddress, PassThrough, Telecom, TelecomSystem, TelecomUse};
    use crate::testing::resolved;
    use fhir::Coding;

    fn source() -> SourceRecord {
        serde_json::from_value(serde_json::json!({
            "id": "p-1",
            "name": [{ "family": "Soto", "given": ["Ana", "María"] }],
            "gender": "female",
            "birthDate": "1990-04-02",
            "identifier": [
                { "system": "http://bahmni/id", "value": "BAH200001" },
                { "system": "http://bahmni/legacy", "value": "" }
            ],
            "telecom": [{ "system": "phone", "value": "+56 2 2222 2222", "use": "work" }]
        }))
        .expect("source record")
    }

    fn chile() -> Coding {
        Coding::new("urn:iso:std:iso:3166", "152", "Chile")
    }

    #[test]
    fn seeds_from_top_level_fields() {
        let assembled = assemble(&source(), &MappedAttributes::default());
        let record = assembled.record;

        assert_eq!(record.source_id.as_deref(), Some("p-1"));
        assert_eq!(record.name.given, vec!["Ana", "María"]);
        assert_eq!(record.name.family.as_deref(), Some("Soto"));
        assert_eq!(record.gender.as_deref(), Some("female"));
        assert_eq!(record.birth_date.as_deref(), Some("1990-04-02"));
        assert_eq!(record.identifiers.len(), 1, "blank identifier is skipped");
        assert_eq!(record.telecom.len(), 1);
        assert!(assembled.inconsistencies.is_empty());
    }

    #[test]
    fn fragments_augment_without_overwriting() {
        let mapped = MappedAttributes {
            fragments: vec![CanonicalFragment::Telecom(Telecom {
                system: TelecomSystem::Phone,
                value: "+56 9 1234 5678".into(),
                use_type: Some(TelecomUse::Mobile),
            })],
            ..MappedAttributes::default()
        };

        let record = assemble(&source(), &mapped).record;
        let phones = record.telecom_values(TelecomSystem::Phone);
        assert_eq!(phones, vec!["+56 2 2222 2222", "+56 9 1234 5678"]);
    }

    #[test]
    fn duplicate_nationality_is_kept_and_reported() {
        let mapped = MappedAttributes {
            fragments: vec![
                CanonicalFragment::Nationality(chile()),
                CanonicalFragment::Nationality(chile()),
            ],
            ..MappedAttributes::default()
        };

        let assembled = assemble(&source(), &mapped);

        assert_eq!(assembled.record.nationality, vec![chile(), chile()]);
        assert_eq!(
            assembled.inconsistencies,
            vec![AssemblyInconsistency {
                field: CanonicalField::Nationality,
                count: 2
            }]
        );
    }

    #[test]
    fn empty_addresses_are_not_added() {
        let mapped = MappedAttributes {
            fragments: vec![
                CanonicalFragment::Address(CanonicalAddress::default()),
                CanonicalFragment::Address(CanonicalAddress {
                    city: Some("Santiago".into()),
                    ..CanonicalAddress::default()
                }),
            ],
            ..MappedAttributes::default()
        };

        let record = assemble(&source(), &mapped).record;
        assert_eq!(record.addresses.len(), 1);
    }

    #[test]
    fn passthrough_lands_in_unclassified() {
        let attribute = resolved("ffffffff-0000-0000-0000-000000000000", "docente");
        let mapped = MappedAttributes {
            passthrough: vec![PassThrough::SourceAttribute(attribute.clone())],
            ..MappedAttributes::default()
        };

        let record = assemble(&source(), &mapped).record;
        assert_eq!(
            record.unclassified,
            vec![PassThrough::SourceAttribute(attribute)]
        );
    }

    #[test]
    fn assembly_is_deterministic() {
        let mapped = MappedAttributes {
            fragments: vec![
                CanonicalFragment::SecondFamilyName("Pérez".into()),
                CanonicalFragment::Nationality(chile()),
            ],
            ..MappedAttributes::default()
        };
        assert_eq!(assemble(&source(), &mapped), assemble(&source(), &mapped));
    }
}
