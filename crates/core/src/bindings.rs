//! Attribute-type bindings.
//!
//! [`BINDINGS`] is the single table that relates a source attribute type to a canonical field.
//! The forward mapper reads it to project resolved attributes; the reverse projector reads the
//! same rows to extract values back out of a canonical record. Adding a type means adding a
//! row here and nowhere else.

use bridge_types::NonEmptyText;
use fhir::{Coding, Extension};
use uuid::{uuid, Uuid};

use crate::canonical::{
    CanonicalField, CanonicalFragment, CanonicalIdentifier, CanonicalPatientRecord, Telecom,
    TelecomSystem, TelecomUse,
};
use crate::codes::{self, GenderIdentity};
use crate::constants::{
    ADMINISTRATIVE_GENDER_SYSTEM, COUNTRY_CODE_URL, GENDER_IDENTITY_SYSTEM, IDENTIFIER_TYPE_SYSTEM,
    ISO_3166_SYSTEM, NATIONAL_IDENTIFIER_COUNTRY, NATIONAL_IDENTIFIER_SYSTEM,
    NATIONAL_IDENTIFIER_TYPE_CODE, NATIONAL_IDENTIFIER_URL, OFFICIAL_USE, SECOND_FAMILY_NAME_URL,
};

// ============================================================================
// Source attribute types
// ============================================================================

pub const PHONE_ATTRIBUTE: Uuid = uuid!("a384873b-847a-4a86-b869-28fb601162dd");
pub const EMAIL_ATTRIBUTE: Uuid = uuid!("e3123cba-5e07-11ef-8f7c-0242ac120002");
pub const NATIONALITY_ATTRIBUTE: Uuid = uuid!("7bb331e1-968f-4e26-96c5-cc9eb55fba11");
pub const BIOLOGICAL_SEX_ATTRIBUTE: Uuid = uuid!("7c8d50bd-73d0-40ef-8f9a-12057b61286e");
pub const NATIONAL_ID_ATTRIBUTE: Uuid = uuid!("9c50f6db-e624-4aa6-9454-d8b1d49b2bf3");
pub const SECOND_FAMILY_NAME_ATTRIBUTE: Uuid = uuid!("e628c57c-8077-422a-a016-2b295998cf36");

// ============================================================================
// Binding rows
// ============================================================================

/// Inputs a projection may consult besides the attribute value itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProjectionContext<'a> {
    /// The record's top-level administrative gender.
    pub administrative_gender: Option<&'a str>,
}

/// Where a derived ingestion extension goes in the source payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// On the primary name.
    Name,
    /// On the patient itself.
    Record,
}

/// Extension the source ingestion endpoint expects for a bound field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestExtension {
    pub url: &'static str,
    pub placement: Placement,
}

/// One row of the binding table.
#[derive(Clone, Copy, Debug)]
pub struct ExtensionBinding {
    pub type_id: Uuid,
    pub name: &'static str,
    /// The field the projection primarily writes.
    pub field: CanonicalField,
    /// Forward: value → canonical fragments.
    pub project: fn(&NonEmptyText, &ProjectionContext<'_>) -> Vec<CanonicalFragment>,
    /// Reverse: canonical record → source attribute values of this type.
    pub extract: fn(&CanonicalPatientRecord) -> Vec<String>,
    pub ingest_extension: Option<IngestExtension>,
}

impl ExtensionBinding {
    pub fn type_id_string(&self) -> String {
        self.type_id.hyphenated().to_string()
    }
}

pub static BINDINGS: &[ExtensionBinding] = &[
    ExtensionBinding {
        type_id: PHONE_ATTRIBUTE,
        name: "phone",
        field: CanonicalField::Telecom,
        project: project_phone,
        extract: extract_phone,
        ingest_extension: None,
    },
    ExtensionBinding {
        type_id: EMAIL_ATTRIBUTE,
        name: "email",
        field: CanonicalField::Telecom,
        project: project_email,
        extract: extract_email,
        ingest_extension: None,
    },
    ExtensionBinding {
        type_id: NATIONALITY_ATTRIBUTE,
        name: "nationality",
        field: CanonicalField::Nationality,
        project: project_nationality,
        extract: extract_nationality,
        ingest_extension: None,
    },
    ExtensionBinding {
        type_id: BIOLOGICAL_SEX_ATTRIBUTE,
        name: "biological sex",
        field: CanonicalField::BiologicalSex,
        project: project_biological_sex,
        extract: extract_biological_sex,
        ingest_extension: None,
    },
    ExtensionBinding {
        type_id: NATIONAL_ID_ATTRIBUTE,
        name: "national identifier",
        field: CanonicalField::Identifier,
        project: project_national_id,
        extract: extract_national_id,
        ingest_extension: Some(IngestExtension {
            url: NATIONAL_IDENTIFIER_URL,
            placement: Placement::Record,
        }),
    },
    ExtensionBinding {
        type_id: SECOND_FAMILY_NAME_ATTRIBUTE,
        name: "second family name",
        field: CanonicalField::SecondFamilyName,
        project: project_second_family_name,
        extract: extract_second_family_name,
        ingest_extension: Some(IngestExtension {
            url: SECOND_FAMILY_NAME_URL,
            placement: Placement::Name,
        }),
    },
];

/// Find the binding for a source type identifier.
///
/// Matching is on the parsed UUID, so case differences in the source's spelling don't matter.
/// Anything that is not a UUID has no binding.
pub fn binding_for(type_id: &str) -> Option<&'static ExtensionBinding> {
    let parsed = Uuid::parse_str(type_id.trim()).ok()?;
    BINDINGS.iter().find(|b| b.type_id == parsed)
}

// ============================================================================
// Forward projections
// ============================================================================

fn project_phone(value: &NonEmptyText, _: &ProjectionContext<'_>) -> Vec<CanonicalFragment> {
    vec![CanonicalFragment::Telecom(Telecom {
        system: TelecomSystem::Phone,
        value: value.as_str().to_string(),
        use_type: Some(TelecomUse::Mobile),
    })]
}

fn project_email(value: &NonEmptyText, _: &ProjectionContext<'_>) -> Vec<CanonicalFragment> {
    vec![CanonicalFragment::Telecom(Telecom {
        system: TelecomSystem::Email,
        value: value.as_str().to_string(),
        use_type: Some(TelecomUse::Home),
    })]
}

fn project_nationality(value: &NonEmptyText, _: &ProjectionContext<'_>) -> Vec<CanonicalFragment> {
    let label = value.as_str();
    let coding = Coding {
        system: Some(ISO_3166_SYSTEM.to_string()),
        code: codes::country_code(label).map(str::to_string),
        display: Some(label.to_string()),
    };
    vec![CanonicalFragment::Nationality(coding)]
}

/// The sex attribute yields the gender-identity coding (derived from the record's
/// administrative gender) followed by the biological-sex coding.
fn project_biological_sex(
    value: &NonEmptyText,
    ctx: &ProjectionContext<'_>,
) -> Vec<CanonicalFragment> {
    let identity = GenderIdentity::lookup(ctx.administrative_gender);
    let display = value.as_str();

    vec![
        CanonicalFragment::GenderIdentity(Coding::new(
            GENDER_IDENTITY_SYSTEM,
            identity.code(),
            identity.display(),
        )),
        CanonicalFragment::BiologicalSex(Coding::new(
            ADMINISTRATIVE_GENDER_SYSTEM,
            codes::biological_sex_code(display),
            display,
        )),
    ]
}

fn project_national_id(value: &NonEmptyText, _: &ProjectionContext<'_>) -> Vec<CanonicalFragment> {
    vec![CanonicalFragment::Identifier(national_identifier(
        value.clone(),
    ))]
}

fn project_second_family_name(
    value: &NonEmptyText,
    _: &ProjectionContext<'_>,
) -> Vec<CanonicalFragment> {
    vec![CanonicalFragment::SecondFamilyName(
        value.as_str().to_string(),
    )]
}

/// A RUT identifier with its Chilean type coding and issuing-country extension.
pub fn national_identifier(value: NonEmptyText) -> CanonicalIdentifier {
    let country_code = codes::country_code(NATIONAL_IDENTIFIER_COUNTRY).unwrap_or_default();

    CanonicalIdentifier {
        use_type: Some(OFFICIAL_USE.to_string()),
        system: Some(NATIONAL_IDENTIFIER_SYSTEM.to_string()),
        type_coding: vec![Coding::new(
            IDENTIFIER_TYPE_SYSTEM,
            NATIONAL_IDENTIFIER_TYPE_CODE,
            NATIONAL_IDENTIFIER_COUNTRY,
        )],
        type_extension: vec![Extension::codeable(
            COUNTRY_CODE_URL,
            Coding::new(ISO_3166_SYSTEM, country_code, NATIONAL_IDENTIFIER_COUNTRY),
        )],
        value,
    }
}

// ============================================================================
// Reverse extraction
// ============================================================================

fn extract_phone(record: &CanonicalPatientRecord) -> Vec<String> {
    record.telecom_values(TelecomSystem::Phone)
}

fn extract_email(record: &CanonicalPatientRecord) -> Vec<String> {
    record.telecom_values(TelecomSystem::Email)
}

fn coding_displays(codings: &[Coding]) -> Vec<String> {
    codings
        .iter()
        .filter_map(|c| c.display.as_deref())
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn extract_nationality(record: &CanonicalPatientRecord) -> Vec<String> {
    coding_displays(&record.nationality)
}

fn extract_biological_sex(record: &CanonicalPatientRecord) -> Vec<String> {
    coding_displays(&record.biological_sex)
}

fn extract_national_id(record: &CanonicalPatientRecord) -> Vec<String> {
    record
        .identifiers
        .iter()
        .filter(|id| id.is_national_identifier())
        .map(|id| id.value.as_str().to_string())
        .collect()
}

fn extract_second_family_name(record: &CanonicalPatientRecord) -> Vec<String> {
    record
        .name
        .second_family
        .iter()
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .collect()
}
