//! The canonical, system-neutral patient record and the fragments it is assembled from.
//!
//! A [`CanonicalPatientRecord`] is built fresh for every transfer by
//! [`crate::assembler::assemble`] (forward) or [`crate::render::from_fhir`] (reverse) and is
//! only ever read afterwards. Everything downstream takes it by shared reference and produces
//! new values.

use bridge_types::NonEmptyText;
use fhir::{Coding, Extension, NameUse};
use serde_json::Value;
use serde::Serialize;

use crate::constants::{NATIONAL_IDENTIFIER_SYSTEM, OFFICIAL_USE};
use crate::resolver::ResolvedAttribute;

// ============================================================================
// Telecom
// ============================================================================

/// Kind of contact point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TelecomSystem {
    Phone,
    Email,
    Fax,
    Pager,
    Url,
    Sms,
    Other,
}

impl TelecomSystem {
    pub fn to_wire(&self) -> &'static str {
        match self {
            TelecomSystem::Phone => "phone",
            TelecomSystem::Email => "email",
            TelecomSystem::Fax => "fax",
            TelecomSystem::Pager => "pager",
            TelecomSystem::Url => "url",
            TelecomSystem::Sms => "sms",
            TelecomSystem::Other => "other",
        }
    }

    /// Unknown systems are classified as [`TelecomSystem::Other`].
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "phone" => TelecomSystem::Phone,
            "email" => TelecomSystem::Email,
            "fax" => TelecomSystem::Fax,
            "pager" => TelecomSystem::Pager,
            "url" => TelecomSystem::Url,
            "sms" => TelecomSystem::Sms,
            _ => TelecomSystem::Other,
        }
    }
}

/// Purpose of a contact point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TelecomUse {
    Home,
    Work,
    Temp,
    Old,
    Mobile,
}

impl TelecomUse {
    pub fn to_wire(self) -> &'static str {
        match self {
            TelecomUse::Home => "home",
            TelecomUse::Work => "work",
            TelecomUse::Temp => "temp",
            TelecomUse::Old => "old",
            TelecomUse::Mobile => "mobile",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "home" => Some(TelecomUse::Home),
            "work" => Some(TelecomUse::Work),
            "temp" => Some(TelecomUse::Temp),
            "old" => Some(TelecomUse::Old),
            "mobile" => Some(TelecomUse::Mobile),
            _ => None,
        }
    }
}

/// A phone number, email address or other contact point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Telecom {
    pub system: TelecomSystem,
    pub value: String,
    pub use_type: Option<TelecomUse>,
}

// ============================================================================
// Identifiers
// ============================================================================

/// A business identifier. The value is never blank.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CanonicalIdentifier {
    pub use_type: Option<String>,
    pub system: Option<String>,
    pub type_coding: Vec<Coding>,
    /// Issuing-authority details, e.g. the country code extension.
    pub type_extension: Vec<Extension>,
    pub value: NonEmptyText,
}

impl CanonicalIdentifier {
    /// True for the official national identifier (RUT).
    pub fn is_national_identifier(&self) -> bool {
        self.use_type.as_deref() == Some(OFFICIAL_USE)
            && self.system.as_deref() == Some(NATIONAL_IDENTIFIER_SYSTEM)
    }
}

// ============================================================================
// Names and addresses
// ============================================================================

/// A person's name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CanonicalName {
    /// Name use as the target wrote it. Rendering falls back to `official` for the primary name.
    pub use_type: Option<NameUse>,
    pub given: Vec<String>,
    pub family: Option<String>,
    /// Second family names. Normally zero or one; duplicates from the source are kept.
    pub second_family: Vec<String>,
    /// Name-level extensions with no canonical meaning, kept verbatim.
    pub extension: Vec<Extension>,
}

/// A postal address.
///
/// `lines` keeps the source's shape: `None` means "no line member", `Some(vec![])` means an
/// explicitly empty list. Reverse projection normalises the latter away.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalAddress {
    pub lines: Option<Vec<String>>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl CanonicalAddress {
    pub fn is_empty(&self) -> bool {
        self.lines.is_none()
            && self.city.is_none()
            && self.district.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }
}

// ============================================================================
// Fragments
// ============================================================================

/// Canonical fields a resolved attribute can be projected into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CanonicalField {
    Telecom,
    Identifier,
    Nationality,
    BiologicalSex,
    GenderIdentity,
    SecondFamilyName,
    Address,
}

impl CanonicalField {
    /// Whether the field normally holds a single value. Repeats are kept but reported.
    pub fn is_single_valued(self) -> bool {
        matches!(
            self,
            CanonicalField::Nationality
                | CanonicalField::BiologicalSex
                | CanonicalField::GenderIdentity
                | CanonicalField::SecondFamilyName
        )
    }
}

/// One projected value, tagged with the canonical field it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub enum CanonicalFragment {
    Telecom(Telecom),
    Identifier(CanonicalIdentifier),
    Nationality(Coding),
    BiologicalSex(Coding),
    GenderIdentity(Coding),
    SecondFamilyName(String),
    Address(CanonicalAddress),
}

impl CanonicalFragment {
    pub fn field(&self) -> CanonicalField {
        match self {
            CanonicalFragment::Telecom(_) => CanonicalField::Telecom,
            CanonicalFragment::Identifier(_) => CanonicalField::Identifier,
            CanonicalFragment::Nationality(_) => CanonicalField::Nationality,
            CanonicalFragment::BiologicalSex(_) => CanonicalField::BiologicalSex,
            CanonicalFragment::GenderIdentity(_) => CanonicalField::GenderIdentity,
            CanonicalFragment::SecondFamilyName(_) => CanonicalField::SecondFamilyName,
            CanonicalFragment::Address(_) => CanonicalField::Address,
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// Data carried through unclassified.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum PassThrough {
    /// A source attribute whose type has no binding.
    SourceAttribute(ResolvedAttribute),
    /// A target extension whose URL has no canonical meaning.
    TargetExtension(Extension),
}

/// A member of a target resource that neither the canonical record nor the source system can
/// represent, e.g. `active` or `name[0].prefix`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnmodelledMember {
    /// Member path within the resource, with indices from the resource as read.
    pub path: String,
    pub value: Value,
}

/// The assembled, schema-neutral patient record.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CanonicalPatientRecord {
    /// Identifier assigned by the system the record was read from.
    pub source_id: Option<String>,
    /// The primary name. There is always exactly one.
    pub name: CanonicalName,
    /// Any further names, in source order.
    pub other_names: Vec<CanonicalName>,
    pub birth_date: Option<String>,
    /// Administrative gender as the source wrote it.
    pub gender: Option<String>,
    pub biological_sex: Vec<Coding>,
    pub gender_identity: Vec<Coding>,
    pub nationality: Vec<Coding>,
    pub addresses: Vec<CanonicalAddress>,
    pub telecom: Vec<Telecom>,
    pub identifiers: Vec<CanonicalIdentifier>,
    pub unclassified: Vec<PassThrough>,
    /// Target members with no home anywhere. Empty for records read from the source.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmodelled: Vec<UnmodelledMember>,
}

impl CanonicalPatientRecord {
    /// The official national identifier, if the record has one.
    pub fn national_identifier(&self) -> Option<&CanonicalIdentifier> {
        self.identifiers
            .iter()
            .find(|id| id.is_national_identifier())
    }

    /// Values of all telecom entries with the given system.
    pub fn telecom_values(&self, system: TelecomSystem) -> Vec<String> {
        self.telecom
            .iter()
            .filter(|t| t.system == system)
            .map(|t| t.value.clone())
            .collect()
    }
}
