//! Constants used throughout the bridge core crate.
//!
//! Code systems and extension URLs of the target (FHIR) profile live here so the rendering
//! and projection code never spells them inline. Source attribute-type identifiers are NOT
//! here: they belong to the binding table in [`crate::bindings`].

/// ISO 3166 country code system.
pub const ISO_3166_SYSTEM: &str = "urn:iso:std:iso:3166";

/// Administrative gender code system, used for the biological-sex coding.
pub const ADMINISTRATIVE_GENDER_SYSTEM: &str = "http://hl7.org/fhir/administrative-gender";

/// Gender identity code system.
pub const GENDER_IDENTITY_SYSTEM: &str =
    "https://interoperabilidad.minsal.cl/fhir/ig/eis/CodeSystem/CSIdentidadGenero";

/// National identifier system for RUT identifiers.
pub const NATIONAL_IDENTIFIER_SYSTEM: &str =
    "https://hl7chile.cl/fhir/ig/clcore/CodeSystem/CSIdentificadoresCL";

/// Identifier-type code system.
pub const IDENTIFIER_TYPE_SYSTEM: &str =
    "https://hl7chile.cl/fhir/ig/clcore/CodeSystem/CSCodigoDNI";

/// Identifier-type code for a Chilean national identifier.
pub const NATIONAL_IDENTIFIER_TYPE_CODE: &str = "NNCHL";

/// Country the national identifier is issued by.
pub const NATIONAL_IDENTIFIER_COUNTRY: &str = "Chile";

/// `use` of a national identifier.
pub const OFFICIAL_USE: &str = "official";

/// Record-level biological sex extension.
pub const BIOLOGICAL_SEX_URL: &str =
    "https://hl7chile.cl/fhir/ig/clcore/StructureDefinition/SexoBiologico";

/// Record-level nationality extension.
pub const NATIONALITY_URL: &str =
    "https://hl7chile.cl/fhir/ig/clcore/StructureDefinition/Nacionalidad";

/// Nationality URL written by earlier exports of the bridge. Read, never written.
pub const LEGACY_NATIONALITY_URL: &str = "code";

/// Record-level gender identity extension (value in a nested `value` sub-extension).
pub const GENDER_IDENTITY_URL: &str =
    "http://hl7.org/fhir/StructureDefinition/individual-genderIdentity";

/// Sub-extension URL carrying the gender identity coding.
pub const GENDER_IDENTITY_VALUE_URL: &str = "value";

/// Name-level second family name extension.
pub const SECOND_FAMILY_NAME_URL: &str =
    "https://hl7chile.cl/fhir/ig/clcore/StructureDefinition/SegundoApellido";

/// Record-level national identifier extension expected by the source ingestion endpoint.
pub const NATIONAL_IDENTIFIER_URL: &str =
    "https://hl7chile.cl/fhir/ig/clcore/StructureDefinition/CodigoIdentificador";

/// Identifier-type extension naming the issuing country.
pub const COUNTRY_CODE_URL: &str =
    "https://hl7chile.cl/fhir/ig/clcore/StructureDefinition/CodigoPaises";

/// Prefix of extension URLs that carry unclassified source attributes (`urn:uuid:<type>`).
pub const SOURCE_ATTRIBUTE_URL_PREFIX: &str = "urn:uuid:";

/// Gender written when a record carries none and the receiving system requires one.
pub const DEFAULT_GENDER: &str = "unknown";

/// Default base URL of the source-system proxy.
pub const DEFAULT_SOURCE_URL: &str = "http://127.0.0.1:5000";

/// Default base URL of the FHIR server.
pub const DEFAULT_TARGET_URL: &str = "http://localhost:8081/fhir";

/// Default per-fetch timeout in milliseconds.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Default REST listen address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";
