//! Static code tables shared by both directions of a transfer.
//!
//! Each table is an ordered list of `(code, label)` pairs and can be read either way. Order
//! matters for gender identity: the identity code is the 1-based position in the table.

/// Sentinel written when a gender has no gender-identity entry.
///
/// It is deliberately not a label of any table entry, so "we had a gender but could not map
/// it" stays distinguishable from both a mapped value and missing data.
pub const UNMAPPED: &str = "unmapped";

/// ISO 3166 numeric country codes by source-system label.
const COUNTRIES: &[(&str, &str)] = &[
    ("152", "Chile"),
    ("604", "Perú"),
    ("862", "Venezuela"),
    ("032", "Argentina"),
];

/// Administrative gender codes and their gender-identity display.
const GENDER_IDENTITIES: &[(&str, &str)] = &[
    ("male", "Masculino"),
    ("female", "Femenino"),
    ("other", "Otro"),
    ("unknown", "Desconocido"),
];

/// ISO 3166 code for a country label, e.g. `"Chile"` → `"152"`.
pub fn country_code(label: &str) -> Option<&'static str> {
    let label = label.trim();
    COUNTRIES
        .iter()
        .find(|(_, l)| *l == label)
        .map(|(code, _)| *code)
}

/// Country label for an ISO 3166 code, e.g. `"152"` → `"Chile"`.
pub fn country_label(code: &str) -> Option<&'static str> {
    let code = code.trim();
    COUNTRIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

/// Result of looking up an administrative gender in the gender-identity table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenderIdentity {
    Mapped {
        /// 1-based position in the table.
        position: usize,
        display: &'static str,
    },
    Unmapped,
}

impl GenderIdentity {
    /// Look up an administrative gender code, ignoring case and surrounding whitespace.
    pub fn lookup(gender: Option<&str>) -> Self {
        let Some(gender) = gender.map(|g| g.trim().to_lowercase()) else {
            return GenderIdentity::Unmapped;
        };

        GENDER_IDENTITIES
            .iter()
            .position(|(code, _)| *code == gender)
            .map(|idx| GenderIdentity::Mapped {
                position: idx + 1,
                display: GENDER_IDENTITIES[idx].1,
            })
            .unwrap_or(GenderIdentity::Unmapped)
    }

    pub fn code(&self) -> String {
        match self {
            GenderIdentity::Mapped { position, .. } => position.to_string(),
            GenderIdentity::Unmapped => UNMAPPED.to_string(),
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            GenderIdentity::Mapped { display, .. } => display,
            GenderIdentity::Unmapped => UNMAPPED,
        }
    }
}

/// Administrative gender code for a gender-identity display, e.g. `"Femenino"` → `"female"`.
pub fn gender_for_identity_display(display: &str) -> Option<&'static str> {
    let display = display.trim();
    GENDER_IDENTITIES
        .iter()
        .find(|(_, d)| d.eq_ignore_ascii_case(display))
        .map(|(code, _)| *code)
}

/// Biological-sex code for a display value: the display with its first letter lower-cased.
pub fn biological_sex_code(display: &str) -> String {
    let mut chars = display.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countries_map_both_ways() {
        assert_eq!(country_code("Chile"), Some("152"));
        assert_eq!(country_code(" Perú "), Some("604"));
        assert_eq!(country_label("032"), Some("Argentina"));
        assert_eq!(country_code("Narnia"), None);
        assert_eq!(country_label("999"), None);
    }

    #[test]
    fn male_maps_to_masculino_at_position_one() {
        let identity = GenderIdentity::lookup(Some("male"));
        assert_eq!(identity.display(), "Masculino");
        assert_eq!(identity.code(), "1");
    }

    #[test]
    fn gender_lookup_ignores_case() {
        assert_eq!(GenderIdentity::lookup(Some("FEMALE")).display(), "Femenino");
        assert_eq!(GenderIdentity::lookup(Some("Unknown")).code(), "4");
    }

    #[test]
    fn unmapped_gender_yields_sentinel_distinct_from_every_label() {
        let identity = GenderIdentity::lookup(Some("nonbinary"));
        assert_eq!(identity, GenderIdentity::Unmapped);
        assert_eq!(identity.display(), "unmapped");
        assert_eq!(identity.code(), "unmapped");
        assert!(!identity.display().is_empty());
        assert!(GENDER_IDENTITIES.iter().all(|(_, d)| *d != UNMAPPED));
        assert_eq!(GenderIdentity::lookup(None), GenderIdentity::Unmapped);
    }

    #[test]
    fn identity_display_maps_back_to_gender() {
        assert_eq!(gender_for_identity_display("Femenino"), Some("female"));
        assert_eq!(gender_for_identity_display(UNMAPPED), None);
    }

    #[test]
    fn biological_sex_code_lowercases_first_letter_only() {
        assert_eq!(biological_sex_code("Female"), "female");
        assert_eq!(biological_sex_code("Intersex Variant"), "intersex Variant");
        assert_eq!(biological_sex_code("Éter"), "éter");
        assert_eq!(biological_sex_code(""), "");
    }
}
