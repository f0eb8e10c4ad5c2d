//! Name normalization for region matching
//!
//! Three transforms, all pure:
//! - master names lose their administrative prefix ("Kabupaten", "Kota Adm.", "Kota")
//! - any name can be reduced to its cleaned form (`A-Z0-9` only) for robust comparison
//! - raw address fragments are parsed into a candidate name and an administrative type
//!
//! Text is NFKC-folded before case mapping so full-width and compatibility
//! characters compare equal to their plain forms.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Master-name prefixes, tried in order; the first match is removed once
static MASTER_PREFIXES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)^kabupaten\s+").unwrap(),
        Regex::new(r"(?i)^kota\s+adm\.\s+").unwrap(),
        Regex::new(r"(?i)^kota\s+").unwrap(),
    ]
});

/// Trailing city marker on an uppercased address fragment
static CITY_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*KOTA$").unwrap());

/// Administrative classification of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdministrativeType {
    /// Kota
    City,
    /// Kabupaten
    Regency,
}

impl AdministrativeType {
    /// The opposite classification, used by the cross-type fallback
    pub fn other(self) -> Self {
        match self {
            Self::City => Self::Regency,
            Self::Regency => Self::City,
        }
    }

    /// Classify a master name by its leading word
    pub fn from_master_name(raw_name: &str) -> Option<Self> {
        let lower = raw_name.trim().to_lowercase();
        if lower.starts_with("kabupaten") {
            Some(Self::Regency)
        } else if lower.starts_with("kota") {
            Some(Self::City)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Regency => "regency",
        }
    }
}

impl fmt::Display for AdministrativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of parsing a raw address fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFragment {
    /// Blank input; nothing to match
    Empty,
    /// A city marker with nothing in front of it (e.g. ", KOTA")
    Invalid,
    /// A candidate name with its inferred type
    Candidate {
        name: String,
        admin_type: AdministrativeType,
    },
}

/// Collapse runs of whitespace to single spaces and trim both ends
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold(s: &str) -> String {
    s.nfkc().collect()
}

/// Normalize a master-table name.
///
/// # Examples
///
/// ```
/// use site_resolver::region_linking::normalize::normalize_master_name;
///
/// assert_eq!(normalize_master_name("Kabupaten Aceh Barat"), "ACEH BARAT");
/// assert_eq!(normalize_master_name("Kota Bandung"), "BANDUNG");
/// assert_eq!(normalize_master_name("Kota Adm. Jakarta Barat"), "JAKARTA BARAT");
/// ```
pub fn normalize_master_name(raw_name: &str) -> String {
    let folded = fold(raw_name);
    let trimmed = folded.trim();

    let stripped = MASTER_PREFIXES
        .iter()
        .find_map(|re| re.find(trimmed).map(|prefix| &trimmed[prefix.end()..]))
        .unwrap_or(trimmed);

    collapse_whitespace(stripped).to_uppercase()
}

/// Reduce a name to uppercase ASCII letters and digits.
///
/// Only used for comparisons; never stored as a canonical name.
pub fn clean_for_compare(s: &str) -> String {
    fold(s)
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}

/// Parse a raw address fragment.
///
/// A trailing ", KOTA" marks a city; anything else is read as a regency.
///
/// ```
/// use site_resolver::region_linking::normalize::{parse_address_fragment, AdministrativeType, ParsedFragment};
///
/// assert_eq!(
///     parse_address_fragment(Some("Bandung, Kota")),
///     ParsedFragment::Candidate { name: "BANDUNG".to_string(), admin_type: AdministrativeType::City },
/// );
/// ```
pub fn parse_address_fragment(raw: Option<&str>) -> ParsedFragment {
    let Some(raw) = raw else {
        return ParsedFragment::Empty;
    };

    let value = fold(raw).trim().to_uppercase();
    if value.is_empty() {
        return ParsedFragment::Empty;
    }

    let (name, admin_type) = match CITY_SUFFIX_RE.find(&value) {
        Some(marker) => (&value[..marker.start()], AdministrativeType::City),
        None => (value.as_str(), AdministrativeType::Regency),
    };

    let name = collapse_whitespace(name);
    if name.is_empty() {
        return ParsedFragment::Invalid;
    }

    ParsedFragment::Candidate { name, admin_type }
}
