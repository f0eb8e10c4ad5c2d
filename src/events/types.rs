//! Diagnostic event types emitted by the resolver.
//!
//! These are structured so a caller can route them (tracing or a report file)
//! without parsing log text. Every variant serializes to a tagged JSON object.

use serde::Serialize;

use crate::region_linking::normalize::AdministrativeType;

/// How loudly a diagnostic should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// A structured diagnostic.
///
/// Tagged enum for clean JSON serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Master row whose name normalizes to nothing
    UnmappedMasterRow {
        row: usize,
        raw_name: Option<String>,
    },

    /// Master row whose name starts with neither "Kabupaten" nor "Kota"
    UnrecognizedMasterType { row: usize, raw_name: String },

    /// Master row without a region code; cannot produce site IDs
    MissingRegionCode { row: usize, raw_name: String },

    /// A later master row replaced an earlier one under the same key
    DuplicateMasterKey {
        admin_type: AdministrativeType,
        key: String,
        replaced_row: usize,
        by_row: usize,
    },

    /// Index construction finished
    IndexBuilt {
        cities: usize,
        regencies: usize,
        unmapped: usize,
        unrecognized: usize,
        overwritten_keys: usize,
    },

    /// Input rows dropped for null required fields
    InputRowsExcluded {
        missing_facility_id: usize,
        missing_address_fragment: usize,
        excluded_rows: usize,
    },

    /// Resolved after removing spaces and punctuation
    CleanedMatch {
        facility_id: String,
        candidate: String,
        matched: String,
    },

    /// Resolved through a unique substring hit on cleaned names
    SubstringMatch {
        facility_id: String,
        candidate: String,
        matched: String,
    },

    /// Resolved by similarity; needs audit
    FuzzyMatch {
        facility_id: String,
        candidate: String,
        matched: String,
        similarity: f64,
    },

    /// Several keys shared the best fuzzy score, so none was taken
    FuzzyTie {
        facility_id: String,
        candidate: String,
        similarity: f64,
        count: usize,
    },

    /// Resolved against the other administrative type's index
    CrossTypeMatch {
        facility_id: String,
        raw_fragment: String,
        parsed_type: AdministrativeType,
        matched_type: AdministrativeType,
        matched: String,
    },

    /// Several master rows matched
    AmbiguousMatch {
        facility_id: String,
        candidate: String,
        count: usize,
        example: String,
    },

    /// Nothing matched in either index
    NoMatch {
        facility_id: String,
        candidate: String,
    },
}

impl Diagnostic {
    /// Get the event type as a string
    pub fn event_type_str(&self) -> &'static str {
        match self {
            Diagnostic::UnmappedMasterRow { .. } => "unmapped_master_row",
            Diagnostic::UnrecognizedMasterType { .. } => "unrecognized_master_type",
            Diagnostic::MissingRegionCode { .. } => "missing_region_code",
            Diagnostic::DuplicateMasterKey { .. } => "duplicate_master_key",
            Diagnostic::IndexBuilt { .. } => "index_built",
            Diagnostic::InputRowsExcluded { .. } => "input_rows_excluded",
            Diagnostic::CleanedMatch { .. } => "cleaned_match",
            Diagnostic::SubstringMatch { .. } => "substring_match",
            Diagnostic::FuzzyMatch { .. } => "fuzzy_match",
            Diagnostic::FuzzyTie { .. } => "fuzzy_tie",
            Diagnostic::CrossTypeMatch { .. } => "cross_type_match",
            Diagnostic::AmbiguousMatch { .. } => "ambiguous_match",
            Diagnostic::NoMatch { .. } => "no_match",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::IndexBuilt { .. }
            | Diagnostic::CleanedMatch { .. }
            | Diagnostic::SubstringMatch { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }
}
