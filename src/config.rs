//! Resolver configuration
//!
//! Column names for the two input tables plus the matching knobs. Every field
//! has a default matching the asset/master spreadsheets the resolver was built
//! for, so an empty YAML document is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::region_linking::similarity::SimilarityMetric;

/// Default acceptance threshold for the fuzzy stage
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.80;

/// Default number of unmapped patterns listed in the run summary
pub const DEFAULT_TOP_UNMAPPED: usize = 10;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Column names of the master (reference) table
    pub master_columns: MasterColumns,
    /// Column names of the asset (input) table
    pub input_columns: InputColumns,
    /// Matching behaviour
    pub matching: MatchingConfig,
    /// Resolve rows on the rayon thread pool
    pub parallel: bool,
    /// How many unmapped candidate names the summary lists
    pub top_unmapped_patterns: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            master_columns: MasterColumns::default(),
            input_columns: InputColumns::default(),
            matching: MatchingConfig::default(),
            parallel: false,
            top_unmapped_patterns: DEFAULT_TOP_UNMAPPED,
        }
    }
}

/// Master table column mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterColumns {
    pub name: String,
    pub code: String,
    pub regional_code: String,
    pub province: String,
    pub region: String,
}

impl Default for MasterColumns {
    fn default() -> Self {
        Self {
            name: "City".to_string(),
            code: "CityCode".to_string(),
            regional_code: "RegionalCode".to_string(),
            province: "Province".to_string(),
            region: "Region".to_string(),
        }
    }
}

impl MasterColumns {
    /// All required master columns, in table order
    pub fn required(&self) -> [&str; 5] {
        [
            &self.name,
            &self.code,
            &self.regional_code,
            &self.province,
            &self.region,
        ]
    }
}

/// Input table column mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputColumns {
    /// Facility identifier (required, non-null)
    pub facility_id: String,
    /// Free-text address fragment to resolve (required, non-null)
    pub address_fragment: String,
}

impl Default for InputColumns {
    fn default() -> Self {
        Self {
            facility_id: "Funcloc".to_string(),
            address_fragment: "Alamat4".to_string(),
        }
    }
}

impl InputColumns {
    pub fn required(&self) -> [&str; 2] {
        [&self.facility_id, &self.address_fragment]
    }
}

/// What the fuzzy stage does when several keys share the best score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyTieBreak {
    /// A tie at the top is not a match
    #[default]
    Reject,
    /// The tied key seen first in index order wins
    FirstInOrder,
}

/// Matching knobs for the resolver stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum similarity accepted by the fuzzy stage (inclusive)
    pub fuzzy_threshold: f64,
    /// Similarity metric used by the fuzzy stage
    pub metric: SimilarityMetric,
    pub fuzzy_tie_break: FuzzyTieBreak,
    /// Try the other administrative type's exact key when everything else fails
    pub cross_type_fallback: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            metric: SimilarityMetric::default(),
            fuzzy_tie_break: FuzzyTieBreak::default(),
            cross_type_fallback: true,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text and validate it
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // serde_yaml rejects an empty document, which we treat as "all defaults"
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and column names
    pub fn validate(&self) -> Result<()> {
        let threshold = self.matching.fuzzy_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "fuzzy_threshold must be within [0, 1], got {threshold}"
            )));
        }

        let columns = self
            .master_columns
            .required()
            .into_iter()
            .chain(self.input_columns.required());
        for column in columns {
            if column.trim().is_empty() {
                return Err(EngineError::InvalidConfig(
                    "column names must not be blank".to_string(),
                ));
            }
        }

        Ok(())
    }
}
