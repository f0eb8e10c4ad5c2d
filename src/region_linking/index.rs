//! Master index for in-memory region resolution
//!
//! `MasterIndex` holds one insertion-ordered map per administrative type,
//! keyed by normalized master name. It is built once from the master table
//! and only read afterwards; resolved records share its `MasterRegion`s
//! through `Arc`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use super::normalize::{clean_for_compare, normalize_master_name, AdministrativeType};
use crate::events::{Diagnostic, DiagnosticSink};
use crate::site_id::canonical_code;
use crate::table::MasterRow;

/// Normalized name -> region, in first-insertion order
pub type RegionMap = IndexMap<String, Arc<MasterRegion>>;

/// A single region of the reference dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MasterRegion {
    /// Zero-based row in the master table
    pub row_index: usize,
    /// Name as given (e.g. "Kabupaten Aceh Barat")
    pub raw_name: String,
    /// Uppercase, prefix-stripped name (e.g. "ACEH BARAT")
    pub normalized_name: String,
    /// `normalized_name` reduced to `A-Z0-9`, for cleaned comparisons
    pub cleaned_name: String,
    pub admin_type: AdministrativeType,
    /// Canonical region code (e.g. "11")
    pub region_code: String,
    /// Regional code as given; formatted at ID assignment
    pub regional_code: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
}

/// Counters gathered while building the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub cities: usize,
    pub regencies: usize,
    /// Rows whose name normalized to nothing
    pub unmapped: usize,
    /// Rows with neither recognized prefix
    pub unrecognized: usize,
    /// Rows skipped for a null region code
    pub missing_code: usize,
    /// Keys replaced by a later row of the same type
    pub overwritten_keys: usize,
}

/// Two lookups, one per administrative type
#[derive(Debug, Clone, Default)]
pub struct MasterIndex {
    cities: RegionMap,
    regencies: RegionMap,
    stats: IndexStats,
}

impl MasterIndex {
    /// Build the index from master rows.
    ///
    /// Never fails: unusable rows are reported through `sink` and skipped.
    /// Duplicate keys within a type are last-write-wins.
    pub fn build(rows: &[MasterRow], sink: &dyn DiagnosticSink) -> Self {
        let mut index = Self::default();

        for row in rows {
            let raw_name = row.name.as_deref().unwrap_or_default();
            let normalized_name = normalize_master_name(raw_name);

            if normalized_name.is_empty() {
                index.stats.unmapped += 1;
                sink.emit(Diagnostic::UnmappedMasterRow {
                    row: row.row_index,
                    raw_name: row.name.clone(),
                });
                continue;
            }

            let Some(admin_type) = AdministrativeType::from_master_name(raw_name) else {
                index.stats.unrecognized += 1;
                sink.emit(Diagnostic::UnrecognizedMasterType {
                    row: row.row_index,
                    raw_name: raw_name.to_string(),
                });
                continue;
            };

            let Some(region_code) = row.code.as_deref().map(canonical_code) else {
                index.stats.missing_code += 1;
                sink.emit(Diagnostic::MissingRegionCode {
                    row: row.row_index,
                    raw_name: raw_name.to_string(),
                });
                continue;
            };

            let region = Arc::new(MasterRegion {
                row_index: row.row_index,
                raw_name: raw_name.to_string(),
                cleaned_name: clean_for_compare(&normalized_name),
                normalized_name: normalized_name.clone(),
                admin_type,
                region_code,
                regional_code: row.regional_code.clone(),
                province: row.province.clone(),
                region: row.region.clone(),
            });

            if let Some(replaced) = index.map_mut(admin_type).insert(normalized_name, region) {
                index.stats.overwritten_keys += 1;
                sink.emit(Diagnostic::DuplicateMasterKey {
                    admin_type,
                    key: replaced.normalized_name.clone(),
                    replaced_row: replaced.row_index,
                    by_row: row.row_index,
                });
            }
        }

        index.stats.cities = index.cities.len();
        index.stats.regencies = index.regencies.len();

        info!(
            cities = index.stats.cities,
            regencies = index.stats.regencies,
            unmapped = index.stats.unmapped,
            overwritten = index.stats.overwritten_keys,
            "Master index built"
        );
        sink.emit(Diagnostic::IndexBuilt {
            cities: index.stats.cities,
            regencies: index.stats.regencies,
            unmapped: index.stats.unmapped,
            unrecognized: index.stats.unrecognized,
            overwritten_keys: index.stats.overwritten_keys,
        });

        index
    }

    /// The lookup for one administrative type
    pub fn map(&self, admin_type: AdministrativeType) -> &RegionMap {
        match admin_type {
            AdministrativeType::City => &self.cities,
            AdministrativeType::Regency => &self.regencies,
        }
    }

    fn map_mut(&mut self, admin_type: AdministrativeType) -> &mut RegionMap {
        match admin_type {
            AdministrativeType::City => &mut self.cities,
            AdministrativeType::Regency => &mut self.regencies,
        }
    }

    /// Exact lookup by normalized name
    pub fn get(&self, admin_type: AdministrativeType, name: &str) -> Option<&Arc<MasterRegion>> {
        self.map(admin_type).get(name)
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.cities.len() + self.regencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
