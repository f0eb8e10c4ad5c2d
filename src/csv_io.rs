//! CSV adapters
//!
//! The core works on in-memory `Table`s; this module is the file boundary.
//! Empty CSV fields load as null cells. Row-width problems are left to
//! `Table::check_shape` so they surface as `EngineError::RaggedRow`.

use std::io;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::Result;
use crate::region_linking::resolver::UnresolvedRecord;
use crate::site_id::IdentifiedRecord;
use crate::table::Table;

/// Fixed leading columns of the resolved output
pub const RESOLVED_COLUMNS: [&str; 10] = [
    "internal_site_id",
    "region_name",
    "region_code",
    "regional_code",
    "province",
    "region",
    "raw_address",
    "facility_id",
    "matched_type",
    "match_strategy",
];

pub const UNRESOLVED_COLUMNS: [&str; 7] = [
    "row_index",
    "facility_id",
    "raw_address",
    "candidate_name",
    "parsed_type",
    "failure_kind",
    "failure_reason",
];

/// Load a CSV file with a header row into a `Table`
pub fn read_table(path: impl AsRef<Path>, name: &str) -> Result<Table> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_ref())?;
    read_table_from(reader, name)
}

/// Load CSV from any reader
pub fn read_table_from<R: io::Read>(mut reader: csv::Reader<R>, name: &str) -> Result<Table> {
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = Table::new(name, headers);

    for record in reader.records() {
        let record = record?;
        table.push_row(
            record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }

    debug!(table = name, rows = table.len(), "CSV loaded");
    Ok(table)
}

/// Passthrough column names across all records, in first-seen order
fn passthrough_columns<'a>(
    passthrough: impl IntoIterator<Item = &'a IndexMap<String, String>>,
) -> IndexSet<&'a str> {
    passthrough
        .into_iter()
        .flat_map(|columns| columns.keys().map(String::as_str))
        .collect()
}

/// Values for `columns`, empty where a record has no such cell
fn passthrough_values<'a>(
    passthrough: &'a IndexMap<String, String>,
    columns: &'a IndexSet<&str>,
) -> impl Iterator<Item = String> + 'a {
    columns
        .iter()
        .map(|column| passthrough.get(*column).cloned().unwrap_or_default())
}

pub fn write_resolved(path: impl AsRef<Path>, records: &[IdentifiedRecord]) -> Result<()> {
    let writer = csv::Writer::from_path(path.as_ref())?;
    write_resolved_to(writer, records)
}

/// Write resolved records, in the order given, followed by their passthrough columns
pub fn write_resolved_to<W: io::Write>(
    mut writer: csv::Writer<W>,
    records: &[IdentifiedRecord],
) -> Result<()> {
    let extra = passthrough_columns(records.iter().map(|r| &r.record.passthrough));
    writer.write_record(RESOLVED_COLUMNS.iter().copied().chain(extra.iter().copied()))?;

    for identified in records {
        let record = &identified.record;
        let region = &record.region;
        let mut row = vec![
            identified.internal_site_id(),
            region.raw_name.clone(),
            region.region_code.clone(),
            identified.site_id.regional_code.clone(),
            region.province.clone().unwrap_or_default(),
            region.region.clone().unwrap_or_default(),
            record.raw_fragment.clone(),
            record.facility_id.clone(),
            record.matched_type.to_string(),
            record.strategy.to_string(),
        ];
        row.extend(passthrough_values(&record.passthrough, &extra));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_unresolved(path: impl AsRef<Path>, records: &[UnresolvedRecord]) -> Result<()> {
    let writer = csv::Writer::from_path(path.as_ref())?;
    write_unresolved_to(writer, records)
}

/// Write unresolved records, in the order given, followed by their passthrough columns
pub fn write_unresolved_to<W: io::Write>(
    mut writer: csv::Writer<W>,
    records: &[UnresolvedRecord],
) -> Result<()> {
    let extra = passthrough_columns(records.iter().map(|r| &r.passthrough));
    writer.write_record(UNRESOLVED_COLUMNS.iter().copied().chain(extra.iter().copied()))?;

    for record in records {
        let mut row = vec![
            record.row_index.to_string(),
            record.facility_id.clone(),
            record.raw_fragment.clone(),
            record.candidate_name.clone().unwrap_or_default(),
            record
                .parsed_type
                .map(|t| t.to_string())
                .unwrap_or_default(),
            record.reason.code().to_string(),
            record.reason.to_string(),
        ];
        row.extend(passthrough_values(&record.passthrough, &extra));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
