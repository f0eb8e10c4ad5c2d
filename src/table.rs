//! In-memory tabular datasets
//!
//! The resolver never reads files itself. Callers load the master table and
//! the asset table from wherever they live (see `csv_io` for CSV) into a
//! `Table`, and this module turns those rows into typed `MasterRow` and
//! `InputRecord` values after checking the table structure.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::{InputColumns, MasterColumns};
use crate::error::{EngineError, Result};

/// A named table of optional string cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Create an empty table with the given headers
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from string-slice rows; empty cells become null
    pub fn from_rows(name: impl Into<String>, headers: &[&str], rows: &[Vec<&str>]) -> Self {
        let mut table = Self::new(name, headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(
                row.iter()
                    .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                    .collect(),
            );
        }
        table
    }

    pub fn push_row(&mut self, cells: Vec<Option<String>>) {
        self.rows.push(cells);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell value, `None` for null cells and out-of-range positions
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// Reject duplicate headers and rows whose width differs from the header
    pub fn check_shape(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for header in &self.headers {
            if !seen.insert(header.as_str()) {
                return Err(EngineError::DuplicateColumn {
                    table: self.name.clone(),
                    column: header.clone(),
                });
            }
        }

        let expected = self.headers.len();
        for (row, cells) in self.rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(EngineError::RaggedRow {
                    table: self.name.clone(),
                    row,
                    expected,
                    found: cells.len(),
                });
            }
        }

        Ok(())
    }

    /// Positions of the required columns, or every missing one at once
    pub fn require_columns(&self, required: &[&str]) -> Result<Vec<usize>> {
        let mut positions = Vec::with_capacity(required.len());
        let mut missing = Vec::new();
        for column in required {
            match self.column(column) {
                Some(pos) => positions.push(pos),
                None => missing.push(column.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(EngineError::MissingColumns {
                table: self.name.clone(),
                columns: missing,
            });
        }
        Ok(positions)
    }
}

/// One row of the master table, as given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRow {
    /// Zero-based row position in the master table
    pub row_index: usize,
    pub name: Option<String>,
    pub code: Option<String>,
    pub regional_code: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
}

/// One asset row with both required fields present
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputRecord {
    /// Zero-based row position in the input table
    pub row_index: usize,
    pub facility_id: String,
    pub raw_fragment: String,
    /// Remaining non-null columns, in table order
    pub passthrough: IndexMap<String, String>,
}

/// Accounting of input rows dropped before resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InputValidation {
    pub total_rows: usize,
    pub missing_facility_id: usize,
    pub missing_address_fragment: usize,
    /// Rows excluded because at least one required field was null
    pub excluded_rows: usize,
}

impl InputValidation {
    pub fn valid_rows(&self) -> usize {
        self.total_rows - self.excluded_rows
    }
}

/// Check the master table structure and extract its rows
pub fn master_rows(table: &Table, columns: &MasterColumns) -> Result<Vec<MasterRow>> {
    table.check_shape()?;
    let positions = table.require_columns(&columns.required())?;
    let (name, code, regional, province, region) = (
        positions[0],
        positions[1],
        positions[2],
        positions[3],
        positions[4],
    );

    let owned = |row: usize, col: usize| table.cell(row, col).map(str::to_string);

    Ok((0..table.len())
        .map(|row| MasterRow {
            row_index: row,
            name: owned(row, name),
            code: owned(row, code),
            regional_code: owned(row, regional),
            province: owned(row, province),
            region: owned(row, region),
        })
        .collect())
}

/// Check the input table structure and split its rows into usable records
/// and an exclusion count
pub fn input_records(
    table: &Table,
    columns: &InputColumns,
) -> Result<(Vec<InputRecord>, InputValidation)> {
    table.check_shape()?;
    let positions = table.require_columns(&columns.required())?;
    let (id_col, fragment_col) = (positions[0], positions[1]);

    let mut validation = InputValidation {
        total_rows: table.len(),
        ..InputValidation::default()
    };
    let mut records = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let facility_id = table.cell(row, id_col);
        let fragment = table.cell(row, fragment_col);

        if facility_id.is_none() {
            validation.missing_facility_id += 1;
        }
        if fragment.is_none() {
            validation.missing_address_fragment += 1;
        }

        let (Some(facility_id), Some(fragment)) = (facility_id, fragment) else {
            validation.excluded_rows += 1;
            continue;
        };

        let passthrough = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(col, _)| *col != id_col && *col != fragment_col)
            .filter_map(|(col, header)| {
                table
                    .cell(row, col)
                    .map(|value| (header.clone(), value.to_string()))
            })
            .collect();

        records.push(InputRecord {
            row_index: row,
            facility_id: facility_id.to_string(),
            raw_fragment: fragment.to_string(),
            passthrough,
        });
    }

    Ok((records, validation))
}
