//! End-to-end resolution run
//!
//! ```text
//! master Table ──► master_rows ──► MasterIndex::build ─┐
//!                                                      ▼
//! input Table ───► input_records ─────────────► Resolver::resolve_all
//!                                                      │
//!                          resolved ◄──────────────────┴──► unresolved
//!                              │
//!                              ▼
//!                       assign_site_ids ──► RunSummary
//! ```
//!
//! Everything that can fail structurally (configuration, columns, table
//! shape) is checked before the first row is resolved.

use tracing::info;

use crate::config::ResolverConfig;
use crate::error::Result;
use crate::events::{Diagnostic, DiagnosticSink};
use crate::region_linking::index::MasterIndex;
use crate::region_linking::resolver::{Resolver, UnresolvedRecord};
use crate::site_id::{assign_site_ids, IdentifiedRecord};
use crate::summary::RunSummary;
use crate::table::{input_records, master_rows, InputValidation, Table};

/// Everything a run produces
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Sorted by (region code, facility id), the output row order
    pub resolved: Vec<IdentifiedRecord>,
    /// In input order
    pub unresolved: Vec<UnresolvedRecord>,
    pub validation: InputValidation,
    pub summary: RunSummary,
}

/// Resolve every input row against the master table and number the matches.
///
/// Fails only on structural problems; individual rows never produce an `Err`.
pub fn run(
    master: &Table,
    input: &Table,
    config: &ResolverConfig,
    sink: &dyn DiagnosticSink,
) -> Result<RunOutcome> {
    config.validate()?;
    let master_rows = master_rows(master, &config.master_columns)?;
    let (records, validation) = input_records(input, &config.input_columns)?;

    info!(
        master_rows = master_rows.len(),
        input_rows = validation.total_rows,
        excluded = validation.excluded_rows,
        "Tables validated"
    );
    if validation.excluded_rows > 0 {
        sink.emit(Diagnostic::InputRowsExcluded {
            missing_facility_id: validation.missing_facility_id,
            missing_address_fragment: validation.missing_address_fragment,
            excluded_rows: validation.excluded_rows,
        });
    }

    let index = MasterIndex::build(&master_rows, sink);

    let resolver = Resolver::new(&index, &config.matching, sink);
    let batch = resolver.resolve_all(&records, config.parallel);
    info!(
        resolved = batch.resolved.len(),
        unresolved = batch.unresolved.len(),
        parallel = config.parallel,
        "Resolution complete"
    );

    let resolved = assign_site_ids(batch.resolved);
    let summary = RunSummary::new(
        &validation,
        index.stats(),
        &resolved,
        &batch.unresolved,
        config.top_unmapped_patterns,
    );

    Ok(RunOutcome {
        resolved,
        unresolved: batch.unresolved,
        validation,
        summary,
    })
}
