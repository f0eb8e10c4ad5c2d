//! Diagnostic sinks.
//!
//! The resolver only talks to `&dyn DiagnosticSink`. `emit()` must never
//! fail or block for long: resolution does not wait on observability.

use std::sync::Mutex;

use tracing::{info, warn};

use super::types::{Diagnostic, Severity};

/// Receiver of structured diagnostics.
///
/// Implementations must be Send + Sync; rows may be resolved in parallel.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at their severity
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        let kind = diagnostic.event_type_str();
        match diagnostic.severity() {
            Severity::Info => info!(kind, ?diagnostic, "{}", describe(&diagnostic)),
            Severity::Warning => warn!(kind, ?diagnostic, "{}", describe(&diagnostic)),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

/// Buffers diagnostics in memory.
///
/// With parallel resolution the order of row-level events follows completion
/// order, not input order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything collected so far
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Drain the buffer
    pub fn take(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Number of collected events of one type
    pub fn count(&self, event_type: &str) -> usize {
        self.snapshot()
            .iter()
            .filter(|d| d.event_type_str() == event_type)
            .count()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match self.events.lock() {
            Ok(mut events) => events.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

/// One-line human description for log output
fn describe(diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::UnmappedMasterRow { row, raw_name } => {
            format!("Unmapped master entry at row {row}: {raw_name:?}")
        }
        Diagnostic::UnrecognizedMasterType { raw_name, .. } => {
            format!("Unrecognized city type in master: {raw_name}")
        }
        Diagnostic::MissingRegionCode { raw_name, .. } => {
            format!("Master entry without region code skipped: {raw_name}")
        }
        Diagnostic::DuplicateMasterKey {
            admin_type, key, ..
        } => format!("Duplicate {admin_type} key '{key}' in master, later row wins"),
        Diagnostic::IndexBuilt {
            cities, regencies, ..
        } => format!("Master lookup created: {regencies} regency, {cities} city"),
        Diagnostic::InputRowsExcluded { excluded_rows, .. } => {
            format!("Dropped {excluded_rows} rows with null required fields")
        }
        Diagnostic::CleanedMatch {
            candidate, matched, ..
        } => format!("Auto-mapped (space-insensitive) '{candidate}' -> '{matched}'"),
        Diagnostic::SubstringMatch {
            candidate, matched, ..
        } => format!("Auto-mapped (substring) '{candidate}' -> '{matched}'"),
        Diagnostic::FuzzyMatch {
            candidate,
            matched,
            similarity,
            ..
        } => format!("Fuzzy-mapped '{candidate}' -> '{matched}' (similarity {similarity:.2})"),
        Diagnostic::FuzzyTie {
            candidate,
            similarity,
            count,
            ..
        } => format!("Fuzzy tie for '{candidate}': {count} keys at {similarity:.2}"),
        Diagnostic::CrossTypeMatch {
            facility_id,
            raw_fragment,
            parsed_type,
            matched_type,
            matched,
        } => format!(
            "Cross-type match for {facility_id}: '{raw_fragment}' ({parsed_type}) -> matched as {matched_type} '{matched}'"
        ),
        Diagnostic::AmbiguousMatch {
            candidate,
            count,
            example,
            ..
        } => format!("Ambiguous '{candidate}': {count} matches found (e.g. {example})"),
        Diagnostic::NoMatch {
            facility_id,
            candidate,
        } => format!("No match found for {facility_id}: '{candidate}'"),
    }
}
