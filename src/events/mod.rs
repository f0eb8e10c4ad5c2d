//! Structured diagnostics
//!
//! The resolver reports data-quality findings (unmapped master rows, fuzzy
//! and cross-type matches, ambiguities) as `Diagnostic` values pushed into a
//! `DiagnosticSink`. The caller decides where they go.

pub mod sink;
pub mod types;

pub use sink::{CollectingSink, DiagnosticSink, NullSink, TracingSink};
pub use types::{Diagnostic, Severity};
