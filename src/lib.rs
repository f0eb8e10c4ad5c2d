//! Site Resolver - address fragments to administrative regions
//!
//! Resolves free-text address fragments from asset records to entries of an
//! authoritative region master list, and gives every resolved asset a
//! collision-free internal site ID.
//!
//! ## Architecture
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ master Table │   │ input Table  │      (csv_io, or any loader)
//! └──────┬───────┘   └──────┬───────┘
//!        ▼                  ▼
//!  MasterIndex::build   input_records      structural checks, fatal
//!        │                  │
//!        └───────┬──────────┘
//!                ▼
//!     Resolver (exact → cleaned → substring → fuzzy → cross-type)
//!                │
//!        ┌───────┴────────┐
//!        ▼                ▼
//!   assign_site_ids   UnresolvedRecord      row failures, never fatal
//!        │
//!        ▼
//!   RunSummary + Diagnostic events ──► DiagnosticSink
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use site_resolver::{pipeline, NullSink, ResolverConfig, Table};
//!
//! let master = Table::from_rows(
//!     "master",
//!     &["City", "CityCode", "RegionalCode", "Province", "Region"],
//!     &[vec!["Kabupaten Aceh Barat", "11", "1", "Aceh", "Sumatra"]],
//! );
//! let input = Table::from_rows("assets", &["Funcloc", "Alamat4"], &[vec!["F-1", "ACEH BARAT"]]);
//!
//! let outcome = pipeline::run(&master, &input, &ResolverConfig::default(), &NullSink).unwrap();
//! assert_eq!(outcome.resolved[0].internal_site_id(), "11-01-001");
//! ```

// Core error handling
pub mod error;

// Configuration and tabular input
pub mod config;
pub mod table;

// Normalization, master index and matching stages
pub mod region_linking;

// Internal site ID assignment
pub mod site_id;

// Structured diagnostics
pub mod events;

// Orchestration and reporting
pub mod pipeline;
pub mod summary;

// CSV file boundary
pub mod csv_io;

pub use config::{FuzzyTieBreak, InputColumns, MasterColumns, MatchingConfig, ResolverConfig};
pub use error::{EngineError, Result};
pub use events::{CollectingSink, Diagnostic, DiagnosticSink, NullSink, Severity, TracingSink};
pub use pipeline::{run, RunOutcome};
pub use region_linking::{
    AdministrativeType, FailureReason, MasterIndex, MasterRegion, MatchStrategy, ResolvedRecord,
    Resolver, UnresolvedRecord,
};
pub use site_id::{assign_site_ids, IdentifiedRecord, SiteId};
pub use summary::RunSummary;
pub use table::{InputRecord, InputValidation, MasterRow, Table};
