//! Region linking: raw address fragments to master regions
//!
//! - `normalize`: master-name and address-fragment normalization
//! - `similarity`: scoring for the fuzzy stage
//! - `index`: per-type lookups built once from the master table
//! - `resolver`: the ordered matching stages

pub mod index;
pub mod normalize;
pub mod resolver;
pub mod similarity;

pub use index::{IndexStats, MasterIndex, MasterRegion};
pub use normalize::{
    clean_for_compare, normalize_master_name, parse_address_fragment, AdministrativeType,
    ParsedFragment,
};
pub use resolver::{
    FailureReason, MatchStrategy, Resolution, ResolutionBatch, ResolvedRecord, Resolver,
    UnresolvedRecord,
};
pub use similarity::{sequence_ratio, SimilarityMetric};
