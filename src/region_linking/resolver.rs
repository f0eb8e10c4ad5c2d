//! Resolution of raw address fragments against the master index
//!
//! Each input row runs through an ordered list of stages and stops at the
//! first one that decides:
//!
//! 1. exact lookup of the normalized candidate
//! 2. cleaned-exact: equal after dropping everything but `A-Z0-9`
//! 3. substring: cleaned candidate inside a cleaned key, or the reverse
//! 4. fuzzy: best similarity at or above the threshold
//! 5. cross-type: exact lookup in the other administrative type's index
//!
//! Stages 1-4 search the index of the parsed type. Multiple hits at stage 2
//! or 3 fail the row as ambiguous instead of picking one.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::index::{MasterIndex, MasterRegion};
use super::normalize::{
    clean_for_compare, parse_address_fragment, AdministrativeType, ParsedFragment,
};
use crate::config::{FuzzyTieBreak, MatchingConfig};
use crate::events::{Diagnostic, DiagnosticSink};
use crate::table::InputRecord;

/// Which stage produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ExactNormalized,
    CleanedExact,
    Substring,
    Fuzzy,
    CrossTypeFallback,
}

impl MatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactNormalized => "exact_normalized",
            Self::CleanedExact => "cleaned_exact",
            Self::Substring => "substring",
            Self::Fuzzy => "fuzzy",
            Self::CrossTypeFallback => "cross_type_fallback",
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Why a row could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Address fragment blank, or nothing left after the city marker
    EmptyInput,
    /// More than one master row matched
    Ambiguous { count: usize, example: String },
    /// No stage matched in either index
    NoMatch,
}

impl FailureReason {
    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::Ambiguous { .. } => "ambiguous",
            Self::NoMatch => "no_match",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => f.write_str("Empty or invalid address fragment"),
            Self::Ambiguous { count, example } => {
                write!(f, "Ambiguous: {count} matches found (e.g. {example})")
            }
            Self::NoMatch => f.write_str("No match found in master data"),
        }
    }
}

/// A row matched to a master region, not yet numbered
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub row_index: usize,
    pub facility_id: String,
    pub raw_fragment: String,
    /// Normalized candidate name parsed from the fragment
    pub candidate_name: String,
    pub parsed_type: AdministrativeType,
    /// Type of the matched region; differs from `parsed_type` on cross-type fallback
    pub matched_type: AdministrativeType,
    pub region: Arc<MasterRegion>,
    pub strategy: MatchStrategy,
    /// Score of a fuzzy match
    pub similarity: Option<f64>,
    pub passthrough: IndexMap<String, String>,
}

/// A row that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRecord {
    pub row_index: usize,
    pub facility_id: String,
    pub raw_fragment: String,
    /// Present when the fragment parsed to a name
    pub candidate_name: Option<String>,
    pub parsed_type: Option<AdministrativeType>,
    pub reason: FailureReason,
    pub passthrough: IndexMap<String, String>,
}

/// Outcome for a single row
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedRecord),
    Unresolved(UnresolvedRecord),
}

/// Rows split by outcome, each side in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionBatch {
    pub resolved: Vec<ResolvedRecord>,
    pub unresolved: Vec<UnresolvedRecord>,
}

/// What every stage gets to look at
struct StageInput<'a> {
    facility_id: &'a str,
    candidate: &'a str,
    cleaned: &'a str,
    parsed_type: AdministrativeType,
    index: &'a MasterIndex,
}

enum StageOutcome<'a> {
    Matched {
        region: &'a Arc<MasterRegion>,
        matched_type: AdministrativeType,
        similarity: Option<f64>,
    },
    Continue,
    Failed(FailureReason),
}

type Stage =
    for<'a> fn(&StageInput<'a>, &MatchingConfig, &dyn DiagnosticSink) -> StageOutcome<'a>;

/// Resolution stages in the order they are tried
const STAGES: [(MatchStrategy, Stage); 5] = [
    (MatchStrategy::ExactNormalized, exact_stage as Stage),
    (MatchStrategy::CleanedExact, cleaned_exact_stage as Stage),
    (MatchStrategy::Substring, substring_stage as Stage),
    (MatchStrategy::Fuzzy, fuzzy_stage as Stage),
    (MatchStrategy::CrossTypeFallback, cross_type_stage as Stage),
];

fn matched(region: &Arc<MasterRegion>, similarity: Option<f64>) -> StageOutcome<'_> {
    StageOutcome::Matched {
        region,
        matched_type: region.admin_type,
        similarity,
    }
}

fn exact_stage<'a>(
    input: &StageInput<'a>,
    _config: &MatchingConfig,
    _sink: &dyn DiagnosticSink,
) -> StageOutcome<'a> {
    match input.index.get(input.parsed_type, input.candidate) {
        Some(region) => matched(region, None),
        None => StageOutcome::Continue,
    }
}

/// Collect hits from the target index, skipping keys that clean to nothing
fn cleaned_hits<'a>(
    input: &StageInput<'a>,
    accept: impl Fn(&str, &str) -> bool,
) -> Vec<&'a Arc<MasterRegion>> {
    if input.cleaned.is_empty() {
        return Vec::new();
    }
    input
        .index
        .map(input.parsed_type)
        .values()
        .filter(|region| !region.cleaned_name.is_empty())
        .filter(|region| accept(input.cleaned, region.cleaned_name.as_str()))
        .collect()
}

fn single_or_ambiguous(hits: Vec<&Arc<MasterRegion>>) -> StageOutcome<'_> {
    match hits.as_slice() {
        [] => StageOutcome::Continue,
        [only] => matched(*only, None),
        [first, ..] => StageOutcome::Failed(FailureReason::Ambiguous {
            count: hits.len(),
            example: first.raw_name.clone(),
        }),
    }
}

fn cleaned_exact_stage<'a>(
    input: &StageInput<'a>,
    _config: &MatchingConfig,
    _sink: &dyn DiagnosticSink,
) -> StageOutcome<'a> {
    single_or_ambiguous(cleaned_hits(input, |candidate, key| candidate == key))
}

/// Only reached when the cleaned-exact stage found nothing
fn substring_stage<'a>(
    input: &StageInput<'a>,
    _config: &MatchingConfig,
    _sink: &dyn DiagnosticSink,
) -> StageOutcome<'a> {
    single_or_ambiguous(cleaned_hits(input, |candidate, key| {
        key.contains(candidate) || candidate.contains(key)
    }))
}

fn fuzzy_stage<'a>(
    input: &StageInput<'a>,
    config: &MatchingConfig,
    sink: &dyn DiagnosticSink,
) -> StageOutcome<'a> {
    let mut best: Option<(&'a Arc<MasterRegion>, f64)> = None;
    let mut tied = 0usize;

    for (key, region) in input.index.map(input.parsed_type) {
        let score = config.metric.score(key, input.candidate);
        if score < config.fuzzy_threshold {
            continue;
        }
        match best {
            Some((_, best_score)) if score < best_score => {}
            Some((_, best_score)) if score == best_score => tied += 1,
            _ => {
                best = Some((region, score));
                tied = 1;
            }
        }
    }

    let Some((region, score)) = best else {
        return StageOutcome::Continue;
    };

    if tied > 1 && config.fuzzy_tie_break == FuzzyTieBreak::Reject {
        sink.emit(Diagnostic::FuzzyTie {
            facility_id: input.facility_id.to_string(),
            candidate: input.candidate.to_string(),
            similarity: score,
            count: tied,
        });
        return StageOutcome::Continue;
    }

    matched(region, Some(score))
}

fn cross_type_stage<'a>(
    input: &StageInput<'a>,
    config: &MatchingConfig,
    _sink: &dyn DiagnosticSink,
) -> StageOutcome<'a> {
    if !config.cross_type_fallback {
        return StageOutcome::Continue;
    }
    match input.index.get(input.parsed_type.other(), input.candidate) {
        Some(region) => matched(region, None),
        None => StageOutcome::Continue,
    }
}

/// Resolves input rows against a built `MasterIndex`.
///
/// Holds only shared references, so one resolver can serve many threads.
pub struct Resolver<'a> {
    index: &'a MasterIndex,
    config: &'a MatchingConfig,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> Resolver<'a> {
    pub fn new(
        index: &'a MasterIndex,
        config: &'a MatchingConfig,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            index,
            config,
            sink,
        }
    }

    /// Resolve one row
    pub fn resolve(&self, record: &InputRecord) -> Resolution {
        let parsed = parse_address_fragment(Some(record.raw_fragment.as_str()));
        let (candidate, parsed_type) = match parsed {
            ParsedFragment::Candidate { name, admin_type } => (name, admin_type),
            ParsedFragment::Empty | ParsedFragment::Invalid => {
                return Resolution::Unresolved(unresolved(
                    record,
                    None,
                    None,
                    FailureReason::EmptyInput,
                ));
            }
        };

        let cleaned = clean_for_compare(&candidate);
        let input = StageInput {
            facility_id: &record.facility_id,
            candidate: &candidate,
            cleaned: &cleaned,
            parsed_type,
            index: self.index,
        };

        for (strategy, stage) in STAGES {
            match stage(&input, self.config, self.sink) {
                StageOutcome::Continue => continue,
                StageOutcome::Failed(reason) => {
                    if let FailureReason::Ambiguous { count, example } = &reason {
                        self.sink.emit(Diagnostic::AmbiguousMatch {
                            facility_id: record.facility_id.clone(),
                            candidate: candidate.clone(),
                            count: *count,
                            example: example.clone(),
                        });
                    }
                    return Resolution::Unresolved(unresolved(
                        record,
                        Some(candidate.clone()),
                        Some(parsed_type),
                        reason,
                    ));
                }
                StageOutcome::Matched {
                    region,
                    matched_type,
                    similarity,
                } => {
                    self.report_match(
                        record,
                        &candidate,
                        parsed_type,
                        region,
                        strategy,
                        similarity,
                    );
                    debug!(
                        facility_id = %record.facility_id,
                        %strategy,
                        matched = %region.raw_name,
                        "Resolved"
                    );
                    return Resolution::Resolved(ResolvedRecord {
                        row_index: record.row_index,
                        facility_id: record.facility_id.clone(),
                        raw_fragment: record.raw_fragment.clone(),
                        candidate_name: candidate.clone(),
                        parsed_type,
                        matched_type,
                        region: Arc::clone(region),
                        strategy,
                        similarity,
                        passthrough: record.passthrough.clone(),
                    });
                }
            }
        }

        self.sink.emit(Diagnostic::NoMatch {
            facility_id: record.facility_id.clone(),
            candidate: candidate.clone(),
        });
        Resolution::Unresolved(unresolved(
            record,
            Some(candidate),
            Some(parsed_type),
            FailureReason::NoMatch,
        ))
    }

    /// Resolve every row, optionally on the rayon pool.
    ///
    /// Both sides of the batch keep input order either way.
    pub fn resolve_all(&self, records: &[InputRecord], parallel: bool) -> ResolutionBatch {
        let outcomes: Vec<Resolution> = if parallel {
            records.par_iter().map(|r| self.resolve(r)).collect()
        } else {
            records.iter().map(|r| self.resolve(r)).collect()
        };

        let mut batch = ResolutionBatch::default();
        for outcome in outcomes {
            match outcome {
                Resolution::Resolved(record) => batch.resolved.push(record),
                Resolution::Unresolved(record) => batch.unresolved.push(record),
            }
        }
        batch
    }

    fn report_match(
        &self,
        record: &InputRecord,
        candidate: &str,
        parsed_type: AdministrativeType,
        region: &MasterRegion,
        strategy: MatchStrategy,
        similarity: Option<f64>,
    ) {
        let facility_id = record.facility_id.clone();
        let candidate = candidate.to_string();
        let matched = region.raw_name.clone();

        let diagnostic = match strategy {
            MatchStrategy::ExactNormalized => return,
            MatchStrategy::CleanedExact => Diagnostic::CleanedMatch {
                facility_id,
                candidate,
                matched,
            },
            MatchStrategy::Substring => Diagnostic::SubstringMatch {
                facility_id,
                candidate,
                matched,
            },
            MatchStrategy::Fuzzy => Diagnostic::FuzzyMatch {
                facility_id,
                candidate,
                matched,
                similarity: similarity.unwrap_or_default(),
            },
            MatchStrategy::CrossTypeFallback => Diagnostic::CrossTypeMatch {
                facility_id,
                raw_fragment: record.raw_fragment.clone(),
                parsed_type,
                matched_type: region.admin_type,
                matched,
            },
        };
        self.sink.emit(diagnostic);
    }
}

fn unresolved(
    record: &InputRecord,
    candidate_name: Option<String>,
    parsed_type: Option<AdministrativeType>,
    reason: FailureReason,
) -> UnresolvedRecord {
    UnresolvedRecord {
        row_index: record.row_index,
        facility_id: record.facility_id.clone(),
        raw_fragment: record.raw_fragment.clone(),
        candidate_name,
        parsed_type,
        reason,
        passthrough: record.passthrough.clone(),
    }
}
