//! Run accounting
//!
//! `RunSummary` is the complete tally of one pipeline run: how many rows came
//! in, how many were excluded before resolution, how each valid row ended up,
//! and what the master index looked like. `Display` renders the plain-text
//! report the CLI writes next to its CSV outputs.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::region_linking::index::IndexStats;
use crate::region_linking::resolver::{MatchStrategy, UnresolvedRecord};
use crate::site_id::IdentifiedRecord;
use crate::table::InputValidation;

/// An unresolved candidate name and how many rows carried it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedPattern {
    pub candidate: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub excluded_rows: usize,
    pub valid_rows: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub by_strategy: BTreeMap<MatchStrategy, usize>,
    /// Keyed by `FailureReason::code()`
    pub by_failure: BTreeMap<String, usize>,
    pub master: IndexStats,
    pub top_unmapped: Vec<UnmappedPattern>,
}

impl RunSummary {
    pub fn new(
        validation: &InputValidation,
        master: IndexStats,
        resolved: &[IdentifiedRecord],
        unresolved: &[UnresolvedRecord],
        top_n: usize,
    ) -> Self {
        let mut by_strategy = BTreeMap::new();
        for record in resolved {
            *by_strategy.entry(record.record.strategy).or_insert(0) += 1;
        }

        let mut by_failure = BTreeMap::new();
        for record in unresolved {
            *by_failure.entry(record.reason.code().to_string()).or_insert(0) += 1;
        }

        Self {
            total_rows: validation.total_rows,
            excluded_rows: validation.excluded_rows,
            valid_rows: validation.valid_rows(),
            resolved: resolved.len(),
            unresolved: unresolved.len(),
            by_strategy,
            by_failure,
            master,
            top_unmapped: top_unmapped_patterns(unresolved, top_n),
        }
    }

    /// Share of valid rows that resolved, in percent
    pub fn success_rate(&self) -> f64 {
        if self.valid_rows == 0 {
            return 0.0;
        }
        self.resolved as f64 / self.valid_rows as f64 * 100.0
    }
}

/// Most frequent unresolved candidate names, count descending then name ascending.
///
/// Rows that failed before a candidate could be parsed are not counted.
pub fn top_unmapped_patterns(
    unresolved: &[UnresolvedRecord],
    top_n: usize,
) -> Vec<UnmappedPattern> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in unresolved {
        if let Some(candidate) = record.candidate_name.as_deref() {
            *counts.entry(candidate).or_insert(0) += 1;
        }
    }

    let mut patterns: Vec<UnmappedPattern> = counts
        .into_iter()
        .map(|(candidate, count)| UnmappedPattern {
            candidate: candidate.to_string(),
            count,
        })
        .collect();
    patterns.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.candidate.cmp(&b.candidate))
    });
    patterns.truncate(top_n);
    patterns
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SITE RESOLUTION SUMMARY")?;
        writeln!(f, "=======================")?;
        writeln!(f, "Total input rows:      {}", self.total_rows)?;
        writeln!(f, "Excluded (null data):  {}", self.excluded_rows)?;
        writeln!(f, "Valid rows:            {}", self.valid_rows)?;
        writeln!(f, "Resolved:              {}", self.resolved)?;
        writeln!(f, "Unresolved:            {}", self.unresolved)?;
        writeln!(f, "Success rate:          {:.2}%", self.success_rate())?;

        if !self.by_strategy.is_empty() {
            writeln!(f)?;
            writeln!(f, "Matches by strategy:")?;
            for (strategy, count) in &self.by_strategy {
                writeln!(f, "  {strategy:<22} {count}")?;
            }
        }

        if !self.by_failure.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures by kind:")?;
            for (kind, count) in &self.by_failure {
                writeln!(f, "  {kind:<22} {count}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Master data:")?;
        writeln!(f, "  city entries          {}", self.master.cities)?;
        writeln!(f, "  regency entries       {}", self.master.regencies)?;
        writeln!(f, "  unmapped              {}", self.master.unmapped)?;
        writeln!(f, "  unrecognized type     {}", self.master.unrecognized)?;
        writeln!(f, "  missing region code   {}", self.master.missing_code)?;
        writeln!(f, "  overwritten keys      {}", self.master.overwritten_keys)?;

        if !self.top_unmapped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Top unmapped patterns:")?;
            for pattern in &self.top_unmapped {
                writeln!(f, "  {:<30} {}", pattern.candidate, pattern.count)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::region_linking::normalize::AdministrativeType;
    use crate::region_linking::resolver::FailureReason;

    fn failed(candidate: Option<&str>, reason: FailureReason) -> UnresolvedRecord {
        UnresolvedRecord {
            row_index: 0,
            facility_id: "F-1".to_string(),
            raw_fragment: candidate.unwrap_or_default().to_string(),
            candidate_name: candidate.map(str::to_string),
            parsed_type: candidate.map(|_| AdministrativeType::Regency),
            reason,
            passthrough: IndexMap::new(),
        }
    }

    #[test]
    fn test_top_unmapped_order() {
        let unresolved = vec![
            failed(Some("SIAK HULU"), FailureReason::NoMatch),
            failed(Some("ATLANTIS"), FailureReason::NoMatch),
            failed(Some("SIAK HULU"), FailureReason::NoMatch),
            failed(None, FailureReason::EmptyInput),
            failed(None, FailureReason::EmptyInput),
            failed(Some("BOGOR"), FailureReason::NoMatch),
        ];

        let top = top_unmapped_patterns(&unresolved, 2);
        assert_eq!(
            top,
            vec![
                UnmappedPattern {
                    candidate: "SIAK HULU".to_string(),
                    count: 2
                },
                UnmappedPattern {
                    candidate: "ATLANTIS".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_success_rate_without_valid_rows() {
        let validation = InputValidation {
            total_rows: 3,
            missing_facility_id: 3,
            missing_address_fragment: 0,
            excluded_rows: 3,
        };
        let summary = RunSummary::new(&validation, IndexStats::default(), &[], &[], 10);
        assert_eq!(summary.valid_rows, 0);
        assert_eq!(summary.success_rate(), 0.0);
        assert!(summary.to_string().contains("Success rate:          0.00%"));
    }

    #[test]
    fn test_failure_counts_by_kind() {
        let validation = InputValidation {
            total_rows: 4,
            ..InputValidation::default()
        };
        let unresolved = vec![
            failed(Some("ATLANTIS"), FailureReason::NoMatch),
            failed(None, FailureReason::EmptyInput),
            failed(
                Some("PALUTA"),
                FailureReason::Ambiguous {
                    count: 2,
                    example: "Kabupaten Palu Ta".to_string(),
                },
            ),
            failed(Some("LEMURIA"), FailureReason::NoMatch),
        ];
        let summary = RunSummary::new(&validation, IndexStats::default(), &[], &unresolved, 10);

        assert_eq!(summary.by_failure.get("no_match"), Some(&2));
        assert_eq!(summary.by_failure.get("empty_input"), Some(&1));
        assert_eq!(summary.by_failure.get("ambiguous"), Some(&1));
        assert_eq!(summary.unresolved, 4);

        let report = summary.to_string();
        assert!(report.contains("Failures by kind:"));
        assert!(report.contains("Top unmapped patterns:"));
        assert!(!report.contains("Matches by strategy:"));
    }
}
