//! Internal site ID assignment
//!
//! Runs once over the complete set of resolved records: sort by
//! `(region code, facility id)`, number each region group from 1, and format
//! `{region_code}-{regional_code:02}-{sequence:03}`. Because numbering is
//! global it cannot start before every row has been resolved.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::region_linking::resolver::ResolvedRecord;

/// Structured internal site identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SiteId {
    pub region_code: String,
    /// Two-digit regional code, "00" when unknown
    pub regional_code: String,
    /// 1-based position within the region group
    pub sequence: usize,
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{:03}",
            self.region_code, self.regional_code, self.sequence
        )
    }
}

/// A resolved record with its final identifier
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifiedRecord {
    pub record: ResolvedRecord,
    pub site_id: SiteId,
}

impl IdentifiedRecord {
    pub fn sequence_number(&self) -> usize {
        self.site_id.sequence
    }

    pub fn internal_site_id(&self) -> String {
        self.site_id.to_string()
    }
}

/// Parse a cell as a finite number
fn numeric_value(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Canonical text for a region code.
///
/// Integer text is kept as given (leading zeros included); an integral float
/// rendering such as "11.0" becomes "11"; anything else is only trimmed.
pub fn canonical_code(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.parse::<i64>().is_ok() {
        return trimmed.to_string();
    }
    match numeric_value(trimmed) {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        _ => trimmed.to_string(),
    }
}

/// Regional code as two digits, "00" when absent or not a number
pub fn format_regional_code(raw: Option<&str>) -> String {
    raw.and_then(numeric_value)
        .map(|v| format!("{:02}", v.trunc() as i64))
        .unwrap_or_else(|| "00".to_string())
}

/// Ordering for code-like strings.
///
/// Numbers sort numerically and before non-numeric text; ties and text fall
/// back to plain string order so the ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (numeric_value(a), numeric_value(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sort resolved records and give each one its site ID.
///
/// The returned order is the output row order. Records with identical sort
/// keys keep their incoming order.
pub fn assign_site_ids(mut records: Vec<ResolvedRecord>) -> Vec<IdentifiedRecord> {
    records.sort_by(|a, b| {
        natural_cmp(&a.region.region_code, &b.region.region_code)
            .then_with(|| natural_cmp(&a.facility_id, &b.facility_id))
    });

    let mut identified = Vec::with_capacity(records.len());
    let mut sequence = 0;
    let mut current_region: Option<String> = None;

    for record in records {
        if current_region.as_deref() == Some(record.region.region_code.as_str()) {
            sequence += 1;
        } else {
            current_region = Some(record.region.region_code.clone());
            sequence = 1;
        }

        let site_id = SiteId {
            region_code: record.region.region_code.clone(),
            regional_code: format_regional_code(record.region.regional_code.as_deref()),
            sequence,
        };
        identified.push(IdentifiedRecord { record, site_id });
    }

    identified
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use indexmap::IndexMap;

    use super::*;
    use crate::region_linking::index::MasterRegion;
    use crate::region_linking::normalize::AdministrativeType;
    use crate::region_linking::resolver::MatchStrategy;

    fn region(code: &str, regional: Option<&str>) -> Arc<MasterRegion> {
        Arc::new(MasterRegion {
            row_index: 0,
            raw_name: format!("Kota {code}"),
            normalized_name: code.to_string(),
            cleaned_name: code.to_string(),
            admin_type: AdministrativeType::City,
            region_code: code.to_string(),
            regional_code: regional.map(str::to_string),
            province: None,
            region: None,
        })
    }

    fn resolved(facility_id: &str, region: &Arc<MasterRegion>) -> ResolvedRecord {
        ResolvedRecord {
            row_index: 0,
            facility_id: facility_id.to_string(),
            raw_fragment: String::new(),
            candidate_name: String::new(),
            parsed_type: AdministrativeType::City,
            matched_type: AdministrativeType::City,
            region: Arc::clone(region),
            strategy: MatchStrategy::ExactNormalized,
            similarity: None,
            passthrough: IndexMap::new(),
        }
    }

    #[test]
    fn test_site_id_format() {
        let id = SiteId {
            region_code: "11".to_string(),
            regional_code: "01".to_string(),
            sequence: 1,
        };
        assert_eq!(id.to_string(), "11-01-001");

        let wide = SiteId {
            sequence: 1234,
            ..id
        };
        assert_eq!(wide.to_string(), "11-01-1234");
    }

    #[test]
    fn test_regional_code_formatting() {
        assert_eq!(format_regional_code(Some("1")), "01");
        assert_eq!(format_regional_code(Some("1.0")), "01");
        assert_eq!(format_regional_code(Some(" 12 ")), "12");
        assert_eq!(format_regional_code(Some("7.9")), "07");
        assert_eq!(format_regional_code(Some("123")), "123");
        assert_eq!(format_regional_code(Some("N/A")), "00");
        assert_eq!(format_regional_code(Some("nan")), "00");
        assert_eq!(format_regional_code(None), "00");
    }

    #[test]
    fn test_canonical_code() {
        assert_eq!(canonical_code("11"), "11");
        assert_eq!(canonical_code(" 011 "), "011");
        assert_eq!(canonical_code("11.0"), "11");
        assert_eq!(canonical_code("11.5"), "11.5");
        assert_eq!(canonical_code("JKT"), "JKT");
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("9", "10"), Ordering::Less);
        assert_eq!(natural_cmp("10", "9"), Ordering::Greater);
        assert_eq!(natural_cmp("10", "A"), Ordering::Less);
        assert_eq!(natural_cmp("F-10", "F-9"), Ordering::Less);
        assert_eq!(natural_cmp("011", "11"), Ordering::Less);
        assert_eq!(natural_cmp("11", "11"), Ordering::Equal);
    }

    #[test]
    fn test_sequences_restart_per_region() {
        let bandung = region("32", Some("2"));
        let aceh = region("11", Some("1"));
        let records = vec![
            resolved("300", &bandung),
            resolved("200", &aceh),
            resolved("100", &bandung),
            resolved("20", &aceh),
        ];

        let ids: Vec<String> = assign_site_ids(records)
            .iter()
            .map(|r| format!("{} {}", r.record.facility_id, r.internal_site_id()))
            .collect();

        assert_eq!(
            ids,
            vec![
                "20 11-01-001",
                "200 11-01-002",
                "100 32-02-001",
                "300 32-02-002",
            ]
        );
    }

    #[test]
    fn test_numeric_region_codes_sort_numerically() {
        let nine = region("9", None);
        let ten = region("10", None);
        let records = vec![resolved("A", &ten), resolved("B", &nine)];

        let identified = assign_site_ids(records);
        assert_eq!(identified[0].internal_site_id(), "9-00-001");
        assert_eq!(identified[1].internal_site_id(), "10-00-001");
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let aceh = region("11", Some("1"));
        let mut first = resolved("F-1", &aceh);
        first.row_index = 7;
        let mut second = resolved("F-1", &aceh);
        second.row_index = 3;

        let identified = assign_site_ids(vec![first, second]);
        assert_eq!(identified[0].record.row_index, 7);
        assert_eq!(identified[0].sequence_number(), 1);
        assert_eq!(identified[1].record.row_index, 3);
        assert_eq!(identified[1].sequence_number(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(assign_site_ids(Vec::new()).is_empty());
    }
}
