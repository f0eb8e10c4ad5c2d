//! End-to-end resolution scenarios through `pipeline::run`

use site_resolver::{
    pipeline, AdministrativeType, CollectingSink, Diagnostic, EngineError, FailureReason,
    MatchStrategy, NullSink, ResolverConfig, RunOutcome, Table,
};

const MASTER_HEADERS: [&str; 5] = ["City", "CityCode", "RegionalCode", "Province", "Region"];

fn master_table(rows: &[[&str; 5]]) -> Table {
    let rows: Vec<Vec<&str>> = rows.iter().map(|r| r.to_vec()).collect();
    Table::from_rows("master", &MASTER_HEADERS, &rows)
}

fn standard_master() -> Table {
    master_table(&[
        ["Kabupaten Aceh Barat", "11", "1", "Aceh", "Sumatra"],
        ["Kota Bandung", "22", "2", "Jawa Barat", "Jawa"],
        ["Kabupaten Labuhanbatu", "12", "1", "Sumatera Utara", "Sumatra"],
        ["Kabupaten Kutai Kartanegara", "64", "3", "Kalimantan Timur", "Kalimantan"],
        ["Kabupaten Kartanegara", "65", "3", "Kalimantan Timur", "Kalimantan"],
        ["Kota Adm. Jakarta Selatan", "31", "1", "DKI Jakarta", "Jawa"],
    ])
}

fn assets(rows: &[(&str, &str)]) -> Table {
    let rows: Vec<Vec<&str>> = rows.iter().map(|(id, frag)| vec![*id, *frag]).collect();
    Table::from_rows("assets", &["Funcloc", "Alamat4"], &rows)
}

fn run(master: &Table, input: &Table) -> RunOutcome {
    pipeline::run(master, input, &ResolverConfig::default(), &NullSink).unwrap()
}

#[test]
fn test_exact_regency_gets_first_sequence() {
    let master = master_table(&[["Kabupaten Aceh Barat", "11", "1", "Aceh", "Sumatra"]]);
    let outcome = run(&master, &assets(&[("F-001", "ACEH BARAT")]));

    assert_eq!(outcome.resolved.len(), 1);
    let identified = &outcome.resolved[0];
    assert_eq!(identified.record.strategy, MatchStrategy::ExactNormalized);
    assert_eq!(identified.record.matched_type, AdministrativeType::Regency);
    assert_eq!(identified.internal_site_id(), "11-01-001");
    assert_eq!(identified.sequence_number(), 1);
}

#[test]
fn test_city_marker_selects_city_index() {
    let master = master_table(&[["Kota Bandung", "22", "2", "Jawa Barat", "Jawa"]]);
    let outcome = run(&master, &assets(&[("F-100", "BANDUNG, KOTA")]));

    let record = &outcome.resolved[0].record;
    assert_eq!(record.parsed_type, AdministrativeType::City);
    assert_eq!(record.candidate_name, "BANDUNG");
    assert_eq!(record.strategy, MatchStrategy::ExactNormalized);
    assert_eq!(outcome.resolved[0].internal_site_id(), "22-02-001");
}

#[test]
fn test_spacing_difference_resolves_cleaned_exact() {
    let outcome = run(&standard_master(), &assets(&[("F-200", "LABUHAN BATU")]));
    let record = &outcome.resolved[0].record;
    assert_eq!(record.strategy, MatchStrategy::CleanedExact);
    assert_eq!(record.region.normalized_name, "LABUHANBATU");
}

#[test]
fn test_typo_resolves_fuzzy() {
    let master = master_table(&[
        ["Kabupaten Kartanegara", "65", "3", "Kalimantan Timur", "Kalimantan"],
        ["Kabupaten Bogor", "32", "2", "Jawa Barat", "Jawa"],
    ]);
    let sink = CollectingSink::new();
    let outcome = pipeline::run(
        &master,
        &assets(&[("F-300", "KERTANEGARA")]),
        &ResolverConfig::default(),
        &sink,
    )
    .unwrap();

    let record = &outcome.resolved[0].record;
    assert_eq!(record.strategy, MatchStrategy::Fuzzy);
    assert_eq!(record.region.normalized_name, "KARTANEGARA");
    assert!(record.similarity.unwrap() >= 0.80);
    assert_eq!(sink.count("fuzzy_match"), 1);
}

#[test]
fn test_regency_fragment_found_only_as_city() {
    let master = master_table(&[
        ["Kota Bandung", "22", "2", "Jawa Barat", "Jawa"],
        ["Kabupaten Garut", "32", "2", "Jawa Barat", "Jawa"],
    ]);
    let sink = CollectingSink::new();
    let outcome = pipeline::run(
        &master,
        &assets(&[("F-400", "BANDUNG")]),
        &ResolverConfig::default(),
        &sink,
    )
    .unwrap();

    let record = &outcome.resolved[0].record;
    assert_eq!(record.strategy, MatchStrategy::CrossTypeFallback);
    assert_eq!(record.parsed_type, AdministrativeType::Regency);
    assert_eq!(record.matched_type, AdministrativeType::City);
    assert_eq!(sink.count("cross_type_match"), 1);
}

#[test]
fn test_two_keys_cleaning_to_same_name_are_ambiguous() {
    let master = master_table(&[
        ["Kabupaten Palu Ta", "72", "4", "Sulawesi Tengah", "Sulawesi"],
        ["Kabupaten Palu-Ta", "73", "4", "Sulawesi Tengah", "Sulawesi"],
    ]);

    // repeated runs must agree
    for _ in 0..3 {
        let outcome = run(&master, &assets(&[("F-500", "PALUTA")]));
        assert!(outcome.resolved.is_empty());
        assert_eq!(
            outcome.unresolved[0].reason,
            FailureReason::Ambiguous {
                count: 2,
                example: "Kabupaten Palu Ta".to_string(),
            }
        );
    }
}

#[test]
fn test_fuzzy_threshold_boundary() {
    // "ABCDX" vs "ABCDE": 2 * 4 / 10 = 0.80
    // "ABCXY" vs "ABCDE": 2 * 3 / 10 = 0.60
    let master = master_table(&[["Kabupaten ABCDE", "90", "1", "", ""]]);
    let outcome = run(&master, &assets(&[("F-1", "ABCDX"), ("F-2", "ABCXY")]));

    assert_eq!(outcome.resolved.len(), 1);
    assert_eq!(outcome.resolved[0].record.facility_id, "F-1");
    assert_eq!(outcome.unresolved[0].facility_id, "F-2");
    assert_eq!(outcome.unresolved[0].reason, FailureReason::NoMatch);

    let mut strict = ResolverConfig::default();
    strict.matching.fuzzy_threshold = 0.81;
    let outcome = pipeline::run(&master, &assets(&[("F-1", "ABCDX")]), &strict, &NullSink).unwrap();
    assert!(outcome.resolved.is_empty());
}

#[test]
fn test_mixed_batch_accounting_and_order() {
    let input = assets(&[
        ("F-9", "ACEH BARAT"),
        ("F-10", "ACEH BARAT"),
        ("F-3", "JAKARTA SELATAN, KOTA"),
        ("F-4", "   "),
        ("", "ACEH BARAT"),
        ("F-6", ""),
        ("F-7", "ATLANTIS"),
        ("F-8", ", KOTA"),
    ]);
    let outcome = run(&standard_master(), &input);

    assert_eq!(outcome.validation.total_rows, 8);
    assert_eq!(outcome.validation.excluded_rows, 2);
    assert_eq!(outcome.validation.missing_facility_id, 1);
    assert_eq!(outcome.validation.missing_address_fragment, 1);
    assert_eq!(outcome.resolved.len() + outcome.unresolved.len(), 6);

    // sorted by region code then facility id, numerically
    let ids: Vec<(String, String)> = outcome
        .resolved
        .iter()
        .map(|r| (r.record.facility_id.clone(), r.internal_site_id()))
        .collect();
    assert_eq!(
        ids,
        vec![
            ("F-10".to_string(), "11-01-001".to_string()),
            ("F-9".to_string(), "11-01-002".to_string()),
            ("F-3".to_string(), "31-01-001".to_string()),
        ]
    );

    let reasons: Vec<(&str, &str)> = outcome
        .unresolved
        .iter()
        .map(|r| (r.facility_id.as_str(), r.reason.code()))
        .collect();
    assert_eq!(
        reasons,
        vec![("F-4", "empty_input"), ("F-7", "no_match"), ("F-8", "empty_input")]
    );

    let summary = &outcome.summary;
    assert_eq!(summary.valid_rows, 6);
    assert_eq!(format!("{:.2}", summary.success_rate()), "50.00");
    assert_eq!(summary.top_unmapped.len(), 1);
    assert_eq!(summary.top_unmapped[0].candidate, "ATLANTIS");
}

#[test]
fn test_unusable_master_rows_reported() {
    let master = master_table(&[
        ["", "10", "1", "", ""],
        ["Provinsi Aceh", "11", "1", "Aceh", "Sumatra"],
        ["Kota Medan", "", "1", "Sumatera Utara", "Sumatra"],
        ["Kabupaten Siak", "14", "1", "Riau", "Sumatra"],
        ["Kabupaten SIAK", "15", "2", "Riau", "Sumatra"],
    ]);
    let sink = CollectingSink::new();
    let outcome = pipeline::run(
        &master,
        &assets(&[("F-1", "SIAK")]),
        &ResolverConfig::default(),
        &sink,
    )
    .unwrap();

    assert_eq!(outcome.resolved[0].internal_site_id(), "15-02-001");
    let stats = outcome.summary.master;
    assert_eq!(stats.unmapped, 1);
    assert_eq!(stats.unrecognized, 1);
    assert_eq!(stats.missing_code, 1);
    assert_eq!(stats.overwritten_keys, 1);
    assert_eq!(stats.regencies, 1);
    assert_eq!(stats.cities, 0);
    assert_eq!(sink.count("duplicate_master_key"), 1);
    assert!(sink.snapshot().iter().any(|d| matches!(
        d,
        Diagnostic::IndexBuilt {
            overwritten_keys: 1,
            ..
        }
    )));
}

#[test]
fn test_passthrough_columns_carried() {
    let input = Table::from_rows(
        "assets",
        &["Owner", "Funcloc", "Alamat4", "Status"],
        &[vec!["PLN", "F-1", "ACEH BARAT", ""]],
    );
    let outcome = run(&standard_master(), &input);
    let passthrough = &outcome.resolved[0].record.passthrough;
    assert_eq!(passthrough.get("Owner").map(String::as_str), Some("PLN"));
    assert!(!passthrough.contains_key("Status"));
    assert!(!passthrough.contains_key("Funcloc"));
}

#[test]
fn test_missing_columns_abort_before_resolution() {
    let input = Table::from_rows("assets", &["Asset", "Address"], &[vec!["F-1", "ACEH BARAT"]]);
    let sink = CollectingSink::new();
    let err = pipeline::run(&standard_master(), &input, &ResolverConfig::default(), &sink)
        .unwrap_err();

    match err {
        EngineError::MissingColumns { table, columns } => {
            assert_eq!(table, "assets");
            assert_eq!(columns, vec!["Funcloc".to_string(), "Alamat4".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(sink.snapshot().is_empty());
}

#[test]
fn test_ragged_master_is_fatal() {
    let mut master = standard_master();
    master.push_row(vec![Some("Kota Medan".to_string())]);
    let err = pipeline::run(
        &master,
        &assets(&[("F-1", "ACEH BARAT")]),
        &ResolverConfig::default(),
        &NullSink,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::RaggedRow { row: 6, .. }));
}

#[test]
fn test_custom_column_names() {
    let config = ResolverConfig::from_yaml_str(
        "input_columns:\n  facility_id: AssetId\n  address_fragment: Kabupaten\n",
    )
    .unwrap();
    let input = Table::from_rows(
        "assets",
        &["AssetId", "Kabupaten"],
        &[vec!["A-1", "Bandung, Kota"]],
    );
    let outcome = pipeline::run(&standard_master(), &input, &config, &NullSink).unwrap();
    assert_eq!(outcome.resolved[0].internal_site_id(), "22-02-001");
}
