use chrono::NaiveDate;
use tariffscope_core::{Flow, Partner, PeriodClassifier, TradeRecord};
use tariffscope_runner::analyze_records;
use tariffscope_runner::reporting::export::export_run_with_report;
use tariffscope_runner::reporting::{ArtifactManager, ReportOptions, RunManifest};

fn rec(y: i32, m: u32, partner: Partner, flow: Flow, value: f64) -> TradeRecord {
    TradeRecord::new(NaiveDate::from_ymd_opt(y, m, 28).unwrap(), partner, flow, value).unwrap()
}

/// USA flat in both periods, China exports starting from zero.
fn make_result() -> tariffscope_runner::AnalysisResult {
    analyze_records(
        vec![
            rec(2017, 3, Partner::Usa, Flow::Export, 1000.0),
            rec(2017, 3, Partner::Usa, Flow::Import, 900.0),
            rec(2017, 3, Partner::China, Flow::Export, 0.0),
            rec(2019, 3, Partner::Usa, Flow::Export, 1000.0),
            rec(2019, 3, Partner::Usa, Flow::Import, 900.0),
            rec(2019, 3, Partner::China, Flow::Export, 40.0),
        ],
        PeriodClassifier::default(),
        "Zero baseline run",
    )
    .unwrap()
}

#[test]
fn test_artifact_manager_exports() {
    let temp_dir = tempfile::tempdir().unwrap();
    let manager = ArtifactManager::new(temp_dir.path()).unwrap();
    let result = make_result();

    let paths = manager.save_run(&result).unwrap();
    assert!(paths.manifest.exists());
    assert!(paths.analysis_json.exists());
    assert!(paths.summary_csv.exists());
    assert!(paths.transitions_csv.exists());
    assert!(paths.records_csv.exists());
    assert!(paths.report_html.is_none());

    let manifest: RunManifest =
        serde_json::from_str(&std::fs::read_to_string(&paths.manifest).unwrap()).unwrap();
    assert_eq!(manifest.record_count, 6);
    assert_eq!(manifest.dataset_hash, result.dataset_hash);
    assert_eq!(manifest.files.len(), 4);
    assert!(manifest.files.contains(&"summary.csv".to_string()));
}

#[test]
fn test_zero_baseline_is_not_rendered_as_zero() {
    let temp_dir = tempfile::tempdir().unwrap();
    let result = make_result();
    let paths =
        export_run_with_report(temp_dir.path(), &result, &ReportOptions::default()).unwrap();

    let transitions = std::fs::read_to_string(&paths.transitions_csv).unwrap();
    assert!(transitions.contains(
        "pre-tariff_to_during-tariff,pre-tariff,during-tariff,china,export,,zero_baseline"
    ));
    // A defined zero change stays a number.
    assert!(transitions.contains(
        "pre-tariff_to_during-tariff,pre-tariff,during-tariff,us,export,0,ok"
    ));

    let md = std::fs::read_to_string(paths.report_markdown.as_ref().unwrap()).unwrap();
    assert!(md.contains("| pre-tariff_to_during-tariff | 0.00% | 0.00% | N/A | N/A |"));

    let html = std::fs::read_to_string(paths.report_html.as_ref().unwrap()).unwrap();
    assert!(html.contains(r#"<td class="na" title="zero baseline">N/A</td>"#));
    assert!(html.contains("Colombian exports to China: change not available (zero baseline)"));
}

#[test]
fn test_missing_import_balance_marked_in_summary() {
    let temp_dir = tempfile::tempdir().unwrap();
    let paths = ArtifactManager::new(temp_dir.path())
        .unwrap()
        .save_run(&make_result())
        .unwrap();
    let summary = std::fs::read_to_string(&paths.summary_csv).unwrap();
    assert!(summary.contains("pre-tariff,china,0,1,,,,missing_import"));
    assert!(summary.contains("pre-tariff,us,1000,1,900,1,100,ok"));
    assert!(summary.contains("pre-tariff,total,,,,,100,ok"));
}
