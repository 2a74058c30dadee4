//! Integration tests for the acquisition layer: synthetic data, CSV and the Parquet cache.

use chrono::{Datelike, NaiveDate};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tariffscope_core::data::{
    read_records_csv, write_records_csv, DataError, DataSource, ParquetCache, SyntheticGenerator,
    TradeProvider, DEFAULT_SEED,
};
use tariffscope_core::{dataset_hash, Aggregator, Flow, Partner, Period, PeriodClassifier};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_dir() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("tariffscope_data_it_{}_{id}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn generator() -> SyntheticGenerator {
    SyntheticGenerator::new(
        PeriodClassifier::default(),
        NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 5, 13).unwrap(),
        DEFAULT_SEED,
    )
}

#[test]
fn synthetic_data_aggregates_into_four_periods() {
    let records = generator().generate();
    let agg = Aggregator::default().aggregate(&records).unwrap();

    // Month-end sampling ends at 2025-04-30, before the agreement boundary.
    assert_eq!(
        agg.periods(),
        vec![
            Period::PreTariff,
            Period::TrumpTariff,
            Period::PostTariff,
            Period::Universal2025Tariff,
        ]
    );
    for summary in &agg.summaries {
        assert_eq!(summary.flows.len(), 4);
        assert!(summary.total_balance.is_defined());
    }
    assert_eq!(agg.transitions.len(), 3 * 4);
}

#[test]
fn synthetic_us_exports_fall_under_tariffs() {
    let agg = Aggregator::default().aggregate(&generator().generate()).unwrap();
    let new_tariff = agg.summary(Period::Universal2025Tariff).unwrap();
    let new_x = new_tariff.mean(Partner::Usa, Flow::Export).unwrap();
    // Trend alone would put the last month near 1200 * 1.2.
    assert!(new_x < 1200.0 * 1.2 * 0.95, "got {new_x}");

    let china_pre = agg.summary(Period::PreTariff).unwrap();
    let china_trump = agg.summary(Period::TrumpTariff).unwrap();
    assert!(
        china_trump.mean(Partner::China, Flow::Export).unwrap()
            > china_pre.mean(Partner::China, Flow::Export).unwrap()
    );
}

#[test]
fn csv_round_trip_preserves_hash() {
    let dir = temp_dir();
    let path = dir.join("nested").join("trade_data.csv");
    let records = generator().generate();

    write_records_csv(&path, &records).unwrap();
    let loaded = read_records_csv(&path).unwrap();
    assert_eq!(loaded.len(), records.len());
    assert_eq!(dataset_hash(&loaded), dataset_hash(&records));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_csv_is_csv_error() {
    let dir = temp_dir();
    let err = read_records_csv(&dir.join("absent.csv")).unwrap_err();
    assert!(matches!(err, DataError::Csv(_)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn provider_output_caches_per_partner() {
    let dir = temp_dir();
    let cache = ParquetCache::new(&dir);
    let gen = generator();

    for partner in Partner::ALL {
        let fetched = gen.fetch(partner, 2016, 2025).unwrap();
        cache.write(partner, &fetched.records, fetched.source).unwrap();
    }

    let usa = cache.load(Partner::Usa).unwrap();
    let china = cache.load(Partner::China).unwrap();
    assert_eq!(usa.len() + china.len(), gen.generate().len());

    let years: Vec<i32> = std::fs::read_dir(dir.join("partner=china"))
        .unwrap()
        .filter_map(|e| {
            let name = e.ok()?.file_name().into_string().ok()?;
            name.strip_suffix(".parquet")?.parse().ok()
        })
        .collect();
    assert_eq!(years.len(), 10);

    let meta = cache.get_meta(Partner::China).unwrap();
    assert_eq!(meta.source, DataSource::Synthetic);
    assert_eq!(meta.end_date.year(), 2025);
    assert_eq!(meta.data_hash, dataset_hash(&china));

    let _ = std::fs::remove_dir_all(&dir);
}
