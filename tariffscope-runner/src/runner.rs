//! Analysis runner: wires loading, aggregation, and derived series together.
//!
//! Two entry points:
//! - `run_analysis()`: resolves records through the loader, then analyses. Used by the CLI.
//! - `analyze_records()`: takes pre-loaded records. No I/O.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use tariffscope_core::data::{DataSource, FetchProgress, ParquetCache, TradeProvider};
use tariffscope_core::{
    balance_series, dataset_hash, relative_to_baseline, Aggregation, Aggregator, BalancePoint,
    Partner, PeriodBoundaries, PeriodClassifier, RelativePoint, TradeRecord, ValidationError,
};

use crate::config::{AnalysisConfig, ConfigError};
use crate::data_loader::{load_records, LoadError, LoadOptions, LoadedData};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("no trade records between {start} and {end}")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub title: String,
    pub boundaries: PeriodBoundaries,
    pub aggregation: Aggregation,
    pub balance_series: Vec<BalancePoint>,
    pub relative_series: Vec<RelativePoint>,
    pub records: Vec<TradeRecord>,
    pub sources: BTreeMap<Partner, DataSource>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Earliest and latest record dates; `None` when there are no records.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub generated_at: NaiveDateTime,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl AnalysisResult {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Load records according to `config` and analyse them.
pub fn run_analysis(
    config: &AnalysisConfig,
    cache: &ParquetCache,
    provider: Option<&dyn TradeProvider>,
    progress: Option<&dyn FetchProgress>,
) -> Result<AnalysisResult, RunError> {
    config.validate()?;
    let opts = LoadOptions::from_config(config)?;
    let loaded = load_records(&Partner::ALL, cache, provider, progress, &opts)?;
    if loaded.records.is_empty() {
        return Err(RunError::EmptyWindow {
            start: opts.start,
            end: opts.end,
        });
    }
    info!(
        records = loaded.records.len(),
        synthetic = loaded.has_synthetic,
        hash = %loaded.dataset_hash,
        "records loaded"
    );
    analyze_loaded(loaded, opts.classifier, &config.report.title)
}

/// Analyse already-loaded data.
pub fn analyze_loaded(
    loaded: LoadedData,
    classifier: PeriodClassifier,
    title: &str,
) -> Result<AnalysisResult, RunError> {
    let LoadedData {
        records,
        sources,
        dataset_hash,
        has_synthetic,
    } = loaded;

    let aggregation = Aggregator::new(classifier).aggregate(&records)?;
    let balance_series = balance_series(&records);
    let relative_series = relative_to_baseline(&records, &aggregation);

    info!(
        periods = aggregation.summaries.len(),
        transitions = aggregation.transitions.len(),
        "analysis complete"
    );

    Ok(AnalysisResult {
        schema_version: SCHEMA_VERSION,
        title: title.to_string(),
        boundaries: *classifier.boundaries(),
        start_date: records.iter().map(|r| r.date).min(),
        end_date: records.iter().map(|r| r.date).max(),
        aggregation,
        balance_series,
        relative_series,
        records,
        sources,
        dataset_hash,
        has_synthetic,
        generated_at: chrono::Local::now().naive_local(),
    })
}

/// Analyse a bare record batch whose provenance is unknown.
pub fn analyze_records(
    records: Vec<TradeRecord>,
    classifier: PeriodClassifier,
    title: &str,
) -> Result<AnalysisResult, RunError> {
    let mut records = records;
    records.sort_by_key(|r| (r.date, r.partner, r.flow));
    let hash = dataset_hash(&records);
    analyze_loaded(
        LoadedData {
            records,
            sources: BTreeMap::new(),
            dataset_hash: hash,
            has_synthetic: false,
        },
        classifier,
        title,
    )
}
