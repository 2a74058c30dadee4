//! Record loading and data resolution for the runner.
//!
//! Implements the fallback policy:
//! 1. Explicit CSV source → read it (failure is an error, no fallback)
//! 2. Explicit synthetic source → generate (tagged)
//! 3. Otherwise, per partner: cached data → download and cache (unless offline)
//!    → synthetic (if allowed, tagged) → fail with a clear error
//!
//! Records outside the analysis window are dropped.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{info, warn};

use tariffscope_core::data::{
    read_records_csv, DataError, DataSource, FetchProgress, ParquetCache, SyntheticGenerator,
    TradeProvider,
};
use tariffscope_core::{dataset_hash, Partner, PeriodClassifier, TradeRecord};

use crate::config::{AnalysisConfig, ConfigError, SourceKind};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "no cached data for '{partner}' and no network access (enable synthetic fallback for synthetic data)"
    )]
    NoCachedDataOffline { partner: Partner },

    #[error("no cached data for '{partner}' and download failed: {reason}")]
    DownloadFailed { partner: Partner, reason: String },

    #[error("csv source selected but no csv path given")]
    MissingCsvPath,

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how records are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub source: SourceKind,
    pub csv_path: Option<PathBuf>,
    /// First date kept (inclusive).
    pub start: NaiveDate,
    /// Last date kept (inclusive).
    pub end: NaiveDate,
    /// If true, never make network requests.
    pub offline: bool,
    /// If true, generate synthetic records when real data is unavailable.
    pub synthetic_fallback: bool,
    /// Re-download even if cached.
    pub force: bool,
    pub seed: u64,
    /// Used by the synthetic generator for its period effects.
    pub classifier: PeriodClassifier,
}

impl LoadOptions {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            source: config.data.source,
            csv_path: config.data.csv_path.clone(),
            start: config.periods.analysis_start,
            end: config.periods.analysis_end,
            offline: config.data.offline,
            synthetic_fallback: config.data.synthetic_fallback,
            force: config.data.force_download,
            seed: config.data.seed,
            classifier: config.periods.classifier()?,
        })
    }

    fn in_window(&self, record: &TradeRecord) -> bool {
        record.date >= self.start && record.date <= self.end
    }

    fn synthetic(&self) -> SyntheticGenerator {
        SyntheticGenerator::new(self.classifier, self.start, self.end, self.seed)
    }
}

/// Loaded records with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Sorted by (date, partner, flow).
    pub records: Vec<TradeRecord>,
    pub sources: BTreeMap<Partner, DataSource>,
    /// BLAKE3 over the records in canonical order.
    pub dataset_hash: String,
    /// Whether any partner used synthetic data.
    pub has_synthetic: bool,
}

/// Load records for the given partners, with fallback to download or synthetic data.
pub fn load_records(
    partners: &[Partner],
    cache: &ParquetCache,
    provider: Option<&dyn TradeProvider>,
    progress: Option<&dyn FetchProgress>,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    let mut records: Vec<TradeRecord> = Vec::new();
    let mut sources: BTreeMap<Partner, DataSource> = BTreeMap::new();

    match opts.source {
        SourceKind::Csv => {
            let path = opts.csv_path.as_ref().ok_or(LoadError::MissingCsvPath)?;
            let all = read_records_csv(path)?;
            info!(path = %path.display(), records = all.len(), "loaded csv");
            records.extend(
                all.into_iter()
                    .filter(|r| partners.contains(&r.partner) && opts.in_window(r)),
            );
            for &partner in partners {
                if records.iter().any(|r| r.partner == partner) {
                    sources.insert(partner, DataSource::CsvImport);
                }
            }
        }
        SourceKind::Synthetic => {
            warn!("using synthetic data, results will be tagged as synthetic");
            records.extend(
                opts.synthetic()
                    .generate()
                    .into_iter()
                    .filter(|r| partners.contains(&r.partner)),
            );
            for &partner in partners {
                sources.insert(partner, DataSource::Synthetic);
            }
        }
        SourceKind::Comtrade => {
            let total = partners.len();
            for (i, &partner) in partners.iter().enumerate() {
                let (rows, source) =
                    resolve_partner(partner, i, total, cache, provider, progress, opts)?;
                records.extend(rows.into_iter().filter(|r| opts.in_window(r)));
                sources.insert(partner, source);
            }
            if let Some(p) = progress {
                let synthetic = sources.values().filter(|s| **s == DataSource::Synthetic).count();
                p.on_batch_complete(total - synthetic, synthetic, total);
            }
        }
    }

    records.sort_by_key(|r| (r.date, r.partner, r.flow));
    let has_synthetic = sources.values().any(|s| *s == DataSource::Synthetic);
    let dataset_hash = dataset_hash(&records);

    Ok(LoadedData {
        records,
        sources,
        dataset_hash,
        has_synthetic,
    })
}

fn resolve_partner(
    partner: Partner,
    index: usize,
    total: usize,
    cache: &ParquetCache,
    provider: Option<&dyn TradeProvider>,
    progress: Option<&dyn FetchProgress>,
    opts: &LoadOptions,
) -> Result<(Vec<TradeRecord>, DataSource), LoadError> {
    // Step 1: cache
    if !opts.force {
        if let Ok(rows) = cache.load(partner) {
            if let Some(p) = progress {
                p.on_start(partner, index, total);
                p.on_complete(partner, index, total, &Ok(rows.len()));
            }
            return Ok((rows, DataSource::Cache));
        }
    }

    // Step 2: download
    let mut reason = "no provider available".to_string();
    if !opts.offline {
        if let Some(prov) = provider.filter(|p| p.is_available()) {
            if let Some(p) = progress {
                p.on_start(partner, index, total);
            }
            match prov.fetch(partner, opts.start.year(), opts.end.year()) {
                Ok(fetched) => {
                    if let Err(e) = cache.write(partner, &fetched.records, fetched.source) {
                        warn!(%partner, error = %e, "could not cache downloaded records");
                    }
                    if let Some(p) = progress {
                        p.on_complete(partner, index, total, &Ok(fetched.records.len()));
                    }
                    return Ok((fetched.records, fetched.source));
                }
                Err(e) => {
                    reason = e.to_string();
                    if let Some(p) = progress {
                        p.on_complete(partner, index, total, &Err(e));
                    }
                }
            }
        }
    }

    // Step 3: synthetic
    if opts.synthetic_fallback {
        warn!(%partner, "generating synthetic data, results will be tagged as synthetic");
        let rows = opts.synthetic().fetch(partner, opts.start.year(), opts.end.year())?;
        return Ok((rows.records, DataSource::Synthetic));
    }

    // Step 4: fail
    if opts.offline {
        return Err(LoadError::NoCachedDataOffline { partner });
    }
    Err(LoadError::DownloadFailed { partner, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use tariffscope_core::data::FetchResult;
    use tariffscope_core::Flow;

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_cache_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir()
            .join(format!("tariffscope_loader_test_{}_{id}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn opts(source: SourceKind) -> LoadOptions {
        LoadOptions {
            source,
            csv_path: None,
            start: ymd(2016, 1, 1),
            end: ymd(2025, 5, 13),
            offline: false,
            synthetic_fallback: false,
            force: false,
            seed: 42,
            classifier: PeriodClassifier::default(),
        }
    }

    fn sample(partner: Partner) -> Vec<TradeRecord> {
        vec![
            TradeRecord::new(ymd(2017, 6, 30), partner, Flow::Export, 1200.0).unwrap(),
            TradeRecord::new(ymd(2017, 6, 30), partner, Flow::Import, 1500.0).unwrap(),
            TradeRecord::new(ymd(1999, 6, 30), partner, Flow::Import, 1.0).unwrap(),
        ]
    }

    struct MockProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl TradeProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn fetch(
            &self,
            partner: Partner,
            start_year: i32,
            end_year: i32,
        ) -> Result<FetchResult, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DataError::NoData {
                    partner,
                    start_year,
                    end_year,
                });
            }
            Ok(FetchResult {
                partner,
                records: sample(partner),
                source: DataSource::Comtrade,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn cache_hit_skips_provider() {
        let dir = temp_cache_dir();
        let cache = ParquetCache::new(&dir);
        cache.write(Partner::Usa, &sample(Partner::Usa), DataSource::Comtrade).unwrap();
        cache.write(Partner::China, &sample(Partner::China), DataSource::Comtrade).unwrap();
        let mock = MockProvider {
            calls: AtomicUsize::new(0),
            fail: false,
        };

        let loaded = load_records(
            &Partner::ALL,
            &cache,
            Some(&mock),
            None,
            &opts(SourceKind::Comtrade),
        )
        .unwrap();
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
        assert_eq!(loaded.sources[&Partner::Usa], DataSource::Cache);
        // 1999 record is outside the window.
        assert_eq!(loaded.records.len(), 4);
        assert!(!loaded.has_synthetic);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn download_populates_cache() {
        let dir = temp_cache_dir();
        let cache = ParquetCache::new(&dir);
        let mock = MockProvider {
            calls: AtomicUsize::new(0),
            fail: false,
        };

        let loaded = load_records(
            &[Partner::China],
            &cache,
            Some(&mock),
            None,
            &opts(SourceKind::Comtrade),
        )
        .unwrap();
        assert_eq!(loaded.sources[&Partner::China], DataSource::Comtrade);
        assert_eq!(cache.load(Partner::China).unwrap().len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_cache_keeps_downloaded_records() {
        let dir = temp_cache_dir();
        let blocker = dir.join("not_a_dir");
        std::fs::write(&blocker, b"file in the way").unwrap();
        let cache = ParquetCache::new(&blocker);
        let mock = MockProvider {
            calls: AtomicUsize::new(0),
            fail: false,
        };

        let loaded = load_records(
            &[Partner::China],
            &cache,
            Some(&mock),
            None,
            &opts(SourceKind::Comtrade),
        )
        .unwrap();
        assert_eq!(loaded.sources[&Partner::China], DataSource::Comtrade);
        assert_eq!(loaded.records.len(), 2);
        assert!(!loaded.has_synthetic);
        assert!(cache.load(Partner::China).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn offline_without_cache_fails_without_fallback() {
        let dir = temp_cache_dir();
        let cache = ParquetCache::new(&dir);
        let mut o = opts(SourceKind::Comtrade);
        o.offline = true;

        let err = load_records(&Partner::ALL, &cache, None, None, &o).unwrap_err();
        assert!(matches!(err, LoadError::NoCachedDataOffline { partner: Partner::Usa }));
        assert!(err.to_string().contains("no cached data"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_download_falls_back_to_synthetic() {
        let dir = temp_cache_dir();
        let cache = ParquetCache::new(&dir);
        let mock = MockProvider {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let mut o = opts(SourceKind::Comtrade);
        o.synthetic_fallback = true;

        let loaded = load_records(&Partner::ALL, &cache, Some(&mock), None, &o).unwrap();
        assert!(loaded.has_synthetic);
        assert_eq!(loaded.sources[&Partner::China], DataSource::Synthetic);
        assert_eq!(loaded.records.len(), 112 * 4);
        // Synthetic data is never written to the cache.
        assert!(cache.load(Partner::Usa).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_download_without_fallback_reports_reason() {
        let dir = temp_cache_dir();
        let cache = ParquetCache::new(&dir);
        let mock = MockProvider {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let err = load_records(
            &[Partner::Usa],
            &cache,
            Some(&mock),
            None,
            &opts(SourceKind::Comtrade),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::DownloadFailed { .. }));
        assert!(err.to_string().contains("no trade data returned"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn csv_source_reads_file_and_filters_window() {
        let dir = temp_cache_dir();
        let path = dir.join("trade.csv");
        let mut rows = sample(Partner::Usa);
        rows.extend(sample(Partner::China));
        tariffscope_core::data::write_records_csv(&path, &rows).unwrap();

        let mut o = opts(SourceKind::Csv);
        o.csv_path = Some(path);
        let loaded = load_records(&Partner::ALL, &ParquetCache::new(&dir), None, None, &o).unwrap();
        assert_eq!(loaded.records.len(), 4);
        assert_eq!(loaded.sources[&Partner::China], DataSource::CsvImport);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn synthetic_source_is_deterministic() {
        let dir = temp_cache_dir();
        let cache = ParquetCache::new(&dir);
        let o = opts(SourceKind::Synthetic);
        let a = load_records(&Partner::ALL, &cache, None, None, &o).unwrap();
        let b = load_records(&Partner::ALL, &cache, None, None, &o).unwrap();
        assert!(a.has_synthetic);
        assert_eq!(a.dataset_hash, b.dataset_hash);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
