//! Parquet cache of downloaded trade records, Hive-partitioned by partner.
//!
//! Layout: `{cache_dir}/partner={PARTNER}/{year}.parquet` plus a `meta.json`
//! sidecar per partner.
//!
//! - writes go to `.tmp` and are renamed into place
//! - files that fail to read or validate are renamed to `.quarantined` and skipped

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::provider::{DataError, DataSource};
use crate::domain::{Flow, Partner, TradeRecord};
use crate::fingerprint::dataset_hash;

const COLUMNS: [&str; 3] = ["date", "flow", "value"];

/// Metadata sidecar for one cached partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub partner: Partner,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub record_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: NaiveDateTime,
}

/// Cache status for a single partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub partner: Partner,
    pub cached: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub record_count: Option<usize>,
    pub source: Option<DataSource>,
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn partner_dir(&self, partner: Partner) -> PathBuf {
        self.cache_dir.join(format!("partner={}", partner.slug()))
    }

    fn year_path(&self, partner: Partner, year: i32) -> PathBuf {
        self.partner_dir(partner).join(format!("{year}.parquet"))
    }

    fn meta_path(&self, partner: Partner) -> PathBuf {
        self.partner_dir(partner).join("meta.json")
    }

    /// Write the records belonging to `partner`, one Parquet file per year.
    ///
    /// Existing year files are replaced; years not present in `records` are left alone.
    pub fn write(
        &self,
        partner: Partner,
        records: &[TradeRecord],
        source: DataSource,
    ) -> Result<(), DataError> {
        let mut own: Vec<TradeRecord> = records
            .iter()
            .filter(|r| r.partner == partner)
            .copied()
            .collect();
        if own.is_empty() {
            return Err(DataError::CacheError(format!(
                "no {partner} records to cache"
            )));
        }
        own.sort_by_key(|r| (r.date, r.flow));

        let dir = self.partner_dir(partner);
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut by_year: BTreeMap<i32, Vec<&TradeRecord>> = BTreeMap::new();
        for r in &own {
            by_year.entry(r.date.year()).or_default().push(r);
        }

        for (year, rows) in &by_year {
            let mut df = records_to_dataframe(rows)?;
            let path = self.year_path(partner, *year);
            let tmp_path = path.with_extension("parquet.tmp");

            write_parquet(&mut df, &tmp_path)?;
            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::CacheError(format!("atomic rename failed: {e}"))
            })?;
        }

        let (start_date, end_date) = match (own.first(), own.last()) {
            (Some(first), Some(last)) => (first.date, last.date),
            _ => return Err(DataError::CacheError("no records to cache".into())),
        };
        let meta = CacheMeta {
            partner,
            start_date,
            end_date,
            record_count: own.len(),
            data_hash: dataset_hash(&own),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(partner), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        debug!(%partner, records = own.len(), years = by_year.len(), "cache written");
        Ok(())
    }

    /// All cached records for a partner, sorted by (date, flow).
    pub fn load(&self, partner: Partner) -> Result<Vec<TradeRecord>, DataError> {
        let dir = self.partner_dir(partner);
        if !dir.exists() {
            return Err(DataError::NoCachedData { partner });
        }

        let entries =
            fs::read_dir(&dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }

            match load_and_validate_parquet(&path, partner) {
                Ok(rows) => records.extend(rows),
                Err(e) => {
                    let quarantine = path.with_extension("parquet.quarantined");
                    warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                    let _ = fs::rename(&path, &quarantine);
                }
            }
        }

        if records.is_empty() {
            return Err(DataError::NoCachedData { partner });
        }
        records.sort_by_key(|r| (r.date, r.flow));
        Ok(records)
    }

    pub fn get_meta(&self, partner: Partner) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(partner)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn status(&self, partners: &[Partner]) -> Vec<CacheStatus> {
        partners
            .iter()
            .map(|&partner| {
                let meta = self.get_meta(partner);
                CacheStatus {
                    partner,
                    cached: meta.is_some(),
                    start_date: meta.as_ref().map(|m| m.start_date),
                    end_date: meta.as_ref().map(|m| m.end_date),
                    record_count: meta.as_ref().map(|m| m.record_count),
                    source: meta.as_ref().map(|m| m.source),
                }
            })
            .collect()
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn records_to_dataframe(records: &[&TradeRecord]) -> Result<DataFrame, DataError> {
    let epoch = epoch();
    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();
    let flows: Vec<&str> = records.iter().map(|r| r.flow.slug()).collect();
    let values: Vec<f64> = records.iter().map(|r| r.value).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("flow".into(), flows),
        Column::new("value".into(), values),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path, partner: Partner) -> Result<Vec<TradeRecord>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::CacheError("empty parquet file".into()));
    }
    for name in COLUMNS {
        if df.column(name).is_err() {
            return Err(DataError::CacheError(format!("missing column '{name}'")));
        }
    }

    dataframe_to_records(&df, partner)
}

fn dataframe_to_records(df: &DataFrame, partner: Partner) -> Result<Vec<TradeRecord>, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));

    let date_ca = df
        .column("date")
        .map_err(map_err)?
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;
    let flow_ca = df
        .column("flow")
        .map_err(map_err)?
        .str()
        .map_err(|e| DataError::ParquetError(format!("flow column type: {e}")))?;
    let value_ca = df
        .column("value")
        .map_err(map_err)?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("value column type: {e}")))?;

    let epoch = epoch();
    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        let flow: Flow = flow_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null flow at row {i}")))?
            .parse()?;
        let value = value_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null value at row {i}")))?;
        let date = epoch + chrono::Duration::days(days as i64);
        records.push(TradeRecord::new(date, partner, flow, value)?);
    }
    Ok(records)
}
