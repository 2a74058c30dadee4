//! Serializable analysis configuration, loaded from TOML.
//!
//! ```toml
//! [periods]
//! trump_tariff_start = "2018-03-01"
//! trump_tariff_end = "2021-01-20"
//! universal_2025_start = "2025-04-05"
//! agreement_2025_start = "2025-05-13"
//! analysis_start = "2016-01-01"
//! analysis_end = "2025-05-13"
//!
//! [data]
//! source = "comtrade"        # synthetic | csv | comtrade
//! cache_dir = "data/cache"
//! synthetic_fallback = true
//!
//! [report]
//! output_dir = "results"
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tariffscope_core::data::DEFAULT_SEED;
use tariffscope_core::{PeriodBoundaries, PeriodClassifier, ValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid period boundaries: {0}")]
    Boundaries(#[from] ValidationError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the analysed records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Deterministic generated data only.
    Synthetic,
    /// A local CSV file (`data.csv_path`).
    Csv,
    /// UN Comtrade via the Parquet cache.
    Comtrade,
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(SourceKind::Synthetic),
            "csv" => Ok(SourceKind::Csv),
            "comtrade" | "api" => Ok(SourceKind::Comtrade),
            other => Err(ConfigError::Invalid(format!(
                "unknown data source '{other}' (expected synthetic, csv or comtrade)"
            ))),
        }
    }
}

/// Period boundaries plus the window of dates to analyse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PeriodsConfig {
    pub trump_tariff_start: NaiveDate,
    pub trump_tariff_end: NaiveDate,
    pub universal_2025_start: NaiveDate,
    pub agreement_2025_start: NaiveDate,
    /// First date included in the analysis (inclusive).
    pub analysis_start: NaiveDate,
    /// Last date included in the analysis (inclusive).
    pub analysis_end: NaiveDate,
}

impl Default for PeriodsConfig {
    fn default() -> Self {
        let b = PeriodBoundaries::default();
        Self {
            trump_tariff_start: b.trump_tariff_start(),
            trump_tariff_end: b.trump_tariff_end(),
            universal_2025_start: b.universal_2025_start(),
            agreement_2025_start: b.agreement_2025_start(),
            analysis_start: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or(NaiveDate::MIN),
            analysis_end: b.agreement_2025_start(),
        }
    }
}

impl PeriodsConfig {
    pub fn boundaries(&self) -> Result<PeriodBoundaries, ConfigError> {
        Ok(PeriodBoundaries::new(
            self.trump_tariff_start,
            self.trump_tariff_end,
            self.universal_2025_start,
            self.agreement_2025_start,
        )?)
    }

    pub fn classifier(&self) -> Result<PeriodClassifier, ConfigError> {
        Ok(PeriodClassifier::new(self.boundaries()?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub source: SourceKind,
    /// Required when `source = "csv"`.
    pub csv_path: Option<PathBuf>,
    pub cache_dir: PathBuf,
    /// Never make network requests.
    pub offline: bool,
    /// Use synthetic data for partners with no cached or downloadable data.
    pub synthetic_fallback: bool,
    /// Re-download even when the cache has data.
    pub force_download: bool,
    pub seed: u64,
    /// Override for the Comtrade endpoint.
    pub comtrade_url: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Comtrade,
            csv_path: None,
            cache_dir: PathBuf::from("data/cache"),
            offline: false,
            synthetic_fallback: true,
            force_download: false,
            seed: DEFAULT_SEED,
            comtrade_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub title: String,
    /// Render SVG charts alongside the report.
    pub charts: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("results"),
            title: "Colombia Trade Analysis: Impact of US Tariff Policies".into(),
            charts: true,
        }
    }
}

/// Complete configuration of one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub periods: PeriodsConfig,
    pub data: DataConfig,
    pub report: ReportConfig,
}

impl AnalysisConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.periods.boundaries()?;
        if self.periods.analysis_start > self.periods.analysis_end {
            return Err(ConfigError::Invalid(format!(
                "analysis_start {} is after analysis_end {}",
                self.periods.analysis_start, self.periods.analysis_end
            )));
        }
        if self.data.source == SourceKind::Csv && self.data.csv_path.is_none() {
            return Err(ConfigError::Invalid(
                "data.source = \"csv\" requires data.csv_path".into(),
            ));
        }
        Ok(())
    }
}
