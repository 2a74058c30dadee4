//! TariffScope Runner: configuration, loading, analysis pipeline, and reports.
//!
//! This crate builds on `tariffscope-core` to provide:
//! - TOML configuration of period boundaries, data source and output
//! - Record loading with CSV / cache / download / synthetic fallback
//! - The analysis run (aggregation plus derived series) as one serializable result
//! - JSON/CSV artifacts, SVG charts, and HTML/Markdown reports

pub mod config;
pub mod data_loader;
pub mod export;
pub mod reporting;
pub mod runner;

pub use config::{AnalysisConfig, ConfigError, DataConfig, PeriodsConfig, ReportConfig, SourceKind};
pub use data_loader::{load_records, LoadError, LoadOptions, LoadedData};
pub use export::{export_json, import_json, load_artifacts};
pub use reporting::{export_run_with_report, key_findings, ArtifactPaths, KeyFinding, ReportOptions};
pub use runner::{
    analyze_loaded, analyze_records, run_analysis, AnalysisResult, RunError, SCHEMA_VERSION,
};
