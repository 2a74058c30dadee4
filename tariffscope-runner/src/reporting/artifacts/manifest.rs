//! Run manifest export (JSON).
//!
//! A small provenance record written next to the full `analysis.json`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use tariffscope_core::data::DataSource;
use tariffscope_core::{Partner, PeriodBoundaries};

use crate::runner::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub title: String,
    pub generated_at: NaiveDateTime,
    pub dataset_hash: String,
    pub record_count: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub boundaries: PeriodBoundaries,
    pub sources: BTreeMap<Partner, DataSource>,
    pub has_synthetic: bool,
    /// Files written for this run, relative to the output directory.
    pub files: Vec<String>,
}

impl RunManifest {
    pub fn from_result(result: &AnalysisResult, files: Vec<String>) -> Self {
        Self {
            schema_version: result.schema_version,
            title: result.title.clone(),
            generated_at: result.generated_at,
            dataset_hash: result.dataset_hash.clone(),
            record_count: result.record_count(),
            start_date: result.start_date,
            end_date: result.end_date,
            boundaries: result.boundaries,
            sources: result.sources.clone(),
            has_synthetic: result.has_synthetic,
            files,
        }
    }
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    let json =
        serde_json::to_string_pretty(manifest).context("Failed to serialize run manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}
