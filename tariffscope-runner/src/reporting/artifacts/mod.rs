//! Artifact manager for persisting run outputs.

mod manifest;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::export::{
    export_json, export_records_csv, export_summary_csv, export_transitions_csv, ANALYSIS_JSON,
};
use crate::runner::AnalysisResult;

pub use manifest::RunManifest;

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub output_dir: PathBuf,
    pub manifest: PathBuf,
    pub analysis_json: PathBuf,
    pub summary_csv: PathBuf,
    pub transitions_csv: PathBuf,
    pub records_csv: PathBuf,
    pub charts: Vec<PathBuf>,
    pub report_html: Option<PathBuf>,
    pub report_markdown: Option<PathBuf>,
}

/// Manages writing all artifacts for a run into one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create artifact output directory {}", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write one text artifact into the output directory.
    pub fn save_text(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Save the data artifacts of a run: JSON result, CSV tables, manifest.
    pub fn save_run(&self, result: &AnalysisResult) -> Result<ArtifactPaths> {
        let analysis_json = self.save_text(ANALYSIS_JSON, &export_json(result)?)?;
        let summary_csv = self.save_text("summary.csv", &export_summary_csv(&result.aggregation)?)?;
        let transitions_csv = self.save_text(
            "transitions.csv",
            &export_transitions_csv(&result.aggregation)?,
        )?;
        let records_csv = self.save_text("records.csv", &export_records_csv(&result.records)?)?;

        let manifest_path = self.output_dir.join("manifest.json");
        let files = [&analysis_json, &summary_csv, &transitions_csv, &records_csv]
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect();
        manifest::write_manifest(&manifest_path, &RunManifest::from_result(result, files))?;

        Ok(ArtifactPaths {
            output_dir: self.output_dir.clone(),
            manifest: manifest_path,
            analysis_json,
            summary_csv,
            transitions_csv,
            records_csv,
            charts: Vec::new(),
            report_html: None,
            report_markdown: None,
        })
    }
}
