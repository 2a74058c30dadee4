//! Reporting and artifact export pipeline.

pub mod artifacts;
pub mod charts;
pub mod export;
pub mod reports;

pub use artifacts::{ArtifactManager, ArtifactPaths, RunManifest};
pub use export::{export_run_with_report, ReportOptions};
pub use reports::{key_findings, HtmlReportGenerator, KeyFinding, MarkdownReportGenerator};
