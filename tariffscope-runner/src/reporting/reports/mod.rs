//! Report generators.

pub mod findings;
pub mod format;
mod html;
mod markdown;
pub mod tables;

pub use findings::{key_findings, KeyFinding};
pub use html::HtmlReportGenerator;
pub use markdown::MarkdownReportGenerator;

use crate::runner::AnalysisResult;

pub const SYNTHETIC_NOTICE: &str =
    "Some or all of the data in this report is synthetic and for demonstration only.";

/// A chart file referenced from a report, relative to the report's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartLink {
    pub file_name: String,
    pub title: String,
}

fn date_range(result: &AnalysisResult) -> String {
    match (result.start_date, result.end_date) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        _ => "no records".to_string(),
    }
}

fn sources_line(result: &AnalysisResult) -> Option<String> {
    if result.sources.is_empty() {
        return None;
    }
    let parts: Vec<String> = result
        .sources
        .iter()
        .map(|(partner, source)| format!("{partner}: {source}"))
        .collect();
    Some(parts.join(", "))
}
