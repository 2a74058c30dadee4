//! Export orchestrator for artifacts, charts and reports.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::reporting::artifacts::{ArtifactManager, ArtifactPaths};
use crate::reporting::charts::render_charts;
use crate::reporting::reports::{ChartLink, HtmlReportGenerator, MarkdownReportGenerator};
use crate::runner::AnalysisResult;

pub const HTML_REPORT: &str = "trade_analysis_report.html";
pub const MARKDOWN_REPORT: &str = "report.md";

/// Which optional outputs to produce next to the data artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub charts: bool,
    pub html: bool,
    pub markdown: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            charts: true,
            html: true,
            markdown: true,
        }
    }
}

pub fn export_run_with_report(
    output_dir: impl AsRef<Path>,
    result: &AnalysisResult,
    options: &ReportOptions,
) -> Result<ArtifactPaths> {
    let manager = ArtifactManager::new(output_dir)?;
    let mut paths = manager.save_run(result)?;

    let mut links: Vec<ChartLink> = Vec::new();
    if options.charts {
        for chart in render_charts(result) {
            paths.charts.push(manager.save_text(chart.file_name, &chart.svg)?);
            links.push(chart.link());
        }
    }

    if options.html {
        let report = HtmlReportGenerator.generate(result, &links);
        paths.report_html = Some(manager.save_text(HTML_REPORT, &report)?);
    }
    if options.markdown {
        let report = MarkdownReportGenerator.generate(result, &links);
        paths.report_markdown = Some(manager.save_text(MARKDOWN_REPORT, &report)?);
    }

    info!(
        dir = %manager.output_dir().display(),
        charts = paths.charts.len(),
        "artifacts written"
    );
    Ok(paths)
}
