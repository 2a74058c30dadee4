//! Markdown report generator.

use super::findings::key_findings;
use super::format::{fmt_metric, fmt_pct, fmt_value};
use super::tables::{balance_table, transition_table, volume_table, Cell, Table};
use super::{date_range, sources_line, ChartLink, SYNTHETIC_NOTICE};
use crate::runner::AnalysisResult;

pub struct MarkdownReportGenerator;

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Value(v) => fmt_value(*v),
        Cell::Metric(m) => fmt_metric(m),
        Cell::Change(m) => fmt_pct(m),
    }
}

fn render_table(md: &mut String, table: &Table) {
    md.push_str(&format!("| {} |\n", table.headers.join(" | ")));
    md.push_str(&format!(
        "|{}\n",
        table.headers.iter().map(|_| "---|").collect::<String>()
    ));
    for row in &table.rows {
        let cells: Vec<String> = row.cells.iter().map(render_cell).collect();
        md.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    md.push('\n');
}

impl MarkdownReportGenerator {
    pub fn generate(&self, result: &AnalysisResult, charts: &[ChartLink]) -> String {
        let mut md = String::with_capacity(4096);
        let agg = &result.aggregation;

        md.push_str(&format!("# {}\n\n", result.title));
        if result.has_synthetic {
            md.push_str(&format!("> **Note:** {SYNTHETIC_NOTICE}\n\n"));
        }
        md.push_str(&format!(
            "Data: {} ({} records)\n\n",
            date_range(result),
            result.record_count()
        ));
        if let Some(sources) = sources_line(result) {
            md.push_str(&format!("Sources: {sources}\n\n"));
        }
        md.push_str(&format!("Dataset: `{}`\n\n", result.dataset_hash));

        if agg.is_empty() {
            md.push_str("No records to analyse.\n");
            return md;
        }

        md.push_str("## Trade Volume by Period\n\n");
        md.push_str("Monthly mean, millions USD.\n\n");
        render_table(&mut md, &volume_table(agg));

        md.push_str("## Trade Balance by Period\n\n");
        render_table(&mut md, &balance_table(agg));

        let transitions = transition_table(agg);
        if !transitions.rows.is_empty() {
            md.push_str("## Percentage Changes Between Periods\n\n");
            render_table(&mut md, &transitions);
        }

        let findings = key_findings(agg, &result.boundaries);
        if !findings.is_empty() {
            md.push_str("## Key Findings\n\n");
            for finding in &findings {
                md.push_str(&format!("### {}\n\n", finding.heading));
                for s in &finding.statements {
                    md.push_str(&format!("- {s}\n"));
                }
                md.push('\n');
            }
        }

        if !charts.is_empty() {
            md.push_str("## Charts\n\n");
            for chart in charts {
                md.push_str(&format!("![{}]({})\n\n", chart.title, chart.file_name));
            }
        }

        md.push_str(&format!(
            "---\nGenerated {}\n",
            result.generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        md
    }
}
