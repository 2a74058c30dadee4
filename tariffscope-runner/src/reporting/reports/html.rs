//! Standalone HTML report.

use tariffscope_core::{Metric, Period};

use super::findings::key_findings;
use super::format::{escape, fmt_metric, fmt_pct, fmt_value};
use super::tables::{balance_table, transition_table, volume_table, Cell, Table};
use super::{date_range, sources_line, ChartLink, SYNTHETIC_NOTICE};
use crate::runner::AnalysisResult;

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; margin: 20px; line-height: 1.6; }
h1, h2, h3 { color: #2c3e50; }
table { border-collapse: collapse; width: 100%; margin-bottom: 20px; }
th, td { text-align: left; padding: 8px 12px; border: 1px solid #ddd; }
th { background-color: #f2f2f2; }
tr:nth-child(even) { background-color: #f9f9f9; }
img { max-width: 100%; height: auto; margin: 20px 0; }
.container { max-width: 1200px; margin: 0 auto; }
.positive { color: green; }
.negative { color: red; }
.na { color: #888; font-style: italic; }
.period-trump { background-color: #ffebee; }
.period-2025 { background-color: #e8eaf6; }
.notice { background-color: #fff8e1; border-left: 4px solid #ffb300; padding: 8px 12px; }
footer { color: #666; font-size: 0.9em; margin-top: 40px; }
"#;

pub struct HtmlReportGenerator;

fn row_class(period: Option<Period>) -> &'static str {
    match period {
        Some(Period::TrumpTariff) => r#" class="period-trump""#,
        Some(Period::Universal2025Tariff | Period::Post2025Agreement) => r#" class="period-2025""#,
        _ => "",
    }
}

fn undefined_cell(metric: &Metric) -> String {
    match metric {
        Metric::Undefined(reason) => format!(
            r#"<td class="na" title="{}">N/A</td>"#,
            escape(&reason.to_string())
        ),
        Metric::Defined(_) => String::new(),
    }
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => format!("<td>{}</td>", escape(s)),
        Cell::Value(Some(v)) => format!("<td>{}</td>", fmt_value(Some(*v))),
        Cell::Value(None) => r#"<td class="na" title="no data">N/A</td>"#.to_string(),
        Cell::Metric(m @ Metric::Defined(_)) => format!("<td>{}</td>", fmt_metric(m)),
        Cell::Change(m @ Metric::Defined(v)) => {
            let class = if *v > 0.0 { "positive" } else { "negative" };
            format!(r#"<td class="{class}">{}</td>"#, fmt_pct(m))
        }
        Cell::Metric(m) | Cell::Change(m) => undefined_cell(m),
    }
}

fn render_table(html: &mut String, table: &Table) {
    html.push_str("<table>\n<tr>");
    for h in &table.headers {
        html.push_str(&format!("<th>{}</th>", escape(h)));
    }
    html.push_str("</tr>\n");
    for row in &table.rows {
        html.push_str(&format!("<tr{}>", row_class(row.period)));
        for cell in &row.cells {
            html.push_str(&render_cell(cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
}

impl HtmlReportGenerator {
    pub fn generate(&self, result: &AnalysisResult, charts: &[ChartLink]) -> String {
        let mut html = String::with_capacity(8192);
        let agg = &result.aggregation;
        let title = escape(&result.title);

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{title}</title>\n<style>{STYLE}</style>\n"));
        html.push_str("</head>\n<body>\n<div class=\"container\">\n");
        html.push_str(&format!("<h1>{title}</h1>\n"));
        html.push_str(
            "<p>Trade between Colombia and its two largest partners, the USA and China, \
             across the Trump administration tariffs (2018-2021), the 2025 universal US \
             reciprocal tariff, and the 2025 US-China agreement.</p>\n",
        );
        if result.has_synthetic {
            html.push_str(&format!(
                "<p class=\"notice\"><strong>Note:</strong> {SYNTHETIC_NOTICE}</p>\n"
            ));
        }
        if let Some(sources) = sources_line(result) {
            html.push_str(&format!("<p>Sources: {}</p>\n", escape(&sources)));
        }

        if agg.is_empty() {
            html.push_str("<p>No records to analyse.</p>\n");
        } else {
            html.push_str("<h2>Trade Volume Statistics</h2>\n");
            html.push_str("<p>Monthly mean, millions USD.</p>\n");
            render_table(&mut html, &volume_table(agg));

            html.push_str("<h2>Trade Balance Statistics</h2>\n");
            render_table(&mut html, &balance_table(agg));

            let transitions = transition_table(agg);
            if !transitions.rows.is_empty() {
                html.push_str("<h2>Percentage Changes Between Periods</h2>\n");
                render_table(&mut html, &transitions);
            }
        }

        if !charts.is_empty() {
            html.push_str("<h2>Visualizations</h2>\n");
            for chart in charts {
                let chart_title = escape(&chart.title);
                html.push_str(&format!(
                    "<h3>{chart_title}</h3>\n<img src=\"{}\" alt=\"{chart_title}\">\n",
                    escape(&chart.file_name)
                ));
            }
        }

        let findings = key_findings(agg, &result.boundaries);
        if !findings.is_empty() {
            html.push_str("<h2>Key Findings</h2>\n");
            for finding in &findings {
                html.push_str(&format!("<h3>{}</h3>\n<ul>\n", escape(&finding.heading)));
                for s in &finding.statements {
                    html.push_str(&format!("<li>{}</li>\n", escape(s)));
                }
                html.push_str("</ul>\n");
            }
        }

        html.push_str(&format!(
            "<footer>\n<p>Report generated on {}</p>\n<p>Analysis includes data from {}</p>\n\
             <p>Dataset fingerprint: <code>{}</code></p>\n</footer>\n",
            result.generated_at.format("%Y-%m-%d %H:%M:%S"),
            date_range(result),
            escape(&result.dataset_hash)
        ));
        html.push_str("</div>\n</body>\n</html>\n");
        html
    }
}
