//! JSON and CSV artifact generation.
//!
//! - **JSON**: full round-trip serialization of an [`AnalysisResult`] with schema versioning
//! - **CSV**: period summary, transitions, and the analysed records for external tools
//!
//! Undefined values are written as empty cells with the reason in a `status`
//! column, so a missing value can never be read back as zero.

use std::path::Path;

use anyhow::{bail, Context, Result};

use tariffscope_core::data::write_records_to;
use tariffscope_core::{Aggregation, BalanceScope, Metric, Partner, TradeRecord};

use crate::reporting::reports::format::status_code;
use crate::runner::{AnalysisResult, SCHEMA_VERSION};

pub const ANALYSIS_JSON: &str = "analysis.json";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `AnalysisResult` to pretty JSON.
pub fn export_json(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize AnalysisResult to JSON")
}

/// Deserialize an `AnalysisResult` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<AnalysisResult> {
    let result: AnalysisResult =
        serde_json::from_str(json).context("failed to deserialize AnalysisResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

/// Load an `AnalysisResult` from an output directory's `analysis.json`.
pub fn load_artifacts(dir: &Path) -> Result<AnalysisResult> {
    let path = dir.join(ANALYSIS_JSON);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn metric_cells(metric: &Metric) -> (String, &'static str) {
    match metric {
        Metric::Defined(v) => (v.to_string(), status_code(metric)),
        Metric::Undefined(_) => (String::new(), status_code(metric)),
    }
}

/// Export the per-period summary.
///
/// One row per (period, partner) plus one `total` row per period.
/// Columns: period, partner, export_mean, export_count, import_mean,
/// import_count, balance, balance_status
pub fn export_summary_csv(aggregation: &Aggregation) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "period",
        "partner",
        "export_mean",
        "export_count",
        "import_mean",
        "import_count",
        "balance",
        "balance_status",
    ])?;

    for summary in &aggregation.summaries {
        for partner in Partner::ALL {
            let flows: Vec<(String, String)> = tariffscope_core::Flow::ALL
                .iter()
                .map(|&flow| {
                    summary
                        .flows
                        .iter()
                        .find(|f| f.partner == partner && f.flow == flow)
                        .map(|f| (f.mean.to_string(), f.count.to_string()))
                        .unwrap_or_default()
                })
                .collect();
            let (balance, status) = metric_cells(&summary.balance(partner));
            wtr.write_record([
                summary.period.slug(),
                partner.slug(),
                &flows[0].0,
                &flows[0].1,
                &flows[1].0,
                &flows[1].1,
                &balance,
                status,
            ])?;
        }
        let (total, status) = metric_cells(&summary.total_balance);
        wtr.write_record([summary.period.slug(), "total", "", "", "", "", &total, status])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export flow and balance transitions.
///
/// Columns: transition, from, to, scope, flow, change_pct, status.
/// Balance rows use `balance` in the flow column.
pub fn export_transitions_csv(aggregation: &Aggregation) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["transition", "from", "to", "scope", "flow", "change_pct", "status"])?;

    for t in &aggregation.transitions {
        let (pct, status) = metric_cells(&t.change);
        wtr.write_record([
            t.key().as_str(),
            t.from.slug(),
            t.to.slug(),
            t.partner.slug(),
            t.flow.slug(),
            &pct,
            status,
        ])?;
    }
    for t in &aggregation.balance_transitions {
        let (pct, status) = metric_cells(&t.change);
        let scope = match t.scope {
            BalanceScope::Partner(p) => p.slug(),
            BalanceScope::Total => "total",
        };
        wtr.write_record([
            tariffscope_core::transition_key(t.from, t.to).as_str(),
            t.from.slug(),
            t.to.slug(),
            scope,
            "balance",
            &pct,
            status,
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export records in the long CSV layout accepted by `tariffscope analyze`.
pub fn export_records_csv(records: &[TradeRecord]) -> Result<String> {
    let mut buf = Vec::new();
    write_records_to(&mut buf, records).context("failed to write records CSV")?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}
