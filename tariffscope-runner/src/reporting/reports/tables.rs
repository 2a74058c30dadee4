//! Report tables shared by the Markdown and HTML generators.

use tariffscope_core::{Aggregation, BalanceScope, Flow, Metric, Partner, Period, UndefinedReason};

/// One table cell, formatted by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// Mean of present records; `None` when the key has no records.
    Value(Option<f64>),
    /// A derived value such as a balance.
    Metric(Metric),
    /// A percentage change.
    Change(Metric),
}

#[derive(Debug, Clone)]
pub struct Row {
    /// Period the row describes, used for highlighting tariff periods.
    pub period: Option<Period>,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

fn flow_header(partner: Partner, flow: Flow) -> String {
    match flow {
        Flow::Export => format!("Exports to {partner}"),
        Flow::Import => format!("Imports from {partner}"),
    }
}

fn flow_keys() -> impl Iterator<Item = (Partner, Flow)> {
    Partner::ALL
        .into_iter()
        .flat_map(|p| Flow::ALL.into_iter().map(move |f| (p, f)))
}

fn balance_scopes() -> impl Iterator<Item = BalanceScope> {
    Partner::ALL
        .into_iter()
        .map(BalanceScope::Partner)
        .chain(std::iter::once(BalanceScope::Total))
}

/// Mean monthly value per (partner, flow), one row per present period.
pub fn volume_table(agg: &Aggregation) -> Table {
    let mut headers = vec!["Period".to_string()];
    headers.extend(flow_keys().map(|(p, f)| flow_header(p, f)));
    let rows = agg
        .summaries
        .iter()
        .map(|s| {
            let mut cells = vec![Cell::Text(s.period.slug().to_string())];
            cells.extend(flow_keys().map(|(p, f)| Cell::Value(s.mean(p, f))));
            Row {
                period: Some(s.period),
                cells,
            }
        })
        .collect();
    Table { headers, rows }
}

pub fn balance_table(agg: &Aggregation) -> Table {
    let mut headers = vec!["Period".to_string()];
    headers.extend(balance_scopes().map(|s| s.to_string()));
    let rows = agg
        .summaries
        .iter()
        .map(|s| {
            let mut cells = vec![Cell::Text(s.period.slug().to_string())];
            cells.extend(balance_scopes().map(|scope| {
                Cell::Metric(match scope {
                    BalanceScope::Partner(p) => s.balance(p),
                    BalanceScope::Total => s.total_balance,
                })
            }));
            Row {
                period: Some(s.period),
                cells,
            }
        })
        .collect();
    Table { headers, rows }
}

/// Percentage changes per transition: four flow columns then three balance columns.
pub fn transition_table(agg: &Aggregation) -> Table {
    let mut headers = vec!["Transition".to_string()];
    headers.extend(flow_keys().map(|(p, f)| flow_header(p, f)));
    headers.extend(balance_scopes().map(|s| s.to_string()));

    let missing = Metric::Undefined(UndefinedReason::NoData);
    let rows = agg
        .transition_pairs()
        .into_iter()
        .map(|(from, to)| {
            let mut cells = vec![Cell::Text(tariffscope_core::transition_key(from, to))];
            cells.extend(flow_keys().map(|(p, f)| {
                Cell::Change(agg.transition(from, p, f).map(|t| t.change).unwrap_or(missing))
            }));
            cells.extend(balance_scopes().map(|scope| {
                Cell::Change(
                    agg.balance_transition(from, scope)
                        .map(|t| t.change)
                        .unwrap_or(missing),
                )
            }));
            Row {
                period: Some(to),
                cells,
            }
        })
        .collect();
    Table { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tariffscope_core::{Aggregator, TradeRecord};

    #[test]
    fn tables_have_consistent_width() {
        let records = vec![
            TradeRecord::new(NaiveDate::from_ymd_opt(2017, 1, 31).unwrap(), Partner::Usa, Flow::Export, 10.0).unwrap(),
            TradeRecord::new(NaiveDate::from_ymd_opt(2019, 1, 31).unwrap(), Partner::Usa, Flow::Export, 20.0).unwrap(),
        ];
        let agg = Aggregator::default().aggregate(&records).unwrap();
        for table in [volume_table(&agg), balance_table(&agg), transition_table(&agg)] {
            assert!(!table.rows.is_empty());
            for row in &table.rows {
                assert_eq!(row.cells.len(), table.headers.len());
            }
        }
        let volume = volume_table(&agg);
        assert_eq!(volume.rows[0].cells[1], Cell::Value(Some(10.0)));
        assert_eq!(volume.rows[0].cells[2], Cell::Value(None));
        assert_eq!(transition_table(&agg).rows[0].cells[1], Cell::Change(Metric::Defined(100.0)));
    }
}
