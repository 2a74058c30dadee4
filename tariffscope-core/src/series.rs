//! Per-date derived series used by the time-series charts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregation, Metric, UndefinedReason};
use crate::domain::{Flow, Partner, TradeRecord};
use crate::period::Period;

/// Trade balances observed on a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    /// One entry per partner in [`Partner::ALL`] order.
    pub partners: Vec<(Partner, Metric)>,
    pub total: Metric,
}

impl BalancePoint {
    pub fn partner(&self, partner: Partner) -> Metric {
        self.partners
            .iter()
            .find(|(p, _)| *p == partner)
            .map(|(_, m)| *m)
            .unwrap_or(Metric::Undefined(UndefinedReason::NoData))
    }
}

/// Export minus import per date and partner. Dates are ascending.
///
/// Multiple records for the same (date, partner, flow) are summed.
pub fn balance_series(records: &[TradeRecord]) -> Vec<BalancePoint> {
    let mut by_date: BTreeMap<NaiveDate, BTreeMap<(Partner, Flow), f64>> = BTreeMap::new();
    for r in records {
        *by_date
            .entry(r.date)
            .or_default()
            .entry((r.partner, r.flow))
            .or_insert(0.0) += r.value;
    }

    by_date
        .into_iter()
        .map(|(date, values)| {
            let partners: Vec<(Partner, Metric)> = Partner::ALL
                .iter()
                .map(|&p| {
                    let x = values.get(&(p, Flow::Export));
                    let m = values.get(&(p, Flow::Import));
                    let metric = match (x, m) {
                        (Some(x), Some(m)) => Metric::finite(x - m),
                        (None, Some(_)) => Metric::Undefined(UndefinedReason::MissingExport),
                        (Some(_), None) => Metric::Undefined(UndefinedReason::MissingImport),
                        (None, None) => Metric::Undefined(UndefinedReason::NoData),
                    };
                    (p, metric)
                })
                .collect();
            let defined: Vec<f64> = partners.iter().filter_map(|(_, m)| m.value()).collect();
            let total = if defined.is_empty() {
                Metric::Undefined(UndefinedReason::NoDefinedBalance)
            } else {
                Metric::finite(defined.iter().sum())
            };
            BalancePoint {
                date,
                partners,
                total,
            }
        })
        .collect()
}

/// One record expressed relative to the pre-tariff mean of its (partner, flow).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativePoint {
    pub date: NaiveDate,
    pub partner: Partner,
    pub flow: Flow,
    /// `(value / baseline - 1) * 100`
    pub change_pct: Metric,
}

/// Percent deviation of every record from its pre-tariff baseline, in input order.
pub fn relative_to_baseline(records: &[TradeRecord], aggregation: &Aggregation) -> Vec<RelativePoint> {
    let baseline = aggregation.summary(Period::PreTariff);
    records
        .iter()
        .map(|r| {
            let change_pct = match baseline.and_then(|s| s.mean(r.partner, r.flow)) {
                None => Metric::Undefined(UndefinedReason::NoData),
                Some(b) if b == 0.0 => Metric::Undefined(UndefinedReason::ZeroBaseline),
                Some(b) => Metric::finite((r.value / b - 1.0) * 100.0),
            };
            RelativePoint {
                date: r.date,
                partner: r.partner,
                flow: r.flow,
                change_pct,
            }
        })
        .collect()
}
