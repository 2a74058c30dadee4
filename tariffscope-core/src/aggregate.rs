//! Period-level aggregation: means, trade balances, and period-over-period changes.
//!
//! Keys with no contributing records are absent from the output, and values that
//! cannot be derived are reported as [`Metric::Undefined`] with a reason. Neither
//! is ever collapsed to zero.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Flow, Partner, TradeRecord, ValidationError};
use crate::period::{Period, PeriodClassifier};

/// Why a derived value is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Import data exists but no export data for the (period, partner).
    MissingExport,
    /// Export data exists but no import data for the (period, partner).
    MissingImport,
    /// No records at all for the key.
    NoData,
    /// The earlier value of a percentage change is zero.
    ZeroBaseline,
    /// One side of a balance comparison is itself undefined.
    UndefinedOperand,
    /// No partner balance in the period is defined, so there is nothing to total.
    NoDefinedBalance,
    /// The result exceeds the range of `f64`.
    Overflow,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UndefinedReason::MissingExport => "missing export data",
            UndefinedReason::MissingImport => "missing import data",
            UndefinedReason::NoData => "no data",
            UndefinedReason::ZeroBaseline => "zero baseline",
            UndefinedReason::UndefinedOperand => "undefined operand",
            UndefinedReason::NoDefinedBalance => "no defined balance",
            UndefinedReason::Overflow => "overflow",
        };
        f.write_str(s)
    }
}

/// A derived number that may legitimately be unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Metric {
    /// `Defined(v)` for finite `v`, otherwise `Undefined(Overflow)`.
    pub fn finite(v: f64) -> Metric {
        if v.is_finite() {
            Metric::Defined(v)
        } else {
            Metric::Undefined(UndefinedReason::Overflow)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Defined(v) => Some(*v),
            Metric::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Defined(_))
    }
}

/// `(to - from) / from * 100`, undefined when `from` is zero.
pub fn percent_change(from: f64, to: f64) -> Metric {
    if from == 0.0 {
        return Metric::Undefined(UndefinedReason::ZeroBaseline);
    }
    Metric::finite((to - from) / from * 100.0)
}

/// Like [`percent_change`] but divides by `|from|`, so a balance moving from
/// -100 to -50 reads as +50% rather than -50%.
pub fn percent_change_abs(from: f64, to: f64) -> Metric {
    if from == 0.0 {
        return Metric::Undefined(UndefinedReason::ZeroBaseline);
    }
    Metric::finite((to - from) / from.abs() * 100.0)
}

/// Mean value of one (partner, flow) inside a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowMean {
    pub partner: Partner,
    pub flow: Flow,
    pub mean: f64,
    pub count: usize,
}

/// Export minus import for one partner inside a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartnerBalance {
    pub partner: Partner,
    pub balance: Metric,
}

/// Everything known about one period that has at least one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: Period,
    /// Present keys only, ordered by (partner, flow).
    pub flows: Vec<FlowMean>,
    /// One entry per partner in [`Partner::ALL`] order.
    pub balances: Vec<PartnerBalance>,
    /// Sum of the defined partner balances.
    pub total_balance: Metric,
}

impl PeriodSummary {
    pub fn mean(&self, partner: Partner, flow: Flow) -> Option<f64> {
        self.flows
            .iter()
            .find(|f| f.partner == partner && f.flow == flow)
            .map(|f| f.mean)
    }

    pub fn balance(&self, partner: Partner) -> Metric {
        self.balances
            .iter()
            .find(|b| b.partner == partner)
            .map(|b| b.balance)
            .unwrap_or(Metric::Undefined(UndefinedReason::NoData))
    }

    pub fn record_count(&self) -> usize {
        self.flows.iter().map(|f| f.count).sum()
    }
}

/// Percentage change of a (partner, flow) mean between two adjacent periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionDelta {
    pub from: Period,
    pub to: Period,
    pub partner: Partner,
    pub flow: Flow,
    pub change: Metric,
}

impl TransitionDelta {
    /// `pre-tariff_to_during-tariff` style label.
    pub fn key(&self) -> String {
        transition_key(self.from, self.to)
    }
}

pub fn transition_key(from: Period, to: Period) -> String {
    format!("{}_to_{}", from.slug(), to.slug())
}

/// Which balance a [`BalanceDelta`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceScope {
    Partner(Partner),
    Total,
}

impl fmt::Display for BalanceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceScope::Partner(p) => write!(f, "Colombia-{p} balance"),
            BalanceScope::Total => f.write_str("Total balance"),
        }
    }
}

/// Percentage change of a trade balance between two adjacent periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub from: Period,
    pub to: Period,
    pub scope: BalanceScope,
    pub change: Metric,
}

/// Full output of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Chronological; periods without records are omitted.
    pub summaries: Vec<PeriodSummary>,
    pub transitions: Vec<TransitionDelta>,
    pub balance_transitions: Vec<BalanceDelta>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    pub fn summary(&self, period: Period) -> Option<&PeriodSummary> {
        self.summaries.iter().find(|s| s.period == period)
    }

    pub fn periods(&self) -> Vec<Period> {
        self.summaries.iter().map(|s| s.period).collect()
    }

    pub fn transition(&self, from: Period, partner: Partner, flow: Flow) -> Option<&TransitionDelta> {
        self.transitions
            .iter()
            .find(|t| t.from == from && t.partner == partner && t.flow == flow)
    }

    pub fn balance_transition(&self, from: Period, scope: BalanceScope) -> Option<&BalanceDelta> {
        self.balance_transitions
            .iter()
            .find(|t| t.from == from && t.scope == scope)
    }

    /// Adjacent period pairs for which transitions were computed.
    pub fn transition_pairs(&self) -> Vec<(Period, Period)> {
        let mut pairs: Vec<(Period, Period)> =
            self.transitions.iter().map(|t| (t.from, t.to)).collect();
        pairs.dedup();
        pairs
    }
}

/// Reduces validated trade records to period-level statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    classifier: PeriodClassifier,
}

impl Aggregator {
    pub fn new(classifier: PeriodClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &PeriodClassifier {
        &self.classifier
    }

    /// Aggregate a batch of records.
    ///
    /// Fails on the first invalid record without producing partial output.
    /// An empty batch yields an empty [`Aggregation`].
    pub fn aggregate(&self, records: &[TradeRecord]) -> Result<Aggregation, ValidationError> {
        for record in records {
            record.validate()?;
        }

        // Running mean, finite whenever every input is.
        let mut groups: BTreeMap<(Period, Partner, Flow), (f64, usize)> = BTreeMap::new();
        for record in records {
            let period = self.classifier.classify(record.date);
            let (mean, count) = groups
                .entry((period, record.partner, record.flow))
                .or_insert((0.0, 0));
            *count += 1;
            *mean += (record.value - *mean) / *count as f64;
        }

        let mut by_period: BTreeMap<Period, Vec<FlowMean>> = BTreeMap::new();
        for ((period, partner, flow), (mean, count)) in groups {
            by_period.entry(period).or_default().push(FlowMean {
                partner,
                flow,
                mean,
                count,
            });
        }

        let summaries: Vec<PeriodSummary> = by_period
            .into_iter()
            .map(|(period, flows)| summarize_period(period, flows))
            .collect();

        let transitions = flow_transitions(&summaries);
        let balance_transitions = balance_transitions(&summaries);

        debug!(
            records = records.len(),
            periods = summaries.len(),
            transitions = transitions.len(),
            "aggregation complete"
        );

        Ok(Aggregation {
            summaries,
            transitions,
            balance_transitions,
        })
    }
}

fn summarize_period(period: Period, flows: Vec<FlowMean>) -> PeriodSummary {
    let find = |partner: Partner, flow: Flow| {
        flows
            .iter()
            .find(|f| f.partner == partner && f.flow == flow)
            .map(|f| f.mean)
    };

    let balances: Vec<PartnerBalance> = Partner::ALL
        .iter()
        .map(|&partner| {
            let balance = match (find(partner, Flow::Export), find(partner, Flow::Import)) {
                (Some(x), Some(m)) => Metric::Defined(x - m),
                (None, Some(_)) => Metric::Undefined(UndefinedReason::MissingExport),
                (Some(_), None) => Metric::Undefined(UndefinedReason::MissingImport),
                (None, None) => Metric::Undefined(UndefinedReason::NoData),
            };
            PartnerBalance { partner, balance }
        })
        .collect();

    let defined: Vec<f64> = balances.iter().filter_map(|b| b.balance.value()).collect();
    let total_balance = if defined.is_empty() {
        Metric::Undefined(UndefinedReason::NoDefinedBalance)
    } else {
        Metric::finite(defined.iter().sum())
    };

    PeriodSummary {
        period,
        flows,
        balances,
        total_balance,
    }
}

/// Consecutive period pairs, in the fixed five-period order, where both sides
/// have a summary.
///
/// An empty period is never skipped over: with no TrumpTariff data there is no
/// PreTariff to PostTariff change at all.
fn adjacent_pairs(summaries: &[PeriodSummary]) -> Vec<(&PeriodSummary, &PeriodSummary)> {
    Period::ALL
        .windows(2)
        .filter_map(|w| {
            let from = summaries.iter().find(|s| s.period == w[0])?;
            let to = summaries.iter().find(|s| s.period == w[1])?;
            Some((from, to))
        })
        .collect()
}

fn flow_transitions(summaries: &[PeriodSummary]) -> Vec<TransitionDelta> {
    let mut out = Vec::new();
    for (from, to) in adjacent_pairs(summaries) {
        for partner in Partner::ALL {
            for flow in Flow::ALL {
                let change = match (from.mean(partner, flow), to.mean(partner, flow)) {
                    (Some(a), Some(b)) => percent_change(a, b),
                    _ => Metric::Undefined(UndefinedReason::NoData),
                };
                out.push(TransitionDelta {
                    from: from.period,
                    to: to.period,
                    partner,
                    flow,
                    change,
                });
            }
        }
    }
    out
}

fn balance_transitions(summaries: &[PeriodSummary]) -> Vec<BalanceDelta> {
    let mut out = Vec::new();
    for (from, to) in adjacent_pairs(summaries) {
        let scopes = Partner::ALL
            .iter()
            .map(|&p| (BalanceScope::Partner(p), from.balance(p), to.balance(p)))
            .chain(std::iter::once((
                BalanceScope::Total,
                from.total_balance,
                to.total_balance,
            )));
        for (scope, a, b) in scopes {
            let change = match (a.value(), b.value()) {
                (Some(a), Some(b)) => percent_change_abs(a, b),
                _ => Metric::Undefined(UndefinedReason::UndefinedOperand),
            };
            out.push(BalanceDelta {
                from: from.period,
                to: to.period,
                scope,
                change,
            });
        }
    }
    out
}
