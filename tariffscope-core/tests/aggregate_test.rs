//! End-to-end aggregation scenarios over the public API.

use chrono::NaiveDate;
use tariffscope_core::{
    transition_key, Aggregator, BalanceScope, Flow, Metric, Partner, Period, PeriodBoundaries,
    PeriodClassifier, TradeRecord, UndefinedReason, ValidationError,
};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn rec(date: NaiveDate, partner: Partner, flow: Flow, value: f64) -> TradeRecord {
    TradeRecord::new(date, partner, flow, value).unwrap()
}

#[test]
fn three_record_scenario() {
    let records = [
        rec(ymd(2017, 6, 1), Partner::Usa, Flow::Export, 1200.0),
        rec(ymd(2019, 6, 1), Partner::Usa, Flow::Export, 1220.0),
        rec(ymd(2019, 6, 1), Partner::Usa, Flow::Import, 1500.0),
    ];
    let agg = Aggregator::default().aggregate(&records).unwrap();

    let pre = agg.summary(Period::PreTariff).unwrap();
    assert_eq!(pre.mean(Partner::Usa, Flow::Export), Some(1200.0));
    assert_eq!(pre.mean(Partner::Usa, Flow::Import), None);

    let trump = agg.summary(Period::TrumpTariff).unwrap();
    assert_eq!(trump.mean(Partner::Usa, Flow::Export), Some(1220.0));
    assert_eq!(trump.mean(Partner::Usa, Flow::Import), Some(1500.0));
    assert_eq!(trump.balance(Partner::Usa), Metric::Defined(-280.0));

    let delta = agg
        .transition(Period::PreTariff, Partner::Usa, Flow::Export)
        .unwrap();
    assert_eq!(delta.to, Period::TrumpTariff);
    let pct = delta.change.value().unwrap();
    assert!((pct - 1.6666666).abs() < 1e-4, "got {pct}");
    assert_eq!(format!("{pct:.3}"), "1.667");
}

#[test]
fn balance_sign_is_export_minus_import() {
    let records = [
        rec(ymd(2016, 5, 31), Partner::Usa, Flow::Export, 100.0),
        rec(ymd(2016, 5, 31), Partner::Usa, Flow::Import, 150.0),
    ];
    let agg = Aggregator::default().aggregate(&records).unwrap();
    let pre = agg.summary(Period::PreTariff).unwrap();
    assert_eq!(pre.balance(Partner::Usa), Metric::Defined(-50.0));
    assert_eq!(pre.total_balance, Metric::Defined(-50.0));
}

#[test]
fn zero_earlier_mean_gives_undefined_change() {
    let records = [
        rec(ymd(2016, 5, 31), Partner::China, Flow::Export, 0.0),
        rec(ymd(2019, 5, 31), Partner::China, Flow::Export, 25.0),
    ];
    let agg = Aggregator::default().aggregate(&records).unwrap();
    let delta = agg
        .transition(Period::PreTariff, Partner::China, Flow::Export)
        .unwrap();
    assert_eq!(
        delta.change,
        Metric::Undefined(UndefinedReason::ZeroBaseline)
    );
}

#[test]
fn zero_valued_key_is_present_but_missing_key_is_absent() {
    let records = [rec(ymd(2016, 5, 31), Partner::China, Flow::Export, 0.0)];
    let agg = Aggregator::default().aggregate(&records).unwrap();
    let pre = agg.summary(Period::PreTariff).unwrap();
    assert_eq!(pre.mean(Partner::China, Flow::Export), Some(0.0));
    assert_eq!(pre.mean(Partner::China, Flow::Import), None);
    assert!(agg.summary(Period::TrumpTariff).is_none());
}

#[test]
fn boundary_dates_are_inclusive_in_aggregation() {
    let records = [
        rec(ymd(2018, 2, 28), Partner::Usa, Flow::Export, 10.0),
        rec(ymd(2018, 3, 1), Partner::Usa, Flow::Export, 20.0),
    ];
    let agg = Aggregator::default().aggregate(&records).unwrap();
    assert_eq!(
        agg.summary(Period::PreTariff).unwrap().mean(Partner::Usa, Flow::Export),
        Some(10.0)
    );
    assert_eq!(
        agg.summary(Period::TrumpTariff).unwrap().mean(Partner::Usa, Flow::Export),
        Some(20.0)
    );
}

#[test]
fn custom_boundaries_change_grouping() {
    let boundaries =
        PeriodBoundaries::new(ymd(2017, 1, 1), ymd(2018, 1, 1), ymd(2019, 1, 1), ymd(2020, 1, 1))
            .unwrap();
    let agg = Aggregator::new(PeriodClassifier::new(boundaries));
    let records = [rec(ymd(2017, 6, 1), Partner::Usa, Flow::Export, 1200.0)];
    let out = agg.aggregate(&records).unwrap();
    assert_eq!(out.periods(), vec![Period::TrumpTariff]);
}

#[test]
fn full_chain_of_transitions() {
    let mut records = Vec::new();
    for (i, date) in [
        ymd(2017, 1, 31),
        ymd(2019, 1, 31),
        ymd(2022, 1, 31),
        ymd(2025, 4, 30),
        ymd(2025, 6, 30),
    ]
    .into_iter()
    .enumerate()
    {
        for partner in Partner::ALL {
            for flow in Flow::ALL {
                records.push(rec(date, partner, flow, 100.0 + i as f64 * 10.0));
            }
        }
    }
    let agg = Aggregator::default().aggregate(&records).unwrap();
    assert_eq!(agg.summaries.len(), 5);
    assert_eq!(agg.transitions.len(), 4 * 4);
    assert_eq!(agg.balance_transitions.len(), 4 * 3);
    assert_eq!(
        agg.transition_pairs()
            .into_iter()
            .map(|(a, b)| transition_key(a, b))
            .collect::<Vec<_>>(),
        vec![
            "pre-tariff_to_during-tariff",
            "during-tariff_to_post-tariff",
            "post-tariff_to_new-2025-tariff",
            "new-2025-tariff_to_post-new-2025-tariff",
        ]
    );
    // Balances are zero everywhere, so every balance change has a zero baseline.
    let total = agg
        .balance_transition(Period::PreTariff, BalanceScope::Total)
        .unwrap();
    assert_eq!(total.change, Metric::Undefined(UndefinedReason::ZeroBaseline));
}

#[test]
fn validation_error_is_propagated() {
    let mut bad = rec(ymd(2019, 1, 31), Partner::Usa, Flow::Import, 1.0);
    bad.value = f64::NAN;
    let err = Aggregator::default()
        .aggregate(&[rec(ymd(2019, 1, 31), Partner::Usa, Flow::Export, 1.0), bad])
        .unwrap_err();
    assert!(matches!(err, ValidationError::NonFiniteValue { .. }));
}

#[test]
fn undefined_serializes_as_marker_not_zero() {
    let records = [rec(ymd(2016, 5, 31), Partner::Usa, Flow::Export, 100.0)];
    let agg = Aggregator::default().aggregate(&records).unwrap();
    let json = serde_json::to_value(&agg).unwrap();
    let balance = &json["summaries"][0]["balances"][0]["balance"];
    assert_eq!(balance["undefined"], "missing_import");
}
