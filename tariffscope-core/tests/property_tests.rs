//! Property tests for classification and aggregation invariants.
//!
//! Uses proptest to verify:
//! 1. Total coverage: every date lands in exactly one period interval
//! 2. Boundary inclusivity: a boundary date belongs to the period it opens
//! 3. Idempotence: aggregating the same batch twice gives identical output
//! 4. Scale invariance: multiplying every value by k > 0 leaves percentages unchanged
//! 5. Mean bounds: every period mean lies between the group's min and max

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use tariffscope_core::{
    Aggregator, Flow, Metric, Partner, Period, PeriodBoundaries, PeriodClassifier, TradeRecord,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    // 2010-01-01 .. ~2030
    (0i64..7300).prop_map(|d| NaiveDate::from_ymd_opt(2010, 1, 1).unwrap() + Duration::days(d))
}

fn arb_partner() -> impl Strategy<Value = Partner> {
    prop_oneof![Just(Partner::Usa), Just(Partner::China)]
}

fn arb_flow() -> impl Strategy<Value = Flow> {
    prop_oneof![Just(Flow::Export), Just(Flow::Import)]
}

fn arb_record() -> impl Strategy<Value = TradeRecord> {
    (arb_date(), arb_partner(), arb_flow(), 1.0..5000.0_f64)
        .prop_map(|(date, partner, flow, value)| TradeRecord::new(date, partner, flow, value).unwrap())
}

fn arb_boundaries() -> impl Strategy<Value = PeriodBoundaries> {
    (0i64..2000, 1i64..2000, 1i64..2000, 1i64..2000).prop_map(|(a, b, c, d)| {
        let base = NaiveDate::from_ymd_opt(2012, 1, 1).unwrap();
        let t1 = base + Duration::days(a);
        let t2 = t1 + Duration::days(b);
        let t3 = t2 + Duration::days(c);
        let t4 = t3 + Duration::days(d);
        PeriodBoundaries::new(t1, t2, t3, t4).unwrap()
    })
}

fn in_interval(period: Period, b: &PeriodBoundaries, date: NaiveDate) -> bool {
    period.start(b).map_or(true, |s| date >= s) && period.end(b).map_or(true, |e| date < e)
}

// ── 1. Total coverage ────────────────────────────────────────────────

proptest! {
    #[test]
    fn every_date_in_exactly_one_interval(date in arb_date(), b in arb_boundaries()) {
        let classifier = PeriodClassifier::new(b);
        let containing: Vec<Period> = Period::ALL
            .into_iter()
            .filter(|p| in_interval(*p, &b, date))
            .collect();
        prop_assert_eq!(containing.len(), 1);
        prop_assert_eq!(classifier.classify(date), containing[0]);
    }

    #[test]
    fn classification_is_monotone(a in arb_date(), b in arb_date()) {
        let c = PeriodClassifier::default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(c.classify(lo) <= c.classify(hi));
    }
}

// ── 2. Boundary inclusivity ──────────────────────────────────────────

proptest! {
    #[test]
    fn boundary_opens_its_period(b in arb_boundaries()) {
        let classifier = PeriodClassifier::new(b);
        for (start, period) in b.markers() {
            prop_assert_eq!(classifier.classify(start), period);
            let before = start.pred_opt().unwrap();
            prop_assert_eq!(classifier.classify(before).next(), Some(period));
        }
    }
}

// ── 3-5. Aggregation ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn aggregate_is_idempotent(records in prop::collection::vec(arb_record(), 0..200)) {
        let agg = Aggregator::default();
        let first = agg.aggregate(&records).unwrap();
        let second = agg.aggregate(&records).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn counts_cover_every_record(records in prop::collection::vec(arb_record(), 0..200)) {
        let agg = Aggregator::default().aggregate(&records).unwrap();
        let counted: usize = agg.summaries.iter().map(|s| s.record_count()).sum();
        prop_assert_eq!(counted, records.len());
    }

    #[test]
    fn percentages_are_scale_invariant(
        records in prop::collection::vec(arb_record(), 1..120),
        k in 0.5..20.0_f64,
    ) {
        let scaled: Vec<TradeRecord> = records
            .iter()
            .map(|r| TradeRecord { value: r.value * k, ..*r })
            .collect();
        let agg = Aggregator::default();
        let a = agg.aggregate(&records).unwrap();
        let b = agg.aggregate(&scaled).unwrap();
        prop_assert_eq!(a.transitions.len(), b.transitions.len());
        for (x, y) in a.transitions.iter().zip(&b.transitions) {
            match (x.change, y.change) {
                (Metric::Defined(p), Metric::Defined(q)) => prop_assert!((p - q).abs() < 1e-6 * p.abs().max(1.0)),
                (Metric::Undefined(r1), Metric::Undefined(r2)) => prop_assert_eq!(r1, r2),
                other => prop_assert!(false, "definedness changed: {:?}", other),
            }
        }
    }

    #[test]
    fn means_within_group_bounds(records in prop::collection::vec(arb_record(), 1..200)) {
        let aggregator = Aggregator::default();
        let classifier = *aggregator.classifier();
        let agg = aggregator.aggregate(&records).unwrap();
        for summary in &agg.summaries {
            for fm in &summary.flows {
                let values: Vec<f64> = records
                    .iter()
                    .filter(|r| classifier.classify(r.date) == summary.period
                        && r.partner == fm.partner
                        && r.flow == fm.flow)
                    .map(|r| r.value)
                    .collect();
                prop_assert_eq!(values.len(), fm.count);
                let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(fm.mean >= min - 1e-9 && fm.mean <= max + 1e-9);
            }
        }
    }
}
