//! Property tests for configuration parsing.
//!
//! 1. Any valid configuration survives a TOML round trip unchanged
//! 2. Boundaries out of order are rejected, whichever pair is swapped

use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use tariffscope_runner::{AnalysisConfig, ConfigError, SourceKind};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_increasing_dates() -> impl Strategy<Value = [NaiveDate; 4]> {
    (0i64..3000, 1i64..1500, 1i64..1500, 1i64..1500).prop_map(|(a, b, c, d)| {
        let t1 = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap() + Duration::days(a);
        let t2 = t1 + Duration::days(b);
        let t3 = t2 + Duration::days(c);
        [t1, t2, t3, t3 + Duration::days(d)]
    })
}

fn arb_source() -> impl Strategy<Value = SourceKind> {
    prop_oneof![
        Just(SourceKind::Synthetic),
        Just(SourceKind::Csv),
        Just(SourceKind::Comtrade),
    ]
}

fn arb_config() -> impl Strategy<Value = AnalysisConfig> {
    (
        arb_increasing_dates(),
        arb_source(),
        "[a-z]{1,8}/[a-z]{1,8}\\.csv",
        any::<bool>(),
        any::<bool>(),
        // TOML integers are signed 64-bit.
        0..=i64::MAX as u64,
        "[ -~]{0,40}",
    )
        .prop_map(|(dates, source, csv, offline, charts, seed, title)| {
            let mut config = AnalysisConfig::default();
            config.periods.trump_tariff_start = dates[0];
            config.periods.trump_tariff_end = dates[1];
            config.periods.universal_2025_start = dates[2];
            config.periods.agreement_2025_start = dates[3];
            config.periods.analysis_start = dates[0] - Duration::days(365);
            config.periods.analysis_end = dates[3];
            config.data.source = source;
            config.data.csv_path = Some(PathBuf::from(csv));
            config.data.offline = offline;
            config.data.seed = seed;
            config.report.charts = charts;
            config.report.title = title;
            config
        })
}

// ── 1. Round trip ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn valid_config_roundtrips_through_toml(config in arb_config()) {
        let text = config.to_toml().unwrap();
        let back = AnalysisConfig::from_toml(&text).unwrap();
        prop_assert_eq!(back, config);
    }
}

// ── 2. Boundary ordering ─────────────────────────────────────────────

proptest! {
    #[test]
    fn swapped_boundaries_are_rejected(dates in arb_increasing_dates(), pair in 0usize..3) {
        let mut swapped = dates;
        swapped.swap(pair, pair + 1);
        let toml = format!(
            "[periods]\n\
             trump_tariff_start = \"{}\"\n\
             trump_tariff_end = \"{}\"\n\
             universal_2025_start = \"{}\"\n\
             agreement_2025_start = \"{}\"\n",
            swapped[0], swapped[1], swapped[2], swapped[3]
        );
        let result = AnalysisConfig::from_toml(&toml);
        prop_assert!(matches!(result, Err(ConfigError::Boundaries(_))));
    }
}
