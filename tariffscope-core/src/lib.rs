//! TariffScope Core: trade records, period classification, aggregation, data acquisition.
//!
//! This crate contains the analytical heart of the tool:
//! - Domain types (reporter, partner, flow, validated trade records)
//! - Period classifier over the five tariff regimes
//! - Aggregator producing period summaries, balances and transition deltas
//! - Derived per-date series (balances, change from the pre-tariff baseline)
//! - Data providers (UN Comtrade, synthetic), CSV import/export and the Parquet cache

pub mod aggregate;
pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod period;
pub mod series;

pub use aggregate::{
    percent_change, percent_change_abs, transition_key, Aggregation, Aggregator, BalanceDelta,
    BalanceScope, FlowMean, Metric, PartnerBalance, PeriodSummary, TransitionDelta,
    UndefinedReason,
};
pub use domain::{Flow, Partner, Reporter, TradeRecord, ValidationError};
pub use fingerprint::dataset_hash;
pub use period::{Period, PeriodBoundaries, PeriodClassifier};
pub use series::{balance_series, relative_to_baseline, BalancePoint, RelativePoint};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything handed across threads by the runner is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<TradeRecord>();
        require_sync::<TradeRecord>();
        require_send::<PeriodClassifier>();
        require_sync::<PeriodClassifier>();
        require_send::<Aggregator>();
        require_sync::<Aggregator>();
        require_send::<Aggregation>();
        require_sync::<Aggregation>();
        require_send::<BalancePoint>();
        require_sync::<BalancePoint>();

        require_send::<data::ParquetCache>();
        require_sync::<data::ParquetCache>();
        require_send::<data::circuit_breaker::CircuitBreaker>();
        require_sync::<data::circuit_breaker::CircuitBreaker>();
        require_send::<data::comtrade::ComtradeProvider>();
        require_sync::<data::comtrade::ComtradeProvider>();
        require_send::<data::SyntheticGenerator>();
        require_sync::<data::SyntheticGenerator>();
        require_send::<data::DataError>();
    }

    /// Providers are usable as trait objects, so the loader can hold a mix of them.
    #[test]
    fn trade_provider_is_object_safe() {
        fn _check(provider: &dyn data::TradeProvider) -> bool {
            provider.is_available()
        }
        let synthetic = data::SyntheticGenerator::new(
            PeriodClassifier::default(),
            chrono::NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2016, 12, 31).unwrap(),
            data::DEFAULT_SEED,
        );
        assert!(_check(&synthetic));
    }
}
