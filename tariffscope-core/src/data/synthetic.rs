//! Synthetic Colombia trade data for offline runs and demos.
//!
//! One record per month-end date per (partner, flow). Each series follows a
//! linear growth trend from its base value, scaled by a random multiplier drawn
//! from a period-specific band, then by ±5% noise. The same seed always yields
//! the same records.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::month_end;
use super::provider::{DataError, DataSource, FetchResult, TradeProvider};
use crate::domain::{Flow, Partner, Reporter, TradeRecord};
use crate::period::{Period, PeriodClassifier};

pub const DEFAULT_SEED: u64 = 42;

/// Multiplier band `[low, low + span)` applied to a series during one period.
#[derive(Debug, Clone, Copy)]
struct Effect {
    period: Period,
    low: f64,
    span: f64,
}

#[derive(Debug, Clone)]
struct SeriesProfile {
    partner: Partner,
    flow: Flow,
    /// Millions USD at the start of the window.
    base: f64,
    /// Fractional growth across the whole window.
    trend: f64,
    effects: [Effect; 3],
}

const fn effect(period: Period, low: f64, span: f64) -> Effect {
    Effect { period, low, span }
}

fn series_profiles() -> [SeriesProfile; 4] {
    [
        // US tariffs dampen Colombian exports; recovery after the agreement.
        SeriesProfile {
            partner: Partner::Usa,
            flow: Flow::Export,
            base: 1200.0,
            trend: 0.2,
            effects: [
                effect(Period::TrumpTariff, 0.9, 0.1),
                effect(Period::Universal2025Tariff, 0.85, 0.05),
                effect(Period::Post2025Agreement, 1.03, 0.02),
            ],
        },
        // Retaliatory measures on US goods.
        SeriesProfile {
            partner: Partner::Usa,
            flow: Flow::Import,
            base: 1500.0,
            trend: 0.15,
            effects: [
                effect(Period::TrumpTariff, 0.92, 0.08),
                effect(Period::Universal2025Tariff, 0.88, 0.07),
                effect(Period::Post2025Agreement, 1.02, 0.03),
            ],
        },
        // Trade diverted towards China.
        SeriesProfile {
            partner: Partner::China,
            flow: Flow::Export,
            base: 500.0,
            trend: 0.3,
            effects: [
                effect(Period::TrumpTariff, 1.15, 0.1),
                effect(Period::Universal2025Tariff, 1.25, 0.15),
                effect(Period::Post2025Agreement, 0.97, 0.05),
            ],
        },
        SeriesProfile {
            partner: Partner::China,
            flow: Flow::Import,
            base: 1000.0,
            trend: 0.4,
            effects: [
                effect(Period::TrumpTariff, 1.2, 0.1),
                effect(Period::Universal2025Tariff, 1.3, 0.12),
                effect(Period::Post2025Agreement, 0.95, 0.08),
            ],
        },
    ]
}

/// Month-end dates in `[start, end]`.
pub fn month_ends(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while let Some(date) = month_end(year, month) {
        if date > end {
            break;
        }
        if date >= start {
            dates.push(date);
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    dates
}

/// Deterministic generator of plausible monthly trade records.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    classifier: PeriodClassifier,
    start: NaiveDate,
    end: NaiveDate,
    seed: u64,
}

impl SyntheticGenerator {
    pub fn new(classifier: PeriodClassifier, start: NaiveDate, end: NaiveDate, seed: u64) -> Self {
        Self {
            classifier,
            start,
            end,
            seed,
        }
    }

    /// Records ordered by date, then (partner, flow) in declaration order.
    pub fn generate(&self) -> Vec<TradeRecord> {
        let dates = month_ends(self.start, self.end);
        let n = dates.len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let profiles = series_profiles();

        let columns: Vec<Vec<f64>> = profiles
            .iter()
            .map(|profile| {
                dates
                    .iter()
                    .enumerate()
                    .map(|(i, &date)| {
                        let time_factor = i as f64 / n as f64;
                        let mut value = profile.base * (1.0 + profile.trend * time_factor);
                        let period = self.classifier.classify(date);
                        if let Some(e) = profile.effects.iter().find(|e| e.period == period) {
                            value *= e.low + e.span * rng.gen::<f64>();
                        }
                        value
                    })
                    .collect()
            })
            .collect();

        let mut records = Vec::with_capacity(n * profiles.len());
        for (i, &date) in dates.iter().enumerate() {
            for (profile, column) in profiles.iter().zip(&columns) {
                let noise = 0.95 + 0.1 * rng.gen::<f64>();
                records.push(TradeRecord {
                    date,
                    reporter: Reporter::Colombia,
                    partner: profile.partner,
                    flow: profile.flow,
                    value: column[i] * noise,
                });
            }
        }
        records
    }
}

impl TradeProvider for SyntheticGenerator {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        partner: Partner,
        start_year: i32,
        end_year: i32,
    ) -> Result<FetchResult, DataError> {
        let records: Vec<TradeRecord> = self
            .generate()
            .into_iter()
            .filter(|r| r.partner == partner)
            .filter(|r| (start_year..=end_year).contains(&r.date.year()))
            .collect();
        if records.is_empty() {
            return Err(DataError::NoData {
                partner,
                start_year,
                end_year,
            });
        }
        Ok(FetchResult {
            partner,
            records,
            source: DataSource::Synthetic,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
