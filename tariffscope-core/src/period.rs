//! Tariff periods and the date → period classifier.
//!
//! The five periods are half-open intervals `[start, next_start)` laid end to end.
//! The first is unbounded on the left and the last on the right, so every date maps
//! to exactly one period. A date equal to a boundary belongs to the period that
//! starts there.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::ValidationError;

/// One of the five tariff regimes, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    PreTariff,
    TrumpTariff,
    PostTariff,
    Universal2025Tariff,
    Post2025Agreement,
}

impl Period {
    /// All periods, earliest first.
    pub const ALL: [Period; 5] = [
        Period::PreTariff,
        Period::TrumpTariff,
        Period::PostTariff,
        Period::Universal2025Tariff,
        Period::Post2025Agreement,
    ];

    /// Zero-based chronological position.
    pub fn ordinal(&self) -> usize {
        match self {
            Period::PreTariff => 0,
            Period::TrumpTariff => 1,
            Period::PostTariff => 2,
            Period::Universal2025Tariff => 3,
            Period::Post2025Agreement => 4,
        }
    }

    /// The period immediately after this one, if any.
    pub fn next(&self) -> Option<Period> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// Stable identifier used in tables and transition keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Period::PreTariff => "pre-tariff",
            Period::TrumpTariff => "during-tariff",
            Period::PostTariff => "post-tariff",
            Period::Universal2025Tariff => "new-2025-tariff",
            Period::Post2025Agreement => "post-new-2025-tariff",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::PreTariff => "Pre-tariff",
            Period::TrumpTariff => "Trump tariffs",
            Period::PostTariff => "Post-tariff",
            Period::Universal2025Tariff => "2025 universal tariff",
            Period::Post2025Agreement => "Post-2025 US-China agreement",
        }
    }

    /// Inclusive start date under the given boundaries (`None` = unbounded).
    pub fn start(&self, b: &PeriodBoundaries) -> Option<NaiveDate> {
        match self {
            Period::PreTariff => None,
            Period::TrumpTariff => Some(b.trump_tariff_start),
            Period::PostTariff => Some(b.trump_tariff_end),
            Period::Universal2025Tariff => Some(b.universal_2025_start),
            Period::Post2025Agreement => Some(b.agreement_2025_start),
        }
    }

    /// Exclusive end date under the given boundaries (`None` = unbounded).
    pub fn end(&self, b: &PeriodBoundaries) -> Option<NaiveDate> {
        self.next().and_then(|p| p.start(b))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// The four dates separating the five periods.
///
/// Always strictly increasing; construction (including deserialization)
/// rejects anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBoundaries")]
pub struct PeriodBoundaries {
    trump_tariff_start: NaiveDate,
    trump_tariff_end: NaiveDate,
    universal_2025_start: NaiveDate,
    agreement_2025_start: NaiveDate,
}

#[derive(Deserialize)]
struct RawBoundaries {
    trump_tariff_start: NaiveDate,
    trump_tariff_end: NaiveDate,
    universal_2025_start: NaiveDate,
    agreement_2025_start: NaiveDate,
}

impl TryFrom<RawBoundaries> for PeriodBoundaries {
    type Error = ValidationError;

    fn try_from(raw: RawBoundaries) -> Result<Self, Self::Error> {
        Self::new(
            raw.trump_tariff_start,
            raw.trump_tariff_end,
            raw.universal_2025_start,
            raw.agreement_2025_start,
        )
    }
}

impl PeriodBoundaries {
    pub fn new(
        trump_tariff_start: NaiveDate,
        trump_tariff_end: NaiveDate,
        universal_2025_start: NaiveDate,
        agreement_2025_start: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let dates = [
            trump_tariff_start,
            trump_tariff_end,
            universal_2025_start,
            agreement_2025_start,
        ];
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ValidationError::InvalidBoundaries(format!(
                "boundaries must be strictly increasing, got {} then {}",
                w[0], w[1]
            )));
        }
        Ok(Self {
            trump_tariff_start,
            trump_tariff_end,
            universal_2025_start,
            agreement_2025_start,
        })
    }

    pub fn trump_tariff_start(&self) -> NaiveDate {
        self.trump_tariff_start
    }

    pub fn trump_tariff_end(&self) -> NaiveDate {
        self.trump_tariff_end
    }

    pub fn universal_2025_start(&self) -> NaiveDate {
        self.universal_2025_start
    }

    pub fn agreement_2025_start(&self) -> NaiveDate {
        self.agreement_2025_start
    }

    /// Boundaries in order, each paired with the period it opens.
    pub fn markers(&self) -> [(NaiveDate, Period); 4] {
        [
            (self.trump_tariff_start, Period::TrumpTariff),
            (self.trump_tariff_end, Period::PostTariff),
            (self.universal_2025_start, Period::Universal2025Tariff),
            (self.agreement_2025_start, Period::Post2025Agreement),
        ]
    }
}

impl Default for PeriodBoundaries {
    /// Steel/aluminium tariffs (2018-03-01), end of the Trump administration
    /// (2021-01-20), 10% universal reciprocal tariff (2025-04-05), and the
    /// 90-day US-China reduction (2025-05-13).
    fn default() -> Self {
        Self {
            trump_tariff_start: ymd(2018, 3, 1),
            trump_tariff_end: ymd(2021, 1, 20),
            universal_2025_start: ymd(2025, 4, 5),
            agreement_2025_start: ymd(2025, 5, 13),
        }
    }
}

/// Only for the hard-coded boundary constants above.
fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    let date = NaiveDate::from_ymd_opt(y, m, d);
    debug_assert!(date.is_some(), "invalid boundary constant {y}-{m:02}-{d:02}");
    date.unwrap_or(NaiveDate::MIN)
}

/// Maps dates to periods using a fixed set of boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodClassifier {
    boundaries: PeriodBoundaries,
}

impl PeriodClassifier {
    pub fn new(boundaries: PeriodBoundaries) -> Self {
        Self { boundaries }
    }

    pub fn boundaries(&self) -> &PeriodBoundaries {
        &self.boundaries
    }

    pub fn classify(&self, date: NaiveDate) -> Period {
        self.boundaries
            .markers()
            .iter()
            .rev()
            .find(|(start, _)| date >= *start)
            .map(|(_, period)| *period)
            .unwrap_or(Period::PreTariff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_boundary_dates() {
        let b = PeriodBoundaries::default();
        assert_eq!(b.trump_tariff_start(), ymd(2018, 3, 1));
        assert_eq!(b.trump_tariff_end(), ymd(2021, 1, 20));
        assert_eq!(b.universal_2025_start(), ymd(2025, 4, 5));
        assert_eq!(b.agreement_2025_start(), ymd(2025, 5, 13));
    }

    #[test]
    fn boundary_day_belongs_to_later_period() {
        let c = PeriodClassifier::default();
        assert_eq!(c.classify(ymd(2018, 2, 28)), Period::PreTariff);
        assert_eq!(c.classify(ymd(2018, 3, 1)), Period::TrumpTariff);
        assert_eq!(c.classify(ymd(2021, 1, 19)), Period::TrumpTariff);
        assert_eq!(c.classify(ymd(2021, 1, 20)), Period::PostTariff);
        assert_eq!(c.classify(ymd(2025, 4, 4)), Period::PostTariff);
        assert_eq!(c.classify(ymd(2025, 4, 5)), Period::Universal2025Tariff);
        assert_eq!(c.classify(ymd(2025, 5, 12)), Period::Universal2025Tariff);
        assert_eq!(c.classify(ymd(2025, 5, 13)), Period::Post2025Agreement);
    }

    #[test]
    fn extremes_are_open() {
        let c = PeriodClassifier::default();
        assert_eq!(c.classify(ymd(1990, 1, 1)), Period::PreTariff);
        assert_eq!(c.classify(NaiveDate::MIN), Period::PreTariff);
        assert_eq!(c.classify(ymd(2099, 12, 31)), Period::Post2025Agreement);
        assert_eq!(c.classify(NaiveDate::MAX), Period::Post2025Agreement);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "invalid boundary constant")]
    fn mistyped_boundary_constant_panics_in_debug() {
        ymd(2025, 2, 30);
    }

    #[test]
    fn rejects_non_increasing_boundaries() {
        let err = PeriodBoundaries::new(
            ymd(2018, 3, 1),
            ymd(2018, 3, 1),
            ymd(2025, 4, 5),
            ymd(2025, 5, 13),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidBoundaries(_)));
    }

    #[test]
    fn custom_boundaries_shift_classification() {
        let b = PeriodBoundaries::new(
            ymd(2010, 1, 1),
            ymd(2011, 1, 1),
            ymd(2012, 1, 1),
            ymd(2013, 1, 1),
        )
        .unwrap();
        let c = PeriodClassifier::new(b);
        assert_eq!(c.classify(ymd(2012, 6, 1)), Period::Universal2025Tariff);
        assert_eq!(c.classify(ymd(2017, 6, 1)), Period::Post2025Agreement);
    }

    #[test]
    fn start_and_end_chain() {
        let b = PeriodBoundaries::default();
        assert_eq!(Period::PreTariff.start(&b), None);
        assert_eq!(Period::PreTariff.end(&b), Some(ymd(2018, 3, 1)));
        assert_eq!(Period::Post2025Agreement.end(&b), None);
        for pair in Period::ALL.windows(2) {
            assert_eq!(pair[0].end(&b), pair[1].start(&b));
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: PeriodBoundaries = serde_json::from_str(
            r#"{"trump_tariff_start":"2018-03-01","trump_tariff_end":"2021-01-20",
                "universal_2025_start":"2025-04-05","agreement_2025_start":"2025-05-13"}"#,
        )
        .unwrap();
        assert_eq!(ok, PeriodBoundaries::default());

        let bad = serde_json::from_str::<PeriodBoundaries>(
            r#"{"trump_tariff_start":"2021-03-01","trump_tariff_end":"2018-01-20",
                "universal_2025_start":"2025-04-05","agreement_2025_start":"2025-05-13"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn slugs_are_stable() {
        let slugs: Vec<_> = Period::ALL.iter().map(|p| p.slug()).collect();
        assert_eq!(
            slugs,
            [
                "pre-tariff",
                "during-tariff",
                "post-tariff",
                "new-2025-tariff",
                "post-new-2025-tariff"
            ]
        );
    }
}
