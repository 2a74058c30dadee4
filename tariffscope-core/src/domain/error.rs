//! Validation errors raised at the data-model boundary.

use chrono::NaiveDate;
use thiserror::Error;

use super::record::{Flow, Partner};

/// A record or configuration value failed a sanity check.
///
/// Aggregation aborts on the first one of these; nothing is partially summarised.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("negative trade value {value} for {partner} {flow} on {date}")]
    NegativeValue {
        date: NaiveDate,
        partner: Partner,
        flow: Flow,
        value: f64,
    },

    #[error("non-finite trade value for {partner} {flow} on {date}")]
    NonFiniteValue {
        date: NaiveDate,
        partner: Partner,
        flow: Flow,
    },

    #[error("unparseable date '{0}' (expected YYYY-MM-DD)")]
    UnparseableDate(String),

    #[error("unknown reporter '{0}'")]
    UnknownReporter(String),

    #[error("unknown partner '{0}'")]
    UnknownPartner(String),

    #[error("unknown flow '{0}'")]
    UnknownFlow(String),

    #[error("invalid period boundaries: {0}")]
    InvalidBoundaries(String),
}
