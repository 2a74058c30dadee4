//! Domain types for tariffscope

pub mod error;
pub mod record;

pub use error::ValidationError;
pub use record::{parse_date, Flow, Partner, Reporter, TradeRecord};
