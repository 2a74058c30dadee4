//! Trade records: one monthly observation per (date, partner, flow).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Reporting country. Every observation is reported from Colombia's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reporter {
    Colombia,
}

impl Reporter {
    /// UN Comtrade numeric country code.
    pub fn comtrade_code(&self) -> u32 {
        match self {
            Reporter::Colombia => 170,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Reporter::Colombia => "colombia",
        }
    }
}

impl fmt::Display for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Colombia")
    }
}

impl FromStr for Reporter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "colombia" | "col" | "co" | "170" => Ok(Reporter::Colombia),
            _ => Err(ValidationError::UnknownReporter(s.to_string())),
        }
    }
}

/// Trading partner of the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partner {
    Usa,
    China,
}

impl Partner {
    pub const ALL: [Partner; 2] = [Partner::Usa, Partner::China];

    /// UN Comtrade numeric country code.
    pub fn comtrade_code(&self) -> u32 {
        match self {
            Partner::Usa => 842,
            Partner::China => 156,
        }
    }

    /// Lowercase identifier used in file names and wide-format column names.
    pub fn slug(&self) -> &'static str {
        match self {
            Partner::Usa => "us",
            Partner::China => "china",
        }
    }

    /// Short code used in chart axis labels.
    pub fn short_code(&self) -> &'static str {
        match self {
            Partner::Usa => "US",
            Partner::China => "CHN",
        }
    }
}

impl fmt::Display for Partner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partner::Usa => f.write_str("USA"),
            Partner::China => f.write_str("China"),
        }
    }
}

impl FromStr for Partner {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usa" | "us" | "united states" | "united_states" | "842" => Ok(Partner::Usa),
            "china" | "chn" | "cn" | "156" => Ok(Partner::China),
            _ => Err(ValidationError::UnknownPartner(s.to_string())),
        }
    }
}

/// Direction of trade relative to Colombia.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Goods leaving Colombia for the partner.
    Export,
    /// Goods arriving in Colombia from the partner.
    Import,
}

impl Flow {
    pub const ALL: [Flow; 2] = [Flow::Export, Flow::Import];

    pub fn slug(&self) -> &'static str {
        match self {
            Flow::Export => "export",
            Flow::Import => "import",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Export => f.write_str("Export"),
            Flow::Import => f.write_str("Import"),
        }
    }
}

impl FromStr for Flow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "export" | "exports" | "x" => Ok(Flow::Export),
            "import" | "imports" | "m" => Ok(Flow::Import),
            _ => Err(ValidationError::UnknownFlow(s.to_string())),
        }
    }
}

/// One observed trade value for a (date, partner, flow).
///
/// `value` is in millions of USD. Records are produced by the acquisition
/// layer and only ever read downstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub reporter: Reporter,
    pub partner: Partner,
    pub flow: Flow,
    pub value: f64,
}

impl TradeRecord {
    /// Build a Colombia-reported record, rejecting negative or non-finite values.
    pub fn new(
        date: NaiveDate,
        partner: Partner,
        flow: Flow,
        value: f64,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            date,
            reporter: Reporter::Colombia,
            partner,
            flow,
            value,
        };
        record.validate()?;
        Ok(record)
    }

    /// Sanity check applied at every boundary that accepts records.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.value.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                date: self.date,
                partner: self.partner,
                flow: self.flow,
            });
        }
        if self.value < 0.0 {
            return Err(ValidationError::NegativeValue {
                date: self.date,
                partner: self.partner,
                flow: self.flow,
                value: self.value,
            });
        }
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` date, also accepting a trailing time component
/// (`2016-01-31 00:00:00`) as written by dataframe tools.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = s.trim();
    let date_part = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| ValidationError::UnparseableDate(s.to_string()))
}
