//! CSV import and export of trade records.
//!
//! Two layouts are read:
//! - **long**: `date,reporter,partner,flow,value`, one record per row (also what we write)
//! - **wide**: `date,colombia_us_exports,colombia_us_imports,colombia_china_exports,
//!   colombia_china_imports`, one month per row; extra columns such as `period` or
//!   `time_factor` are ignored and empty cells are treated as missing

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use super::provider::DataError;
use crate::domain::{parse_date, Flow, Partner, Reporter, TradeRecord, ValidationError};

const LONG_HEADER: [&str; 5] = ["date", "reporter", "partner", "flow", "value"];

fn wide_column(partner: Partner, flow: Flow) -> String {
    format!("colombia_{}_{}s", partner.slug(), flow.slug())
}

fn csv_err(e: csv::Error) -> DataError {
    DataError::Csv(e.to_string())
}

/// Read records from a CSV file, detecting the layout from its header.
pub fn read_records_csv(path: &Path) -> Result<Vec<TradeRecord>, DataError> {
    let file = File::open(path)
        .map_err(|e| DataError::Csv(format!("open {}: {e}", path.display())))?;
    let records = read_records_from(file)?;
    debug!(path = %path.display(), records = records.len(), "read trade csv");
    Ok(records)
}

pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<TradeRecord>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let index = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let date_col = index("date")
        .ok_or_else(|| DataError::Csv("missing required column 'date'".into()))?;

    if let (Some(partner_col), Some(flow_col), Some(value_col)) =
        (index("partner"), index("flow"), index("value"))
    {
        let reporter_col = index("reporter");
        let mut out = Vec::new();
        for row in rdr.records() {
            let row = row.map_err(csv_err)?;
            out.push(parse_long_row(&row, date_col, reporter_col, partner_col, flow_col, value_col)?);
        }
        return Ok(out);
    }

    let wide_cols: Vec<(Partner, Flow, usize)> = Partner::ALL
        .iter()
        .flat_map(|&p| Flow::ALL.iter().map(move |&f| (p, f)))
        .filter_map(|(p, f)| index(&wide_column(p, f)).map(|i| (p, f, i)))
        .collect();
    if wide_cols.is_empty() {
        return Err(DataError::Csv(
            "unrecognised layout: expected partner/flow/value or colombia_<partner>_<flow>s columns"
                .into(),
        ));
    }

    let mut out = Vec::new();
    for row in rdr.records() {
        let row = row.map_err(csv_err)?;
        let date = parse_date(field(&row, date_col)?)?;
        for &(partner, flow, col) in &wide_cols {
            let cell = field(&row, col)?;
            if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                continue;
            }
            out.push(TradeRecord::new(date, partner, flow, parse_value(cell)?)?);
        }
    }
    Ok(out)
}

fn field<'a>(row: &'a StringRecord, col: usize) -> Result<&'a str, DataError> {
    row.get(col)
        .ok_or_else(|| DataError::Csv(format!("row has no column {col}: {row:?}")))
}

fn parse_value(cell: &str) -> Result<f64, DataError> {
    cell.parse::<f64>()
        .map_err(|_| DataError::Csv(format!("unparseable value '{cell}'")))
}

fn parse_long_row(
    row: &StringRecord,
    date_col: usize,
    reporter_col: Option<usize>,
    partner_col: usize,
    flow_col: usize,
    value_col: usize,
) -> Result<TradeRecord, DataError> {
    let date = parse_date(field(row, date_col)?)?;
    if let Some(col) = reporter_col {
        let _: Reporter = field(row, col)?.parse()?;
    }
    let partner: Partner = field(row, partner_col)?.parse()?;
    let flow: Flow = field(row, flow_col)?.parse()?;
    let value = parse_value(field(row, value_col)?)?;
    TradeRecord::new(date, partner, flow, value).map_err(|e: ValidationError| e.into())
}

/// Write records in the long layout.
pub fn write_records_csv(path: &Path, records: &[TradeRecord]) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| DataError::Csv(format!("create {}: {e}", parent.display())))?;
    }
    let file = File::create(path)
        .map_err(|e| DataError::Csv(format!("create {}: {e}", path.display())))?;
    write_records_to(file, records)
}

pub fn write_records_to<W: Write>(writer: W, records: &[TradeRecord]) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(LONG_HEADER).map_err(csv_err)?;
    for r in records {
        wtr.write_record([
            r.date.to_string().as_str(),
            r.reporter.slug(),
            r.partner.slug(),
            r.flow.slug(),
            r.value.to_string().as_str(),
        ])
        .map_err(csv_err)?;
    }
    wtr.flush()
        .map_err(|e| DataError::Csv(format!("flush: {e}")))
}
