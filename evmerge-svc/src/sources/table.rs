//! CSV table source: a header row followed by one row per record
//!
//! Cells are typed the way a dataframe reader would: integers, then floats,
//! otherwise strings. Empty cells leave the field absent.

use evmerge_common::models::RawRecord;
use evmerge_common::{Error, Result};
use serde_json::{Number, Value};
use std::path::Path;

/// Parse the table source into raw records, preserving row order
pub fn parse_table(bytes: &[u8], origin: &Path) -> Result<Vec<RawRecord>> {
    let malformed = |e: csv::Error| {
        Error::SourceUnavailable(format!("Malformed CSV in {}: {}", origin.display(), e))
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers().map_err(malformed)?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(malformed)?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(header, cell)| (header.to_string(), parse_cell(cell)))
            .collect();
        records.push(record);
    }

    Ok(records)
}

fn parse_cell(cell: &str) -> Value {
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}
