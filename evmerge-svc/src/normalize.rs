//! Record normalizer
//!
//! Maps a raw record from either source layout onto [`NormalizedRecord`].
//! Required fields must resolve or the record is rejected; optional fields
//! that are absent, null or not coercible become unset.

use evmerge_common::models::{fields, NormalizedRecord, RawRecord};
use evmerge_common::{Error, Result};

/// Normalize one raw record
///
/// # Errors
/// `Error::SchemaViolation` naming the first required field that is missing.
pub fn normalize(record: &RawRecord) -> Result<NormalizedRecord> {
    Ok(NormalizedRecord {
        year: record.integer(fields::YEAR).ok_or_else(|| missing(fields::YEAR))?,
        make: required_text(record, fields::MAKE)?,
        model: required_text(record, fields::MODEL)?,
        size: required_text(record, fields::SIZE)?,
        vehicle_type: required_text(record, fields::TYPE)?,
        kw: record.number(fields::KW),
        city_kwh: record.number(fields::CITY_KWH),
        hwy_kwh: record.number(fields::HWY_KWH),
        comb_kwh: record.number(fields::COMB_KWH),
        city_le: record.number(fields::CITY_LE),
        hwy_le: record.number(fields::HWY_LE),
        comb_le: record.number(fields::COMB_LE),
        g_per_km: record.number(fields::G_PER_KM),
        rating: record.text(fields::RATING),
        km: record.integer(fields::KM),
        time_h: record.number(fields::TIME_H),
    })
}

fn required_text(record: &RawRecord, names: &[&str]) -> Result<String> {
    record.text(names).ok_or_else(|| missing(names))
}

fn missing(names: &[&str]) -> Error {
    Error::SchemaViolation(format!("missing required field {}", names[0]))
}
