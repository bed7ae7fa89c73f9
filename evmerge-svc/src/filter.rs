//! Filter engine
//!
//! Clauses are conjunctive; an absent clause is vacuously satisfied.
//!
//! A record with no usable year counts as year 0. That fails any positive
//! `startYear` clause but passes every `endYear` clause. Kept as is for
//! compatibility with existing clients.

use evmerge_common::models::{fields, FilterSpec, RawRecord};

/// Whether `record` passes every clause of `filter`
pub fn matches(record: &RawRecord, filter: &FilterSpec) -> bool {
    let year = record.integer(fields::YEAR).unwrap_or(0);

    if filter.start_year.is_some_and(|start| year < start) {
        return false;
    }
    if filter.end_year.is_some_and(|end| year > end) {
        return false;
    }

    if !filter.makes.is_empty() {
        match record.text(fields::MAKE) {
            Some(make) if filter.makes.contains(&make) => {}
            _ => return false,
        }
    }

    true
}
