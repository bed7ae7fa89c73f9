//! Merge pipeline: filter then normalize one loaded batch

use evmerge_common::models::{FilterSpec, NormalizedRecord, RawRecord};
use tracing::debug;

use crate::filter::matches;
use crate::normalize::normalize;

/// Outcome of one merge pass
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Records that passed the filter and normalized, in load order
    pub records: Vec<NormalizedRecord>,
    /// Records rejected by the filter
    pub filtered_out: usize,
    /// Records that passed the filter but violated the schema
    pub dropped: usize,
}

/// Apply `filter` to every raw record and normalize the survivors.
///
/// Schema violations drop the offending record and processing continues.
pub fn merge(raw: &[RawRecord], filter: &FilterSpec) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for (index, record) in raw.iter().enumerate() {
        if !matches(record, filter) {
            outcome.filtered_out += 1;
            continue;
        }

        match normalize(record) {
            Ok(normalized) => outcome.records.push(normalized),
            Err(e) => {
                debug!(index, error = %e, "Dropping record");
                outcome.dropped += 1;
            }
        }
    }

    outcome
}
