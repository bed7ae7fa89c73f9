//! Filter specification attached to a task

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// User-supplied predicate over a year range and a manufacturer set
///
/// Serialized with the wire names the frontend uses: `startYear`, `endYear`
/// and `models` (which carries manufacturer names, not model names).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(rename = "startYear", default, skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i64>,

    #[serde(rename = "endYear", default, skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i64>,

    #[serde(
        rename = "models",
        alias = "makes",
        default,
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub makes: BTreeSet<String>,
}

impl FilterSpec {
    /// Build a validated filter.
    ///
    /// Blank make names are discarded; the rest are kept verbatim so matching
    /// stays exact.
    pub fn new<I, S>(start_year: Option<i64>, end_year: Option<i64>, makes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let makes = makes
            .into_iter()
            .filter(|m| !m.as_ref().trim().is_empty())
            .map(|m| m.as_ref().to_string())
            .collect();

        let spec = Self {
            start_year,
            end_year,
            makes,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Reject filters that can never be satisfied by construction
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if start > end {
                return Err(Error::InvalidFilterSpec(format!(
                    "startYear ({}) is after endYear ({})",
                    start, end
                )));
            }
        }
        Ok(())
    }

    /// True when no clause is present
    pub fn is_unfiltered(&self) -> bool {
        self.start_year.is_none() && self.end_year.is_none() && self.makes.is_empty()
    }
}
