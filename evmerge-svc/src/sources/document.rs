//! JSON document source: a top-level array of objects

use evmerge_common::models::RawRecord;
use evmerge_common::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// Parse the document source into raw records, preserving array order
pub fn parse_document(bytes: &[u8], origin: &Path) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        Error::SourceUnavailable(format!("Malformed JSON in {}: {}", origin.display(), e))
    })?;

    let Value::Array(items) = value else {
        return Err(Error::SourceUnavailable(format!(
            "Expected a JSON array of records in {}",
            origin.display()
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(RawRecord::from(map)),
            other => Err(Error::SourceUnavailable(format!(
                "Element {} of {} is not an object: {}",
                index,
                origin.display(),
                other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn origin() -> &'static Path {
        Path::new("source_a.json")
    }

    #[test]
    fn test_parses_records_in_order() {
        let bytes = br#"[{"YEAR": 2021, "Model": "Ioniq 5"}, {"YEAR": 2020, "(kW)": null}]"#;
        let records = parse_document(bytes, origin()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Model"), Some(&json!("Ioniq 5")));
        assert_eq!(records[1].get("(kW)"), Some(&Value::Null));
    }

    #[test]
    fn test_empty_array() {
        assert!(parse_document(b"[]", origin()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_document(b"[{\"YEAR\": 2021,", origin()).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable(_)));
    }

    #[test]
    fn test_top_level_object_rejected() {
        let err = parse_document(br#"{"YEAR": 2021}"#, origin()).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable(_)));
    }

    #[test]
    fn test_non_object_element_rejected() {
        let err = parse_document(br#"[{"YEAR": 2021}, 5]"#, origin()).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable(_)));
    }
}
