//! Data source loading
//!
//! Reads the JSON document source and the CSV table source and concatenates
//! them into one sequence of raw records: document records first, then table
//! records, each in file order. No filtering or validation happens here;
//! failures are source-level (missing file, malformed syntax).

pub mod document;
pub mod table;

use async_trait::async_trait;
use evmerge_common::models::RawRecord;
use evmerge_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces the combined raw record sequence for one processing pass
#[async_trait]
pub trait DataLoader: Send + Sync {
    /// Load every record from every source.
    ///
    /// # Errors
    /// `Error::SourceUnavailable` if any source cannot be read or parsed.
    async fn load(&self) -> Result<Vec<RawRecord>>;
}

/// Loader backed by a JSON document file and a CSV table file
#[derive(Debug, Clone)]
pub struct FileSourceLoader {
    document_path: PathBuf,
    table_path: PathBuf,
}

impl FileSourceLoader {
    pub fn new(document_path: impl Into<PathBuf>, table_path: impl Into<PathBuf>) -> Self {
        Self {
            document_path: document_path.into(),
            table_path: table_path.into(),
        }
    }
}

#[async_trait]
impl DataLoader for FileSourceLoader {
    async fn load(&self) -> Result<Vec<RawRecord>> {
        let document = read_source(&self.document_path).await?;
        let mut records = document::parse_document(&document, &self.document_path)?;
        let document_count = records.len();

        let table = read_source(&self.table_path).await?;
        records.extend(table::parse_table(&table, &self.table_path)?);

        debug!(
            document_records = document_count,
            table_records = records.len() - document_count,
            "Loaded data sources"
        );

        Ok(records)
    }
}

async fn read_source(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        Error::SourceUnavailable(format!("Failed to read {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_document_records_precede_table_records() {
        let dir = tempfile::tempdir().unwrap();
        let document = dir.path().join("source_a.json");
        let table = dir.path().join("source_b.csv");
        std::fs::write(
            &document,
            r#"[{"YEAR": 2021, "Make": "Tesla"}, {"YEAR": 2022, "Make": "Kia"}]"#,
        )
        .unwrap();
        std::fs::write(&table, "YEAR,Make\n2019,Nissan\n2020,Hyundai\n").unwrap();

        let records = FileSourceLoader::new(&document, &table).load().await.unwrap();

        let makes: Vec<String> = records
            .iter()
            .filter_map(|r| r.text(evmerge_common::models::fields::MAKE))
            .collect();
        assert_eq!(makes, vec!["Tesla", "Kia", "Nissan", "Hyundai"]);
    }

    #[tokio::test]
    async fn test_missing_source_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let document = dir.path().join("source_a.json");
        std::fs::write(&document, "[]").unwrap();

        let err = FileSourceLoader::new(&document, dir.path().join("missing.csv"))
            .load()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SourceUnavailable(_)));
    }
}
