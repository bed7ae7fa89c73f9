//! Shared fixtures for evmerge-svc integration tests
//!
//! On-disk SQLite databases and source files live in a `TempDir` that must
//! outlive the test, so it is returned alongside the store.

#![allow(dead_code)]

use async_trait::async_trait;
use evmerge_common::db::init_database;
use evmerge_common::models::{RawRecord, Task, TaskId, TaskStatus};
use evmerge_common::{Error, Result};
use evmerge_svc::db::TaskStore;
use evmerge_svc::sources::{DataLoader, FileSourceLoader};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// Document source: three usable records plus one without a make
pub const DOCUMENT_FIXTURE: &str = r#"[
    {"YEAR": 2021, "Make": "Tesla", "Model": "Model 3", "Size": "Mid-size", "TYPE": "BEV",
     "(kW)": 211, "CITY (kWh/100 km)": 15.2, "RATING": "10", "(km)": 423, "TIME (h)": 10.0},
    {"YEAR": 2019, "Make": "Nissan", "Model": "Leaf", "Size": "Mid-size", "TYPE": "BEV",
     "(kW)": 110, "(g/km)": 0},
    {"YEAR": 2022, "Make": "Tesla", "Model": "Model Y", "Size": "SUV: Small", "TYPE": "BEV",
     "(kW)": null},
    {"YEAR": 2020, "Model": "Ghost", "Size": "Compact", "TYPE": "BEV"}
]"#;

/// Table source: three usable records
pub const TABLE_FIXTURE: &str = "\
year,make,model,size,type,kw,city_kWh,rating,km,time_h
2020,Tesla,Model S,Full-size,BEV,311,20.1,10,600,12
2023,Kia,EV6,SUV: Standard,BEV,239,,9,499,7.5
2018,Tesla,Roadster,Two-seater,BEV,,,,,
";

/// Records in the fixtures that survive normalization
pub const USABLE_RECORDS: usize = 6;

/// Temporary root holding a task database and both source files
pub struct TestEnv {
    pub dir: TempDir,
    pub store: TaskStore,
    pub document_path: PathBuf,
    pub table_path: PathBuf,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let document_path = dir.path().join("source_a.json");
        let table_path = dir.path().join("source_b.csv");
        std::fs::write(&document_path, DOCUMENT_FIXTURE).expect("Failed to write document");
        std::fs::write(&table_path, TABLE_FIXTURE).expect("Failed to write table");

        let pool = init_database(&dir.path().join("tasks.db"))
            .await
            .expect("Failed to initialize database");

        Self {
            dir,
            store: TaskStore::new(pool),
            document_path,
            table_path,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.dir.path().join("tasks.db")
    }

    pub fn loader(&self) -> Arc<dyn DataLoader> {
        Arc::new(FileSourceLoader::new(&self.document_path, &self.table_path))
    }
}

/// Loader that waits for a permit before every load
///
/// Lets a test hold the worker mid-task and observe the queue behind it.
pub struct GatedLoader {
    inner: Arc<dyn DataLoader>,
    gate: Arc<Semaphore>,
}

impl GatedLoader {
    pub fn new(inner: Arc<dyn DataLoader>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                inner,
                gate: gate.clone(),
            },
            gate,
        )
    }
}

#[async_trait]
impl DataLoader for GatedLoader {
    async fn load(&self) -> Result<Vec<RawRecord>> {
        self.gate
            .acquire()
            .await
            .map_err(|e| Error::Internal(e.to_string()))?
            .forget();
        self.inner.load().await
    }
}

/// Poll the store until the task reaches `status`
pub async fn wait_for_status(store: &TaskStore, id: TaskId, status: TaskStatus) -> Task {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let task = store.get(id).await.expect("Task lookup failed");
        if task.status == status {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "Task {} stuck in {} waiting for {}",
            id,
            task.status,
            status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
