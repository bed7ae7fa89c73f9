//! Task store
//!
//! Durable record of task identity, status, filter spec and the normalized
//! records a task produced. Owns the state transitions: only
//! pending → in_progress → completed | failed is accepted, everything else is
//! an [`Error::InvariantViolation`].

use chrono::{DateTime, Utc};
use evmerge_common::models::{FilterSpec, NormalizedRecord, Task, TaskId, TaskStatus};
use evmerge_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Repository over the `tasks` and `task_records` tables
#[derive(Debug, Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist a new pending task and return it without waiting for processing
    pub async fn create(&self, filter: &FilterSpec) -> Result<Task> {
        let filters = serde_json::to_string(filter)
            .map_err(|e| Error::Internal(format!("Failed to serialize filter: {}", e)))?;
        let now = Utc::now();
        let timestamp = now.to_rfc3339();

        let id = sqlx::query(
            "INSERT INTO tasks (status, filters, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(TaskStatus::Pending.as_str())
        .bind(&filters)
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Task {
            id,
            status: TaskStatus::Pending,
            filter: filter.clone(),
            records: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Move a task one step forward along its state machine
    pub async fn set_status(&self, id: TaskId, status: TaskStatus) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        transition(&mut conn, id, status).await
    }

    /// Append the task's record set.
    ///
    /// Allowed once per task and only while the task is in progress. All rows
    /// land in a single commit.
    pub async fn append_records(&self, id: TaskId, records: &[NormalizedRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let count = insert_records(&mut tx, id, records).await?;
        tx.commit().await?;
        Ok(count)
    }

    /// Append the record set and mark the task completed in one commit
    pub async fn complete(&self, id: TaskId, records: &[NormalizedRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let count = insert_records(&mut tx, id, records).await?;
        transition(&mut tx, id, TaskStatus::Completed).await?;
        tx.commit().await?;
        Ok(count)
    }

    /// Load a task with its records in stored order
    pub async fn get(&self, id: TaskId) -> Result<Task> {
        // One read transaction: status and records come from the same snapshot
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT id, status, filters, created_at, updated_at FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

        let records = sqlx::query(
            r#"
            SELECT year, make, model, size, type, kw, city_kwh, hwy_kwh, comb_kwh,
                   city_le, hwy_le, comb_le, g_per_km, rating, km, time_h
            FROM task_records
            WHERE task_id = ?
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(record_from_row)
        .collect::<Result<Vec<_>>>()?;

        tx.commit().await?;

        let status: String = row.try_get("status")?;
        let filters: String = row.try_get("filters")?;
        let filter: FilterSpec = serde_json::from_str(&filters)
            .map_err(|e| Error::Internal(format!("Failed to deserialize filter: {}", e)))?;

        Ok(Task {
            id: row.try_get("id")?,
            status: status.parse()?,
            filter,
            records,
            created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
            updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
        })
    }

    /// Current status without loading records
    pub async fn status(&self, id: TaskId) -> Result<TaskStatus> {
        let mut conn = self.pool.acquire().await?;
        current_status(&mut conn, id).await
    }

    /// Ids of every task in `status`, oldest first
    pub async fn task_ids_with_status(&self, status: TaskStatus) -> Result<Vec<TaskId>> {
        let ids = sqlx::query_scalar("SELECT id FROM tasks WHERE status = ? ORDER BY id")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

async fn transition(conn: &mut SqliteConnection, id: TaskId, next: TaskStatus) -> Result<()> {
    let Some(required) = next.predecessor() else {
        return Err(Error::InvariantViolation(format!(
            "task {} cannot transition into {}",
            id, next
        )));
    };

    let updated = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(next.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .bind(required.as_str())
        .execute(&mut *conn)
        .await?;

    if updated.rows_affected() == 1 {
        return Ok(());
    }

    let current = current_status(conn, id).await?;
    Err(Error::InvariantViolation(format!(
        "illegal transition for task {}: {} -> {}",
        id, current, next
    )))
}

async fn insert_records(
    conn: &mut SqliteConnection,
    id: TaskId,
    records: &[NormalizedRecord],
) -> Result<usize> {
    let claimed = sqlx::query(
        r#"
        UPDATE tasks SET records_appended = 1, updated_at = ?
        WHERE id = ? AND status = 'in_progress' AND records_appended = 0
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if claimed.rows_affected() != 1 {
        let current = current_status(conn, id).await?;
        return Err(Error::InvariantViolation(format!(
            "records for task {} cannot be appended (status {}, or already appended)",
            id, current
        )));
    }

    for (position, record) in records.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO task_records (
                task_id, position, year, make, model, size, type,
                kw, city_kwh, hwy_kwh, comb_kwh, city_le, hwy_le, comb_le,
                g_per_km, rating, km, time_h
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(position as i64)
        .bind(record.year)
        .bind(&record.make)
        .bind(&record.model)
        .bind(&record.size)
        .bind(&record.vehicle_type)
        .bind(record.kw)
        .bind(record.city_kwh)
        .bind(record.hwy_kwh)
        .bind(record.comb_kwh)
        .bind(record.city_le)
        .bind(record.hwy_le)
        .bind(record.comb_le)
        .bind(record.g_per_km)
        .bind(&record.rating)
        .bind(record.km)
        .bind(record.time_h)
        .execute(&mut *conn)
        .await?;
    }

    Ok(records.len())
}

async fn current_status(conn: &mut SqliteConnection, id: TaskId) -> Result<TaskStatus> {
    let status: Option<String> = sqlx::query_scalar("SELECT status FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    status.ok_or_else(|| not_found(id))?.parse()
}

fn record_from_row(row: &SqliteRow) -> Result<NormalizedRecord> {
    Ok(NormalizedRecord {
        year: row.try_get("year")?,
        make: row.try_get("make")?,
        model: row.try_get("model")?,
        size: row.try_get("size")?,
        vehicle_type: row.try_get("type")?,
        kw: row.try_get("kw")?,
        city_kwh: row.try_get("city_kwh")?,
        hwy_kwh: row.try_get("hwy_kwh")?,
        comb_kwh: row.try_get("comb_kwh")?,
        city_le: row.try_get("city_le")?,
        hwy_le: row.try_get("hwy_le")?,
        comb_le: row.try_get("comb_le")?,
        g_per_km: row.try_get("g_per_km")?,
        rating: row.try_get("rating")?,
        km: row.try_get("km")?,
        time_h: row.try_get("time_h")?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp {}: {}", value, e)))
}

fn not_found(id: TaskId) -> Error {
    Error::NotFound(format!("Task not found: {}", id))
}
