//! Task submission and retrieval handlers
//!
//! POST /create_task, GET /tasks/:id, GET /tasks/:id/summary, GET /tasks/:id/export
//!
//! Handlers only create, enqueue and read tasks. Merge work happens on the
//! worker.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use evmerge_common::models::{FilterSpec, NormalizedRecord, TaskId, TaskStatus};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, error, info};

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// Column order of exported CSV files, matching the JSON field names
const CSV_HEADER: [&str; 16] = [
    "year", "make", "model", "size", "type", "kw", "city_kWh", "hwy_kWh", "comb_kWh", "city_le",
    "hwy_le", "comb_le", "g_per_km", "rating", "km", "time_h",
];

/// POST /create_task request
///
/// Unknown keys are ignored; the frontend also sends `region` and `size`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(rename = "startYear", default, deserialize_with = "lenient_year")]
    pub start_year: Option<i64>,

    #[serde(rename = "endYear", default, deserialize_with = "lenient_year")]
    pub end_year: Option<i64>,

    /// Manufacturer names
    #[serde(default, alias = "makes")]
    pub models: Option<Vec<String>>,
}

impl CreateTaskRequest {
    pub fn into_filter(self) -> evmerge_common::Result<FilterSpec> {
        FilterSpec::new(self.start_year, self.end_year, self.models.unwrap_or_default())
    }
}

/// Accepts an integer, an integer string, `null` or `""`
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearInput {
        Number(i64),
        Text(String),
    }

    match Option::<YearInput>::deserialize(deserializer)? {
        None => Ok(None),
        Some(YearInput::Number(year)) => Ok(Some(year)),
        Some(YearInput::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse()
                .map(Some)
                .map_err(|_| de::Error::custom(format!("invalid year: {:?}", text)))
        }
    }
}

/// POST /create_task response
#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

/// GET /tasks/:id response
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub status: TaskStatus,
    pub data: Vec<NormalizedRecord>,
}

/// GET /tasks/:id/summary response
#[derive(Debug, Serialize)]
pub struct TaskSummaryResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub total_records: usize,
    pub unique_makes: usize,
    pub unique_years: usize,
}

/// POST /create_task
///
/// Validates the filter, persists a pending task and enqueues its id.
/// Returns immediately; processing happens on the worker.
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<CreateTaskResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let filter = request.into_filter()?;

    let task = state.store.create(&filter).await?;

    if let Err(e) = state.queue.enqueue(task.id) {
        error!(task_id = task.id, error = %e, "Failed to enqueue task");
        return Err(ApiError::Internal(format!(
            "Task {} was stored but could not be queued",
            task.id
        )));
    }

    info!(task_id = task.id, filter = ?filter, "Task created");

    Ok(Json(CreateTaskResponse {
        task_id: task.id,
        status: task.status,
    }))
}

/// GET /tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    path: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<Json<TaskResponse>> {
    let task_id = task_id_from(path)?;
    let task = state.store.get(task_id).await?;

    debug!(task_id, status = %task.status, "Status query");

    Ok(Json(TaskResponse {
        status: task.status,
        data: task.records,
    }))
}

/// GET /tasks/:id/summary
pub async fn get_task_summary(
    State(state): State<AppState>,
    path: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<Json<TaskSummaryResponse>> {
    let task_id = task_id_from(path)?;
    let task = state.store.get(task_id).await?;

    let unique_makes: BTreeSet<&str> = task.records.iter().map(|r| r.make.as_str()).collect();
    let unique_years: BTreeSet<i64> = task.records.iter().map(|r| r.year).collect();

    Ok(Json(TaskSummaryResponse {
        task_id,
        status: task.status,
        total_records: task.records.len(),
        unique_makes: unique_makes.len(),
        unique_years: unique_years.len(),
    }))
}

/// GET /tasks/:id/export
///
/// CSV download of a completed task's records.
pub async fn export_task(
    State(state): State<AppState>,
    path: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<Response> {
    let task_id = task_id_from(path)?;
    let task = state.store.get(task_id).await?;

    if task.status != TaskStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "Task {} is {}; only completed tasks can be exported",
            task_id, task.status
        )));
    }

    let body = records_to_csv(&task.records)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"filtered_data.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

/// Ids that are not integers name no task, so they are 404s like unknown ids
fn task_id_from(path: Result<Path<TaskId>, PathRejection>) -> ApiResult<TaskId> {
    path.map(|Path(task_id)| task_id)
        .map_err(|e| ApiError::NotFound(format!("Task not found: {}", e.body_text())))
}

fn records_to_csv(records: &[NormalizedRecord]) -> ApiResult<Vec<u8>> {
    let csv_error = |e: csv::Error| ApiError::Internal(format!("CSV export failed: {}", e));

    let mut writer = csv::Writer::from_writer(Vec::new());

    // serialize() only emits the header alongside the first row
    if records.is_empty() {
        writer.write_record(CSV_HEADER).map_err(csv_error)?;
    }
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))
}

/// Task routes
pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/create_task", post(create_task))
        .route("/tasks/:task_id", get(get_task))
        .route("/tasks/:task_id/summary", get(get_task_summary))
        .route("/tasks/:task_id/export", get(export_task))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(make: &str, kw: Option<f64>) -> NormalizedRecord {
        NormalizedRecord {
            year: 2021,
            make: make.into(),
            model: "Model 3".into(),
            size: "Mid-size".into(),
            vehicle_type: "BEV".into(),
            kw,
            city_kwh: None,
            hwy_kwh: None,
            comb_kwh: None,
            city_le: None,
            hwy_le: None,
            comb_le: None,
            g_per_km: None,
            rating: Some("10".into()),
            km: Some(423),
            time_h: None,
        }
    }

    #[test]
    fn test_request_accepts_frontend_shapes() {
        let request: CreateTaskRequest = serde_json::from_str(
            r#"{"startYear": "2020", "endYear": "", "models": ["Tesla", "Kia", " "], "region": "ON", "size": "SUV"}"#,
        )
        .unwrap();
        let filter = request.into_filter().unwrap();

        assert_eq!(filter.start_year, Some(2020));
        assert_eq!(filter.end_year, None);
        assert_eq!(filter.makes.len(), 2);
        assert!(filter.makes.contains("Kia"));
    }

    #[test]
    fn test_request_nulls_mean_absent() {
        let request: CreateTaskRequest =
            serde_json::from_str(r#"{"startYear": null, "endYear": null, "models": null}"#).unwrap();
        assert!(request.into_filter().unwrap().is_unfiltered());
    }

    #[test]
    fn test_request_rejects_bad_year() {
        assert!(serde_json::from_str::<CreateTaskRequest>(r#"{"startYear": "soon"}"#).is_err());
        assert!(serde_json::from_str::<CreateTaskRequest>(r#"{"startYear": true}"#).is_err());
    }

    #[test]
    fn test_csv_header_matches_serialized_fields() {
        let csv = records_to_csv(&[sample("Tesla", None)]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "2021,Tesla,Model 3,Mid-size,BEV,,,,,,,,,10,423,"
        );
    }

    #[test]
    fn test_csv_empty_still_has_header() {
        let csv = records_to_csv(&[]).unwrap();
        assert_eq!(String::from_utf8(csv).unwrap().trim_end(), CSV_HEADER.join(","));
    }
}
