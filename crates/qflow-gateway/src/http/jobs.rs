//! Job scheduling endpoints: request validation and response shaping only.
//! All scheduling semantics live in `qflow-scheduler`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use qflow_scheduler::{JobInfo, JobPayload, SchedulerError};

use crate::app::AppState;

/// Wire format for `executeAt` (interpreted as UTC).
const EXECUTE_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// POST /api/jobs/schedule body. Every field is optional at the wire level
/// so missing values produce a 400 with a field-specific message instead of
/// a generic deserialisation error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleJobRequest {
    pub job_name: Option<String>,
    pub queue_id: Option<i64>,
    pub group_code: Option<String>,
    pub slot_time: Option<String>,
    pub execute_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleJobResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_at: Option<String>,
}

impl ScheduleJobResponse {
    fn error(message: impl Into<String>, job_name: Option<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            job_name,
            execute_at: None,
        }
    }
}

/// Validated schedule parameters extracted from a request.
#[derive(Debug)]
struct ValidatedSchedule {
    name: String,
    payload: JobPayload,
    execute_at: DateTime<Utc>,
}

/// Check required fields and parse the timestamp. Returns a caller-facing
/// message on the first violation found.
fn validate(req: &ScheduleJobRequest) -> Result<ValidatedSchedule, String> {
    let name = match req.job_name.as_deref() {
        Some(n) if !n.trim().is_empty() => n.to_string(),
        _ => return Err("Job name is required".to_string()),
    };

    let queue_id = req.queue_id.ok_or_else(|| "Queue ID is required".to_string())?;

    let group_code = match req.group_code.as_deref() {
        Some(g) if !g.trim().is_empty() => g.to_string(),
        _ => return Err("Group code is required".to_string()),
    };

    let execute_at = match req.execute_at.as_deref() {
        Some(raw) => NaiveDateTime::parse_from_str(raw, EXECUTE_AT_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|_| format!("Invalid execute time (expected {EXECUTE_AT_FORMAT}): {raw}"))?,
        None => return Err("Execute time is required".to_string()),
    };

    Ok(ValidatedSchedule {
        name,
        payload: JobPayload::new(queue_id, group_code, req.slot_time.clone()),
        execute_at,
    })
}

/// POST /api/jobs/schedule
pub async fn schedule_job(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScheduleJobRequest>,
) -> (StatusCode, Json<ScheduleJobResponse>) {
    let validated = match validate(&req) {
        Ok(v) => v,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ScheduleJobResponse::error(message, None)),
            )
        }
    };

    match state
        .scheduler
        .schedule(&validated.name, validated.payload, validated.execute_at)
    {
        Ok(()) => (
            StatusCode::OK,
            Json(ScheduleJobResponse {
                status: "success",
                message: "Job scheduled successfully".to_string(),
                job_name: Some(validated.name),
                execute_at: Some(validated.execute_at.format(EXECUTE_AT_FORMAT).to_string()),
            }),
        ),
        Err(e @ SchedulerError::DuplicateJob { .. }) => (
            StatusCode::CONFLICT,
            Json(ScheduleJobResponse::error(e.to_string(), Some(validated.name))),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ScheduleJobResponse::error(
                format!("Failed to schedule job: {e}"),
                Some(validated.name),
            )),
        ),
    }
}

/// DELETE /api/jobs/cancel/{job_name}
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_name): Path<String>,
) -> (StatusCode, Json<ScheduleJobResponse>) {
    match state.scheduler.cancel(&job_name) {
        Ok(()) => (
            StatusCode::OK,
            Json(ScheduleJobResponse {
                status: "success",
                message: "Job cancelled successfully".to_string(),
                job_name: Some(job_name),
                execute_at: None,
            }),
        ),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(ScheduleJobResponse::error(e.to_string(), Some(job_name))),
        ),
    }
}

/// GET /api/jobs — snapshot of all pending jobs, soonest first.
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobInfo>> {
    Json(state.scheduler.pending())
}
