//! Attendance routes and the two token-protected trigger endpoints.
//!
//! The triggers are what an external cron calls. Both run the same passes as
//! the in-process scheduler, with `?force=true` bypassing the time checks.

use crate::{
    api::{AppState, auth},
    core::attendance::{
        self, AutosaveReport, CheckIn, GenerationReport, HistoryEntry, OpenSession, RecordInput,
    },
    entities::attendance as entity,
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Router mounted at `/api/attendances`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_open))
        .route("/:id", put(mark))
        .route("/sessions/:grade_id", post(open_session))
        .route("/sessions/:grade_id/archive", post(archive_session))
        .route("/check-in", post(check_in))
        .route("/record", post(record))
        .route("/history/:grade_id", get(history))
}

/// `?force=` flag of the trigger endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerQuery {
    /// Skip the schedule and duration checks
    #[serde(default)]
    pub force: bool,
}

/// Body returned by a successful trigger call.
#[derive(Debug, Serialize)]
pub struct TriggerResponse<R> {
    /// Always `"success"`
    pub status: &'static str,
    /// Which pass ran
    pub message: &'static str,
    /// Per-grade outcomes
    pub report: R,
}

/// `POST /api/trigger-attendance-generation`
pub async fn trigger_generation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TriggerQuery>,
) -> Result<Json<TriggerResponse<GenerationReport>>> {
    auth::authorize(&headers, state.api_token.as_deref())?;

    let report = attendance::generate_attendance_sheets(&state.db, Utc::now(), query.force).await?;
    info!(
        "Generation triggered: {} record(s) created, {} failure(s)",
        report.records_created(),
        report.failures()
    );
    Ok(Json(TriggerResponse {
        status: "success",
        message: "Attendance generation triggered",
        report,
    }))
}

/// `POST /api/trigger-attendance-autosave`
pub async fn trigger_autosave(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TriggerQuery>,
) -> Result<Json<TriggerResponse<AutosaveReport>>> {
    auth::authorize(&headers, state.api_token.as_deref())?;

    let report = attendance::autosave_attendance_sheets(&state.db, Utc::now(), query.force).await?;
    info!(
        "Autosave triggered: {} session(s) archived, {} failure(s)",
        report.archived(),
        report.failures()
    );
    Ok(Json(TriggerResponse {
        status: "success",
        message: "Attendance autosave triggered",
        report,
    }))
}

/// Body of `PUT /api/attendances/{id}`.
#[derive(Debug, Deserialize)]
pub struct Mark {
    /// New value
    pub present: bool,
}

/// Body of `POST /api/attendances/check-in`.
#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    /// UUID printed on the student's card
    pub uuid: Uuid,
}

/// Result of opening a session by hand.
#[derive(Debug, Serialize)]
pub struct SessionOpened {
    /// Grade the session belongs to
    pub grade_id: i64,
    /// Rows created, one per active student
    pub records_created: usize,
}

async fn list_open(State(state): State<AppState>) -> Result<Json<Vec<OpenSession>>> {
    Ok(Json(attendance::list_open_sessions(&state.db).await?))
}

async fn mark(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Mark>,
) -> Result<Json<entity::Model>> {
    Ok(Json(attendance::mark_attendance(&state.db, id, body.present).await?))
}

async fn open_session(
    State(state): State<AppState>,
    Path(grade_id): Path<i64>,
) -> Result<(StatusCode, Json<SessionOpened>)> {
    let records_created = attendance::open_session(&state.db, grade_id, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionOpened {
            grade_id,
            records_created,
        }),
    ))
}

async fn archive_session(
    State(state): State<AppState>,
    Path(grade_id): Path<i64>,
) -> Result<Json<HistoryEntry>> {
    attendance::archive_grade_session(&state.db, grade_id)
        .await?
        .map(|history| Json(HistoryEntry::from(history)))
        .ok_or_else(|| Error::not_found("Open attendance session", grade_id))
}

async fn check_in(
    State(state): State<AppState>,
    Json(body): Json<CheckInRequest>,
) -> Result<Json<CheckIn>> {
    Ok(Json(attendance::check_in(&state.db, body.uuid).await?))
}

async fn record(
    State(state): State<AppState>,
    Json(input): Json<RecordInput>,
) -> Result<(StatusCode, Json<entity::Model>)> {
    let created = attendance::record_attendance(&state.db, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn history(
    State(state): State<AppState>,
    Path(grade_id): Path<i64>,
) -> Result<Json<Vec<HistoryEntry>>> {
    Ok(Json(attendance::get_history_for_grade(&state.db, grade_id).await?))
}
