//! Student routes.

use super::Deleted;
use crate::{
    api::AppState,
    core::student::{self, StudentInput},
    entities::{guardian, student as entity},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Router mounted at `/api/students`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
        .route("/:id/guardians", put(set_guardians))
}

/// Optional `?search=` filter.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Matched against name and phone number
    pub search: Option<String>,
}

/// A student together with their guardians.
#[derive(Debug, Serialize)]
pub struct StudentDetails {
    /// The student
    #[serde(flatten)]
    pub student: entity::Model,
    /// Linked guardians
    pub guardians: Vec<guardian::Model>,
}

/// Body of `PUT /api/students/{id}/guardians`.
#[derive(Debug, Deserialize)]
pub struct GuardianIds {
    /// The complete new set of guardians
    pub guardian_ids: Vec<i64>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<entity::Model>>> {
    Ok(Json(
        student::list_students(&state.db, query.search.as_deref()).await?,
    ))
}

async fn create(
    State(state): State<AppState>,
    Json(input): Json<StudentInput>,
) -> Result<(StatusCode, Json<entity::Model>)> {
    let created = student::create_student(&state.db, input).await?;
    info!("POST /api/students - created {}", created.student_id);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<StudentDetails>> {
    let found = student::get_student(&state.db, id)
        .await?
        .ok_or_else(|| Error::not_found("Student", id))?;
    let guardians = student::get_student_guardians(&state.db, id).await?;
    Ok(Json(StudentDetails {
        student: found,
        guardians,
    }))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<StudentInput>,
) -> Result<Json<entity::Model>> {
    Ok(Json(student::update_student(&state.db, id, input).await?))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Deleted>> {
    student::delete_student(&state.db, id).await?;
    info!("DELETE /api/students/{}", id);
    Ok(Json(Deleted { deleted: id }))
}

async fn set_guardians(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<GuardianIds>,
) -> Result<Json<Vec<guardian::Model>>> {
    Ok(Json(
        student::set_guardians(&state.db, id, &body.guardian_ids).await?,
    ))
}
