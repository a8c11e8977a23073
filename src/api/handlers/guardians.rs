//! Guardian routes.

use super::{Deleted, students::SearchQuery};
use crate::{
    api::AppState,
    core::guardian::{self, GuardianInput},
    entities::{guardian as entity, student},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;

/// Router mounted at `/api/guardians`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
}

/// A guardian together with the students they look after.
#[derive(Debug, Serialize)]
pub struct GuardianDetails {
    /// The guardian
    #[serde(flatten)]
    pub guardian: entity::Model,
    /// Linked students
    pub students: Vec<student::Model>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<entity::Model>>> {
    Ok(Json(
        guardian::list_guardians(&state.db, query.search.as_deref()).await?,
    ))
}

async fn create(
    State(state): State<AppState>,
    Json(input): Json<GuardianInput>,
) -> Result<(StatusCode, Json<entity::Model>)> {
    let created = guardian::create_guardian(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<GuardianDetails>> {
    let found = guardian::get_guardian(&state.db, id)
        .await?
        .ok_or_else(|| Error::not_found("Guardian", id))?;
    let students = guardian::get_guardian_students(&state.db, id).await?;
    Ok(Json(GuardianDetails {
        guardian: found,
        students,
    }))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<GuardianInput>,
) -> Result<Json<entity::Model>> {
    Ok(Json(guardian::update_guardian(&state.db, id, input).await?))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Deleted>> {
    guardian::delete_guardian(&state.db, id).await?;
    Ok(Json(Deleted { deleted: id }))
}
