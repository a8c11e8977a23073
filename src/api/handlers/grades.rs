//! Grade routes, including membership and the per-grade attendance report.

use crate::{
    api::AppState,
    core::{
        grade::{self, GradeInput},
        report::{self, StudentAttendance},
    },
    entities::{grade as entity, student},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

/// Router mounted at `/api/grades`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/unassigned", get(unassigned))
        .route("/students/:student_id", delete(remove_student))
        .route("/:id", get(show).delete(remove))
        .route("/:id/students", post(assign_student))
        .route("/:id/report", get(attendance_report))
}

/// A grade with its current students.
#[derive(Debug, Serialize)]
pub struct GradeDetails {
    /// The grade
    #[serde(flatten)]
    pub grade: entity::Model,
    /// Students assigned to it
    pub students: Vec<student::Model>,
}

/// Body of `POST /api/grades/{id}/students`.
#[derive(Debug, Deserialize)]
pub struct Assignment {
    /// Student to move into the grade
    pub student_id: i64,
}

/// Result of deleting a grade.
#[derive(Debug, Serialize)]
pub struct GradeDeleted {
    /// Id of the removed grade
    pub deleted: i64,
    /// Students left without a grade
    pub unassigned_students: u64,
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<entity::Model>>> {
    Ok(Json(grade::get_all_grades(&state.db).await?))
}

async fn create(
    State(state): State<AppState>,
    Json(input): Json<GradeInput>,
) -> Result<(StatusCode, Json<entity::Model>)> {
    let created = grade::create_grade(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<GradeDetails>> {
    let found = grade::get_grade(&state.db, id)
        .await?
        .ok_or_else(|| Error::not_found("Grade", id))?;
    let students = grade::get_grade_students(&state.db, id).await?;
    Ok(Json(GradeDetails {
        grade: found,
        students,
    }))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<GradeDeleted>> {
    let unassigned_students = grade::delete_grade(&state.db, id).await?;
    Ok(Json(GradeDeleted {
        deleted: id,
        unassigned_students,
    }))
}

async fn unassigned(State(state): State<AppState>) -> Result<Json<Vec<student::Model>>> {
    Ok(Json(grade::get_unassigned_students(&state.db).await?))
}

async fn assign_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Assignment>,
) -> Result<Json<student::Model>> {
    Ok(Json(grade::assign_student(&state.db, id, body.student_id).await?))
}

async fn remove_student(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
) -> Result<Json<student::Model>> {
    Ok(Json(grade::remove_student(&state.db, student_id).await?))
}

async fn attendance_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<StudentAttendance>>> {
    Ok(Json(report::grade_attendance_report(&state.db, id).await?))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::handlers::testing::send;
    use crate::core::attendance;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_grade_normalizes_weekdays() {
        let (app, _db) = test_app(None).await.unwrap();
        let (status, body) = send(
            &app,
            "POST",
            "/api/grades",
            Some(json!({
                "name": "Robotics",
                "reset_time": "10:00:00",
                "class_time": "17:00:00",
                "weekdays": "wednesday,MONDAY",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["weekdays"], "MONDAY,WEDNESDAY");
        assert_eq!(body["lesson_duration"], 2);

        let (status, _) = send(
            &app,
            "POST",
            "/api/grades",
            Some(json!({ "name": "Chess", "reset_time": "10:00:00", "weekdays": "FUNDAY" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_membership_routes() {
        let (app, db) = test_app(None).await.unwrap();
        let grade = create_test_grade(&db, "Robotics").await.unwrap();
        let maria = create_test_student(&db, "Maria", "Papadopoulos", None).await.unwrap();

        let (_, body) = send(&app, "GET", "/api/grades/unassigned", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/grades/{}/students", grade.id),
            Some(json!({ "student_id": maria.id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["grade_id"], grade.id);

        let (_, details) = send(&app, "GET", &format!("/api/grades/{}", grade.id), None).await;
        assert_eq!(details["students"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            "DELETE",
            &format!("/api/grades/students/{}", maria.id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["grade_id"].is_null());
    }

    #[tokio::test]
    async fn test_delete_grade_in_use_conflicts() {
        let (app, db) = test_app(None).await.unwrap();
        let grade = create_test_grade(&db, "Robotics").await.unwrap();
        create_test_student(&db, "Maria", "Papadopoulos", Some(grade.id))
            .await
            .unwrap();
        attendance::open_session(&db, grade.id, Utc::now()).await.unwrap();

        let (status, _) = send(&app, "DELETE", &format!("/api/grades/{}", grade.id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        attendance::archive_grade_session(&db, grade.id).await.unwrap();
        let (status, body) = send(&app, "DELETE", &format!("/api/grades/{}", grade.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unassigned_students"], 1);
    }

    #[tokio::test]
    async fn test_attendance_report_route() {
        let (app, db) = test_app(None).await.unwrap();
        let grade = create_test_grade(&db, "Robotics").await.unwrap();
        create_test_student(&db, "Maria", "Papadopoulos", Some(grade.id))
            .await
            .unwrap();

        let (status, body) = send(&app, "GET", &format!("/api/grades/{}/report", grade.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "Maria Papadopoulos");
        assert!(body[0]["rate"].is_null());

        let (status, _) = send(&app, "GET", "/api/grades/999/report", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
