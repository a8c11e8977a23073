//! Server clock and dashboard counts.

use crate::{
    api::AppState,
    core::report::{self, SchoolSummary},
    errors::Result,
};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Current server time in the formats the front desk displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerTime {
    /// `YYYY-MM-DD HH:MM:SS`
    pub time: String,
    /// Abbreviated weekday, e.g. `Mon`
    pub weekday: String,
    /// e.g. `Mon, 05 Feb 2024 - 14:03:00 UTC`
    pub full_display: String,
}

impl ServerTime {
    /// Formats `now` (UTC).
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            weekday: now.format("%a").to_string(),
            full_display: now.format("%a, %d %b %Y - %H:%M:%S UTC").to_string(),
        }
    }
}

/// `GET /api/server-time`
pub async fn server_time() -> Json<ServerTime> {
    Json(ServerTime::at(Utc::now()))
}

/// `GET /api/dashboard`
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<SchoolSummary>> {
    Ok(Json(report::school_summary(&state.db).await?))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::api::handlers::testing::send;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use chrono::TimeZone;

    #[test]
    fn test_server_time_formats() {
        let now = Utc.with_ymd_and_hms(2024, 2, 5, 14, 3, 0).unwrap();
        let formatted = ServerTime::at(now);
        assert_eq!(formatted.time, "2024-02-05 14:03:00");
        assert_eq!(formatted.weekday, "Mon");
        assert_eq!(formatted.full_display, "Mon, 05 Feb 2024 - 14:03:00 UTC");
    }

    #[tokio::test]
    async fn test_server_time_endpoint() {
        let (app, _db) = test_app(None).await.unwrap();
        let (status, body) = send(&app, "GET", "/api/server-time", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["time"].as_str().unwrap().len(), 19);
        assert!(body["full_display"].as_str().unwrap().ends_with(" UTC"));
    }

    #[tokio::test]
    async fn test_dashboard_endpoint() {
        let (app, db) = test_app(None).await.unwrap();
        let grade = create_test_grade(&db, "Robotics").await.unwrap();
        create_test_student(&db, "Maria", "Papadopoulos", Some(grade.id))
            .await
            .unwrap();

        let (status, body) = send(&app, "GET", "/api/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["student_count"], 1);
        assert_eq!(body["grade_count"], 1);
        assert_eq!(body["open_session_count"], 0);
    }
}
