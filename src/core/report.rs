//! Report generation business logic.
//!
//! Dashboard counts and per-student attendance rates. Everything here is
//! read-only and returns structured data for the HTTP layer to serialize.

use crate::{
    entities::{Attendance, Grade, PaymentPlan, Student, attendance, student},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;

/// Record counts shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchoolSummary {
    /// All students, active or not
    pub student_count: u64,
    /// Students included in new sessions
    pub active_student_count: u64,
    /// Grades
    pub grade_count: u64,
    /// Payment plans
    pub payment_plan_count: u64,
    /// Grades with an open session
    pub open_session_count: u64,
}

/// Counts students, grades, payment plans and open sessions.
pub async fn school_summary(db: &DatabaseConnection) -> Result<SchoolSummary> {
    let student_count = Student::find().count(db).await?;
    let active_student_count = Student::find()
        .filter(student::Column::Active.eq(true))
        .count(db)
        .await?;
    let grade_count = Grade::find().count(db).await?;
    let payment_plan_count = PaymentPlan::find().count(db).await?;

    let open_session_count = Attendance::find()
        .select_only()
        .column(attendance::Column::GradeId)
        .distinct()
        .count(db)
        .await?;

    Ok(SchoolSummary {
        student_count,
        active_student_count,
        grade_count,
        payment_plan_count,
        open_session_count,
    })
}

/// Share of archived sessions a student attended, as a percentage.
///
/// # Returns
/// `None` until the student has at least one archived session
#[must_use]
pub fn attendance_rate(presences: i32, absences: i32) -> Option<f64> {
    let total = presences + absences;
    if total <= 0 {
        return None;
    }
    Some(f64::from(presences) / f64::from(total) * 100.0)
}

/// One line of a grade's attendance report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAttendance {
    /// Student primary key
    pub student_id: i64,
    /// "First Last"
    pub name: String,
    /// Sessions attended
    pub presences: i32,
    /// Sessions missed
    pub absences: i32,
    /// See [`attendance_rate`]
    pub rate: Option<f64>,
}

/// Attendance totals for every student currently in a grade.
pub async fn grade_attendance_report(
    db: &DatabaseConnection,
    grade_id: i64,
) -> Result<Vec<StudentAttendance>> {
    Grade::find_by_id(grade_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Grade", grade_id))?;

    let students = Student::find()
        .filter(student::Column::GradeId.eq(grade_id))
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .all(db)
        .await?;

    Ok(students
        .into_iter()
        .map(|s| StudentAttendance {
            student_id: s.id,
            name: s.full_name(),
            presences: s.presences,
            absences: s.absences,
            rate: attendance_rate(s.presences, s.absences),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{attendance as sessions, student as students};
    use crate::test_utils::*;
    use chrono::Utc;

    #[test]
    fn test_attendance_rate() {
        assert_eq!(attendance_rate(0, 0), None);
        assert_eq!(attendance_rate(3, 1), Some(75.0));
        assert_eq!(attendance_rate(0, 4), Some(0.0));
        assert_eq!(attendance_rate(5, 0), Some(100.0));
    }

    #[tokio::test]
    async fn test_school_summary() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(school_summary(&db).await?.student_count, 0);

        let robotics = create_test_grade(&db, "Robotics").await?;
        create_test_grade(&db, "Chess").await?;
        create_test_plan(&db, "Standard", 100, 50, 3).await?;
        create_test_student(&db, "Maria", "Papadopoulos", Some(robotics.id)).await?;
        create_test_student(&db, "Nikos", "Georgiou", Some(robotics.id)).await?;
        sessions::open_session(&db, robotics.id, Utc::now()).await?;

        let summary = school_summary(&db).await?;
        assert_eq!(summary.student_count, 2);
        assert_eq!(summary.active_student_count, 2);
        assert_eq!(summary.grade_count, 2);
        assert_eq!(summary.payment_plan_count, 1);
        assert_eq!(summary.open_session_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_grade_attendance_report() -> Result<()> {
        let db = setup_test_db().await?;
        let grade = create_test_grade(&db, "Robotics").await?;
        let maria = create_test_student(&db, "Maria", "Papadopoulos", Some(grade.id)).await?;
        create_test_student(&db, "Nikos", "Georgiou", Some(grade.id)).await?;
        students::increment_attendance_counter(&db, maria.id, true).await?;
        students::increment_attendance_counter(&db, maria.id, false).await?;

        let report = grade_attendance_report(&db, grade.id).await?;
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].name, "Nikos Georgiou");
        assert_eq!(report[0].rate, None);
        assert_eq!(report[1].rate, Some(50.0));

        assert!(matches!(
            grade_attendance_report(&db, 999).await,
            Err(Error::NotFound { .. })
        ));

        Ok(())
    }
}
