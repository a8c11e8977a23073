//! Grade business logic - Class groups, their schedules and their students.

use crate::{
    core::{schedule, validation},
    entities::{Attendance, Grade, Student, attendance, grade, student},
    errors::{Error, Result},
};
use chrono::NaiveTime;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;
use tracing::info;

const fn default_lesson_duration() -> i32 {
    2
}

/// Fields accepted when creating a grade.
#[derive(Debug, Clone, Deserialize)]
pub struct GradeInput {
    /// Display name, 1-40 characters
    pub name: String,
    /// Daily time at which a session opens when no class is scheduled
    pub reset_time: NaiveTime,
    /// Weekly class start time
    #[serde(default)]
    pub class_time: Option<NaiveTime>,
    /// Session length in hours
    #[serde(default = "default_lesson_duration")]
    pub lesson_duration: i32,
    /// Comma-separated weekday tags, e.g. `"MONDAY,WEDNESDAY"`
    #[serde(default)]
    pub weekdays: String,
}

/// Creates a grade after validating its schedule.
///
/// Weekday tags are accepted in any case and stored upper-case, Monday first.
pub async fn create_grade(db: &DatabaseConnection, input: GradeInput) -> Result<grade::Model> {
    let name = validation::required_text("Grade name", &input.name, 40)?;
    if input.lesson_duration <= 0 {
        return Err(Error::validation("Lesson duration must be at least one hour"));
    }
    let weekdays = schedule::parse_weekdays(&input.weekdays)?;

    let grade = grade::ActiveModel {
        name: Set(name),
        reset_time: Set(input.reset_time),
        class_time: Set(input.class_time),
        lesson_duration: Set(input.lesson_duration),
        weekdays: Set(schedule::format_weekdays(&weekdays)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created grade {}", grade.name);
    Ok(grade)
}

/// Finds a grade by primary key.
pub async fn get_grade(db: &DatabaseConnection, id: i64) -> Result<Option<grade::Model>> {
    Grade::find_by_id(id).one(db).await.map_err(Into::into)
}

/// All grades, alphabetically.
pub async fn get_all_grades(db: &DatabaseConnection) -> Result<Vec<grade::Model>> {
    Grade::find()
        .order_by_asc(grade::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a grade, unassigning its students in the same transaction.
///
/// Refused with [`Error::GradeInUse`] while the grade has open attendance
/// records. Archived history keeps its snapshots with the grade link cleared.
///
/// # Returns
/// The number of students that were unassigned
pub async fn delete_grade(db: &DatabaseConnection, id: i64) -> Result<u64> {
    let txn = db.begin().await?;

    let grade = Grade::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Grade", id))?;

    let open_records = Attendance::find()
        .filter(attendance::Column::GradeId.eq(id))
        .count(&txn)
        .await?;
    if open_records > 0 {
        return Err(Error::GradeInUse { grade: grade.name });
    }

    let unassigned = Student::update_many()
        .col_expr(student::Column::GradeId, Expr::value(Option::<i64>::None))
        .filter(student::Column::GradeId.eq(id))
        .exec(&txn)
        .await?
        .rows_affected;

    Grade::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted grade {} ({} student(s) unassigned)", grade.name, unassigned);
    Ok(unassigned)
}

/// Students assigned to a grade, by last then first name.
pub async fn get_grade_students(
    db: &DatabaseConnection,
    grade_id: i64,
) -> Result<Vec<student::Model>> {
    Student::find()
        .filter(student::Column::GradeId.eq(grade_id))
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Moves a student into a grade.
pub async fn assign_student(
    db: &DatabaseConnection,
    grade_id: i64,
    student_id: i64,
) -> Result<student::Model> {
    Grade::find_by_id(grade_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Grade", grade_id))?;
    set_student_grade(db, student_id, Some(grade_id)).await
}

/// Takes a student out of their grade.
pub async fn remove_student(db: &DatabaseConnection, student_id: i64) -> Result<student::Model> {
    set_student_grade(db, student_id, None).await
}

async fn set_student_grade(
    db: &DatabaseConnection,
    student_id: i64,
    grade_id: Option<i64>,
) -> Result<student::Model> {
    let student = Student::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Student", student_id))?;

    let mut active: student::ActiveModel = student.into();
    active.grade_id = Set(grade_id);
    active.update(db).await.map_err(Into::into)
}

/// Students not assigned to any grade.
pub async fn get_unassigned_students(db: &DatabaseConnection) -> Result<Vec<student::Model>> {
    Student::find()
        .filter(student::Column::GradeId.is_null())
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .all(db)
        .await
        .map_err(Into::into)
}
