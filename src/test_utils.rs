//! Shared test utilities for the school registry.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    api::{self, AppState},
    config::database,
    core::{
        grade::{self, GradeInput},
        guardian::{self, GuardianInput},
        payment::{self, PaymentDetails, PlanDetails, PlanInput},
        student::{self, StudentInput},
    },
    entities::{self, Payment},
    errors::{Error, Result},
};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Creates an in-memory `SQLite` database with all tables initialized and the
/// months seeded. This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    database::create_tables(&db).await?;
    database::seed_months(&db).await?;
    Ok(db)
}

/// Builds the HTTP router over a fresh test database.
///
/// Returns the database too so tests can arrange records directly.
pub async fn test_app(api_token: Option<&str>) -> Result<(axum::Router, DatabaseConnection)> {
    let db = setup_test_db().await?;
    let state = AppState::new(db.clone(), api_token.map(str::to_string));
    Ok((api::router(state), db))
}

/// Creates a grade with a 10:00 reset time, no weekly class and a two hour lesson.
pub async fn create_test_grade(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::grade::Model> {
    grade::create_grade(
        db,
        GradeInput {
            name: name.to_string(),
            reset_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            class_time: None,
            lesson_duration: 2,
            weekdays: String::new(),
        },
    )
    .await
}

/// Creates an active student, optionally assigned to a grade.
pub async fn create_test_student(
    db: &DatabaseConnection,
    first_name: &str,
    last_name: &str,
    grade_id: Option<i64>,
) -> Result<entities::student::Model> {
    student::create_student(
        db,
        StudentInput {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            grade_id,
            ..Default::default()
        },
    )
    .await
}

/// Rebuilds the editable fields of an existing student, for update tests.
pub fn student_input_from(model: &entities::student::Model) -> StudentInput {
    StudentInput {
        first_name: model.first_name.clone(),
        last_name: model.last_name.clone(),
        active: model.active,
        phone_number: model.phone_number.clone(),
        address: model.address.clone(),
        grade_id: model.grade_id,
        school: model.school.clone(),
        school_year: model.school_year.clone(),
        birth_date: model.birth_date,
        payment_plan_id: model.payment_plan_id,
        email: model.email.clone(),
        date_joined: Some(model.date_joined),
        guardian_ids: None,
    }
}

/// Creates a guardian with a valid mobile number.
pub async fn create_test_guardian(
    db: &DatabaseConnection,
    first_name: &str,
    last_name: &str,
) -> Result<entities::guardian::Model> {
    guardian::create_guardian(
        db,
        GuardianInput {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone_number: "6900000000".to_string(),
            ..Default::default()
        },
    )
    .await
}

/// Creates a plan billing for the first `month_count` months of the year.
///
/// # Arguments
/// * `one_time_fee` - Whole currency units
/// * `monthly_fee` - Whole currency units
pub async fn create_test_plan(
    db: &DatabaseConnection,
    name: &str,
    one_time_fee: i64,
    monthly_fee: i64,
    month_count: usize,
) -> Result<PlanDetails> {
    let month_ids = payment::list_months(db)
        .await?
        .into_iter()
        .take(month_count)
        .map(|m| m.id)
        .collect();

    payment::create_plan(
        db,
        PlanInput {
            name: name.to_string(),
            description: String::new(),
            one_time_fee: Decimal::from(one_time_fee),
            monthly_fee: Decimal::from(monthly_fee),
            month_ids,
        },
    )
    .await
}

/// Creates a student following `plan_id` and returns the payment opened for them.
pub async fn create_test_payment(
    db: &DatabaseConnection,
    first_name: &str,
    last_name: &str,
    plan_id: i64,
) -> Result<PaymentDetails> {
    let student = student::create_student(
        db,
        StudentInput {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            payment_plan_id: Some(plan_id),
            ..Default::default()
        },
    )
    .await?;

    let payment = Payment::find()
        .filter(entities::payment::Column::StudentId.eq(student.id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Payment", student.id))?;
    payment::get_payment(db, payment.id)
        .await?
        .ok_or_else(|| Error::not_found("Payment", payment.id))
}
