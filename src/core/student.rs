//! Student business logic - Enrollment, lookup, guardians and attendance counters.
//!
//! Students get two identifiers on creation: a human-readable `student_id`
//! (`YYYYMMDD-NNNNN`, see [`generate_student_id`]) and a random UUID used on
//! check-in cards.

use crate::{
    core::{payment, validation},
    entities::{
        Grade, Guardian, PaymentPlan, Student, StudentGuardian, guardian, student,
        student_guardian,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use sea_orm::{
    Condition, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::Deserialize;
use std::ops::RangeInclusive;
use tracing::{info, warn};

/// Random draws tried before falling back to the clock.
pub const MAX_ID_ATTEMPTS: usize = 100;

/// Range of the numeric suffix of a generated student ID.
pub const ID_SUFFIX_RANGE: RangeInclusive<u32> = 10_000..=99_999;

/// Fields accepted when creating or updating a student.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StudentInput {
    /// Given name, 1-20 characters
    pub first_name: String,
    /// Family name, 1-20 characters
    pub last_name: String,
    /// Inactive students are left out of new sessions
    pub active: bool,
    /// Empty or exactly 10 digits
    pub phone_number: String,
    /// Postal address
    pub address: String,
    /// Grade to assign
    pub grade_id: Option<i64>,
    /// Outside school
    pub school: String,
    /// Year at the outside school
    pub school_year: String,
    /// Date of birth
    pub birth_date: Option<NaiveDate>,
    /// Tuition plan
    pub payment_plan_id: Option<i64>,
    /// Contact email
    pub email: String,
    /// Enrollment date; today when omitted on creation, unchanged when omitted on update
    pub date_joined: Option<NaiveDate>,
    /// Replaces the guardian links when present
    pub guardian_ids: Option<Vec<i64>>,
}

impl Default for StudentInput {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            active: true,
            phone_number: String::new(),
            address: String::new(),
            grade_id: None,
            school: String::new(),
            school_year: String::new(),
            birth_date: None,
            payment_plan_id: None,
            email: String::new(),
            date_joined: None,
            guardian_ids: None,
        }
    }
}

/// Input after trimming and validation
struct CleanStudent {
    first_name: String,
    last_name: String,
    phone_number: String,
    address: String,
    school: String,
    school_year: String,
    email: String,
}

impl StudentInput {
    fn validate(&self) -> Result<CleanStudent> {
        Ok(CleanStudent {
            first_name: validation::required_text("First name", &self.first_name, 20)?,
            last_name: validation::required_text("Last name", &self.last_name, 20)?,
            phone_number: validation::phone_number("Phone number", &self.phone_number, false)?,
            address: validation::optional_text("Address", &self.address, 20)?,
            school: validation::optional_text("School", &self.school, 20)?,
            school_year: validation::optional_text("School year", &self.school_year, 20)?,
            email: validation::optional_text("Email", &self.email, 30)?,
        })
    }
}

/// Builds the candidate ID `YYYYMMDD-NNNNN`.
#[must_use]
pub fn candidate_student_id(date_joined: NaiveDate, suffix: u32) -> String {
    format!("{}-{suffix}", date_joined.format("%Y%m%d"))
}

/// ID used when every random draw collided: the current microsecond,
/// zero-padded to six digits and cut to the first five.
#[must_use]
pub fn fallback_student_id(date_joined: NaiveDate, now: DateTime<Utc>) -> String {
    let micros = format!("{:06}", now.timestamp_subsec_micros() % 1_000_000);
    let suffix: String = micros.chars().take(5).collect();
    format!("{}-{suffix}", date_joined.format("%Y%m%d"))
}

/// Picks an unused student ID for a student joining on `date_joined`.
///
/// Tries up to [`MAX_ID_ATTEMPTS`] random suffixes, then falls back to
/// [`fallback_student_id`]. The unique index on `students.student_id` remains
/// the final guard.
pub async fn generate_student_id<C>(db: &C, date_joined: NaiveDate) -> Result<String>
where
    C: ConnectionTrait,
{
    for _ in 0..MAX_ID_ATTEMPTS {
        let suffix = rand::thread_rng().gen_range(ID_SUFFIX_RANGE);
        let candidate = candidate_student_id(date_joined, suffix);
        let taken = Student::find()
            .filter(student::Column::StudentId.eq(candidate.as_str()))
            .one(db)
            .await?
            .is_some();
        if !taken {
            return Ok(candidate);
        }
    }

    let fallback = fallback_student_id(date_joined, Utc::now());
    warn!(
        "No free student ID after {} attempts, using {}",
        MAX_ID_ATTEMPTS, fallback
    );
    Ok(fallback)
}

async fn check_references<C>(db: &C, input: &StudentInput) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(grade_id) = input.grade_id {
        Grade::find_by_id(grade_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Grade", grade_id))?;
    }
    if let Some(plan_id) = input.payment_plan_id {
        PaymentPlan::find_by_id(plan_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Payment plan", plan_id))?;
    }
    Ok(())
}

/// Creates a student with fresh identifiers and zeroed counters.
///
/// Guardian links are set when `guardian_ids` is given, and a payment is opened
/// for the student's plan. Everything happens in one transaction.
pub async fn create_student(
    db: &DatabaseConnection,
    input: StudentInput,
) -> Result<student::Model> {
    let clean = input.validate()?;

    let txn = db.begin().await?;
    check_references(&txn, &input).await?;

    let date_joined = input
        .date_joined
        .unwrap_or_else(|| Utc::now().date_naive());
    let student_id = generate_student_id(&txn, date_joined).await?;

    let student = student::ActiveModel {
        first_name: Set(clean.first_name),
        last_name: Set(clean.last_name),
        active: Set(input.active),
        phone_number: Set(clean.phone_number),
        address: Set(clean.address),
        grade_id: Set(input.grade_id),
        school: Set(clean.school),
        school_year: Set(clean.school_year),
        birth_date: Set(input.birth_date),
        payment_plan_id: Set(input.payment_plan_id),
        presences: Set(0),
        absences: Set(0),
        email: Set(clean.email),
        uuid: Set(Uuid::new_v4()),
        date_joined: Set(date_joined),
        student_id: Set(student_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if let Some(guardian_ids) = &input.guardian_ids {
        replace_guardians(&txn, student.id, guardian_ids).await?;
    }
    if let Some(plan_id) = student.payment_plan_id {
        payment::ensure_payment_for_plan(&txn, student.id, plan_id).await?;
    }

    txn.commit().await?;
    info!("Created student {} ({})", student.full_name(), student.student_id);
    Ok(student)
}

/// Updates a student's editable fields.
///
/// Identifiers and attendance counters never change here. Switching to a plan
/// the student has no payment for opens one.
pub async fn update_student(
    db: &DatabaseConnection,
    id: i64,
    input: StudentInput,
) -> Result<student::Model> {
    let clean = input.validate()?;

    let txn = db.begin().await?;
    let existing = Student::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Student", id))?;
    check_references(&txn, &input).await?;

    let mut active: student::ActiveModel = existing.into();
    active.first_name = Set(clean.first_name);
    active.last_name = Set(clean.last_name);
    active.active = Set(input.active);
    active.phone_number = Set(clean.phone_number);
    active.address = Set(clean.address);
    active.grade_id = Set(input.grade_id);
    active.school = Set(clean.school);
    active.school_year = Set(clean.school_year);
    active.birth_date = Set(input.birth_date);
    active.payment_plan_id = Set(input.payment_plan_id);
    active.email = Set(clean.email);
    if let Some(date_joined) = input.date_joined {
        active.date_joined = Set(date_joined);
    }
    let student = active.update(&txn).await?;

    if let Some(guardian_ids) = &input.guardian_ids {
        replace_guardians(&txn, student.id, guardian_ids).await?;
    }
    if let Some(plan_id) = student.payment_plan_id {
        payment::ensure_payment_for_plan(&txn, student.id, plan_id).await?;
    }

    txn.commit().await?;
    Ok(student)
}

/// Finds a student by primary key.
pub async fn get_student(db: &DatabaseConnection, id: i64) -> Result<Option<student::Model>> {
    Student::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Finds a student by the UUID printed on their check-in card.
pub async fn get_student_by_uuid(
    db: &DatabaseConnection,
    uuid: Uuid,
) -> Result<Option<student::Model>> {
    Student::find()
        .filter(student::Column::Uuid.eq(uuid))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists students ordered by last then first name.
///
/// `search` matches first name, last name or phone number as a case-insensitive
/// substring. Blank searches list everyone.
pub async fn list_students(
    db: &DatabaseConnection,
    search: Option<&str>,
) -> Result<Vec<student::Model>> {
    let mut query = Student::find();
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(student::Column::FirstName.contains(term))
                .add(student::Column::LastName.contains(term))
                .add(student::Column::PhoneNumber.contains(term)),
        );
    }
    query
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists active students ordered by last then first name.
pub async fn list_active_students(db: &DatabaseConnection) -> Result<Vec<student::Model>> {
    Student::find()
        .filter(student::Column::Active.eq(true))
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active students of one grade, in roll-call order.
pub async fn active_students_in_grade<C>(db: &C, grade_id: i64) -> Result<Vec<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find()
        .filter(student::Column::GradeId.eq(grade_id))
        .filter(student::Column::Active.eq(true))
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .order_by_asc(student::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a student. Attendance rows, payments, receipts and guardian links go
/// with it through the foreign keys.
pub async fn delete_student(db: &DatabaseConnection, id: i64) -> Result<()> {
    let result = Student::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Student", id));
    }
    info!("Deleted student {}", id);
    Ok(())
}

/// Guardians linked to a student, by last name.
pub async fn get_student_guardians(
    db: &DatabaseConnection,
    student_id: i64,
) -> Result<Vec<guardian::Model>> {
    let student = Student::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Student", student_id))?;
    student
        .find_related(Guardian)
        .order_by_asc(guardian::Column::LastName)
        .order_by_asc(guardian::Column::FirstName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces the guardians linked to a student.
pub async fn set_guardians(
    db: &DatabaseConnection,
    student_id: i64,
    guardian_ids: &[i64],
) -> Result<Vec<guardian::Model>> {
    let txn = db.begin().await?;
    Student::find_by_id(student_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Student", student_id))?;
    replace_guardians(&txn, student_id, guardian_ids).await?;
    txn.commit().await?;

    get_student_guardians(db, student_id).await
}

async fn replace_guardians<C>(db: &C, student_id: i64, guardian_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut ids = guardian_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    for id in &ids {
        Guardian::find_by_id(*id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Guardian", id))?;
    }

    StudentGuardian::delete_many()
        .filter(student_guardian::Column::StudentId.eq(student_id))
        .exec(db)
        .await?;

    if !ids.is_empty() {
        let links = ids.into_iter().map(|guardian_id| student_guardian::ActiveModel {
            student_id: Set(student_id),
            guardian_id: Set(guardian_id),
        });
        StudentGuardian::insert_many(links)
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}

/// Adds one to the student's presences (or absences) in a single UPDATE.
pub async fn increment_attendance_counter<C>(db: &C, student_id: i64, present: bool) -> Result<()>
where
    C: ConnectionTrait,
{
    let column = if present {
        student::Column::Presences
    } else {
        student::Column::Absences
    };

    let result = Student::update_many()
        .col_expr(column, Expr::col(column).add(1))
        .filter(student::Column::Id.eq(student_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::not_found("Student", student_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::Payment;
    use crate::test_utils::*;
    use chrono::{TimeDelta, TimeZone};
    use sea_orm::PaginatorTrait;
    use std::collections::HashSet;

    fn named(first: &str, last: &str) -> StudentInput {
        StudentInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_student_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_student(&db, named("", "Papadopoulos")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_student(&db, named("Maria", &"x".repeat(21))).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut input = named("Maria", "Papadopoulos");
        input.phone_number = "12345".to_string();
        let result = create_student(&db, input).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_student_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let joined = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();

        let mut input = named("  Maria ", "Papadopoulos");
        input.phone_number = "6912345678".to_string();
        input.date_joined = Some(joined);
        let student = create_student(&db, input).await?;

        assert_eq!(student.first_name, "Maria");
        assert!(student.active);
        assert_eq!(student.presences, 0);
        assert_eq!(student.absences, 0);
        assert_eq!(student.date_joined, joined);

        let (date_part, suffix) = student.student_id.split_once('-').unwrap();
        assert_eq!(date_part, "20240902");
        let suffix: u32 = suffix.parse().unwrap();
        assert!(ID_SUFFIX_RANGE.contains(&suffix));

        let by_uuid = get_student_by_uuid(&db, student.uuid).await?.unwrap();
        assert_eq!(by_uuid.id, student.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_create_student_unknown_grade() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = named("Maria", "Papadopoulos");
        input.grade_id = Some(42);
        let result = create_student(&db, input).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Grade", .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_sequential_ids_are_unique() -> Result<()> {
        let db = setup_test_db().await?;
        let joined = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let mut ids = HashSet::new();
        for i in 0..100 {
            let mut input = named("Student", &format!("Number{i}"));
            input.date_joined = Some(joined);
            let student = create_student(&db, input).await?;
            assert!(student.student_id.starts_with("20240115-"));
            ids.insert(student.student_id);
        }
        assert_eq!(ids.len(), 100);

        Ok(())
    }

    #[test]
    fn test_fallback_student_id() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 15).unwrap();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let now = base + TimeDelta::microseconds(123_456);
        assert_eq!(fallback_student_id(date, now), "20231215-12345");

        let now = base + TimeDelta::microseconds(42);
        assert_eq!(fallback_student_id(date, now), "20231215-00004");
    }

    #[test]
    fn test_candidate_student_id() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 15).unwrap();
        assert_eq!(candidate_student_id(date, 10_000), "20231215-10000");
    }

    #[tokio::test]
    async fn test_list_students_search() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "Maria", "Papadopoulos", None).await?;
        create_test_student(&db, "Nikos", "Georgiou", None).await?;
        let mut input = named("Eleni", "Ioannou");
        input.phone_number = "2101234567".to_string();
        create_student(&db, input).await?;

        let all = list_students(&db, None).await?;
        let last_names: Vec<_> = all.iter().map(|s| s.last_name.as_str()).collect();
        assert_eq!(last_names, vec!["Georgiou", "Ioannou", "Papadopoulos"]);

        let found = list_students(&db, Some("MARIA")).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].first_name, "Maria");

        let found = list_students(&db, Some("210123")).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].last_name, "Ioannou");

        assert_eq!(list_students(&db, Some("  ")).await?.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_active_students() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_student(&db, "Maria", "Papadopoulos", None).await?;
        let mut input = named("Nikos", "Georgiou");
        input.active = false;
        create_student(&db, input).await?;

        let active = list_active_students(&db).await?;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].first_name, "Maria");

        Ok(())
    }

    #[tokio::test]
    async fn test_plan_opens_payment_once() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_test_plan(&db, "Standard", 100, 50, 3).await?;

        let mut input = named("Maria", "Papadopoulos");
        input.payment_plan_id = Some(plan.plan.id);
        let student = create_student(&db, input.clone()).await?;
        assert_eq!(Payment::find().count(&db).await?, 1);

        update_student(&db, student.id, input).await?;
        assert_eq!(Payment::find().count(&db).await?, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_student_keeps_identifiers() -> Result<()> {
        let db = setup_test_db().await?;
        let student = create_test_student(&db, "Maria", "Papadopoulos", None).await?;
        increment_attendance_counter(&db, student.id, true).await?;

        let updated = update_student(&db, student.id, named("Mary", "Papadopoulou")).await?;
        assert_eq!(updated.first_name, "Mary");
        assert_eq!(updated.uuid, student.uuid);
        assert_eq!(updated.student_id, student.student_id);
        assert_eq!(updated.date_joined, student.date_joined);
        assert_eq!(updated.presences, 1);

        let result = update_student(&db, 999, named("A", "B")).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_set_guardians_replaces_links() -> Result<()> {
        let db = setup_test_db().await?;
        let student = create_test_student(&db, "Maria", "Papadopoulos", None).await?;
        let mother = create_test_guardian(&db, "Anna", "Papadopoulou").await?;
        let father = create_test_guardian(&db, "Giorgos", "Papadopoulos").await?;

        let linked = set_guardians(&db, student.id, &[mother.id, father.id, mother.id]).await?;
        assert_eq!(linked.len(), 2);

        let linked = set_guardians(&db, student.id, &[father.id]).await?;
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, father.id);

        let result = set_guardians(&db, student.id, &[999]).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Guardian", .. })));
        // A failed replacement leaves the previous links alone
        assert_eq!(get_student_guardians(&db, student.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_student_cascades() -> Result<()> {
        let db = setup_test_db().await?;
        let plan = create_test_plan(&db, "Standard", 100, 50, 3).await?;
        let mut input = named("Maria", "Papadopoulos");
        input.payment_plan_id = Some(plan.plan.id);
        let student = create_student(&db, input).await?;
        let guardian = create_test_guardian(&db, "Anna", "Papadopoulou").await?;
        set_guardians(&db, student.id, &[guardian.id]).await?;

        delete_student(&db, student.id).await?;

        assert!(get_student(&db, student.id).await?.is_none());
        assert_eq!(Payment::find().count(&db).await?, 0);
        assert_eq!(StudentGuardian::find().count(&db).await?, 0);
        // The guardian record itself stays
        assert!(Guardian::find_by_id(guardian.id).one(&db).await?.is_some());

        let result = delete_student(&db, student.id).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_increment_attendance_counter() -> Result<()> {
        let db = setup_test_db().await?;
        let student = create_test_student(&db, "Maria", "Papadopoulos", None).await?;

        increment_attendance_counter(&db, student.id, true).await?;
        increment_attendance_counter(&db, student.id, true).await?;
        increment_attendance_counter(&db, student.id, false).await?;

        let student = get_student(&db, student.id).await?.unwrap();
        assert_eq!(student.presences, 2);
        assert_eq!(student.absences, 1);

        let result = increment_attendance_counter(&db, 999, true).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        Ok(())
    }
}
