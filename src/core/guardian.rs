//! Guardian business logic.

use crate::{
    core::validation,
    entities::{Guardian, Student, StudentGuardian, guardian, student, student_guardian},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

/// Fields accepted when creating or updating a guardian.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuardianInput {
    /// Given name, 1-20 characters
    pub first_name: String,
    /// Family name, 1-20 characters
    pub last_name: String,
    /// Mobile number, exactly 10 digits
    pub phone_number: String,
    /// Postal address
    pub address: String,
    /// Empty or exactly 10 digits
    pub landline_number: String,
    /// Up to 5 characters
    pub postal_code: String,
    /// Occupation
    pub profession: String,
    /// Contact email
    pub email: String,
    /// Replaces the student links when present
    pub student_ids: Option<Vec<i64>>,
}

impl GuardianInput {
    fn into_active_model(self, mut model: guardian::ActiveModel) -> Result<guardian::ActiveModel> {
        model.first_name = Set(validation::required_text("First name", &self.first_name, 20)?);
        model.last_name = Set(validation::required_text("Last name", &self.last_name, 20)?);
        model.phone_number = Set(validation::phone_number(
            "Phone number",
            &self.phone_number,
            true,
        )?);
        model.address = Set(validation::optional_text("Address", &self.address, 20)?);
        model.landline_number = Set(validation::phone_number(
            "Landline number",
            &self.landline_number,
            false,
        )?);
        model.postal_code = Set(validation::optional_text("Postal code", &self.postal_code, 5)?);
        model.profession = Set(validation::optional_text("Profession", &self.profession, 30)?);
        model.email = Set(validation::optional_text("Email", &self.email, 30)?);
        Ok(model)
    }
}

/// Creates a guardian, optionally linking students.
pub async fn create_guardian(
    db: &DatabaseConnection,
    mut input: GuardianInput,
) -> Result<guardian::Model> {
    let student_ids = input.student_ids.take();
    let model = input.into_active_model(<guardian::ActiveModel as Default>::default())?;

    let txn = db.begin().await?;
    let guardian = model.insert(&txn).await?;
    if let Some(ids) = student_ids {
        replace_students(&txn, guardian.id, &ids).await?;
    }
    txn.commit().await?;
    Ok(guardian)
}

/// Updates a guardian. Student links are only touched when `student_ids` is given.
pub async fn update_guardian(
    db: &DatabaseConnection,
    id: i64,
    mut input: GuardianInput,
) -> Result<guardian::Model> {
    let student_ids = input.student_ids.take();

    let txn = db.begin().await?;
    let existing = Guardian::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Guardian", id))?;
    let guardian = input.into_active_model(existing.into())?.update(&txn).await?;
    if let Some(ids) = student_ids {
        replace_students(&txn, guardian.id, &ids).await?;
    }
    txn.commit().await?;
    Ok(guardian)
}

/// Finds a guardian by primary key.
pub async fn get_guardian(db: &DatabaseConnection, id: i64) -> Result<Option<guardian::Model>> {
    Guardian::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Lists guardians by last then first name, optionally filtered by a
/// case-insensitive substring of name, phone, email or profession.
pub async fn list_guardians(
    db: &DatabaseConnection,
    search: Option<&str>,
) -> Result<Vec<guardian::Model>> {
    let mut query = Guardian::find();
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(guardian::Column::FirstName.contains(term))
                .add(guardian::Column::LastName.contains(term))
                .add(guardian::Column::PhoneNumber.contains(term))
                .add(guardian::Column::Email.contains(term))
                .add(guardian::Column::Profession.contains(term)),
        );
    }
    query
        .order_by_asc(guardian::Column::LastName)
        .order_by_asc(guardian::Column::FirstName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Students linked to a guardian.
pub async fn get_guardian_students(
    db: &DatabaseConnection,
    guardian_id: i64,
) -> Result<Vec<student::Model>> {
    let guardian = Guardian::find_by_id(guardian_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Guardian", guardian_id))?;
    guardian
        .find_related(Student)
        .order_by_asc(student::Column::LastName)
        .order_by_asc(student::Column::FirstName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a guardian and its student links.
pub async fn delete_guardian(db: &DatabaseConnection, id: i64) -> Result<()> {
    let result = Guardian::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Guardian", id));
    }
    Ok(())
}

async fn replace_students<C>(db: &C, guardian_id: i64, student_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut ids = student_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    for id in &ids {
        Student::find_by_id(*id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Student", id))?;
    }

    StudentGuardian::delete_many()
        .filter(student_guardian::Column::GuardianId.eq(guardian_id))
        .exec(db)
        .await?;

    if !ids.is_empty() {
        let links = ids.into_iter().map(|student_id| student_guardian::ActiveModel {
            student_id: Set(student_id),
            guardian_id: Set(guardian_id),
        });
        StudentGuardian::insert_many(links)
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}
