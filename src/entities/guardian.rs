//! Guardian entity - A parent or guardian linked to one or more students.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guardian database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guardians")]
pub struct Model {
    /// Unique identifier for the guardian
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
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
}

/// Guardians relate to students through `student_guardians`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        super::student_guardian::Relation::Student.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::student_guardian::Relation::Guardian.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
