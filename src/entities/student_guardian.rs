//! Join table between students and guardians.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student/guardian link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_guardians")]
pub struct Model {
    /// Linked student
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,
    /// Linked guardian
    #[sea_orm(primary_key, auto_increment = false)]
    pub guardian_id: i64,
}

/// Both sides of the link; deleting either side removes the link
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Linked student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    /// Linked guardian
    #[sea_orm(
        belongs_to = "super::guardian::Entity",
        from = "Column::GuardianId",
        to = "super::guardian::Column::Id",
        on_delete = "Cascade"
    )]
    Guardian,
}

impl ActiveModelBehavior for ActiveModel {}
