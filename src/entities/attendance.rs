//! Attendance entity - One student's row in a grade's open session.
//!
//! Rows are created in bulk when a session opens, toggled while it runs and
//! removed when the session is archived into `attendance_history`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attendance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendances")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student the record is for; `None` only for rows whose student link was lost
    pub student_id: Option<i64>,
    /// Grade whose session this row belongs to
    pub grade_id: i64,
    /// Whether the student was marked present
    pub present: bool,
    /// Whether the student's presence/absence counter already reflects this row
    pub counted: bool,
    /// When the row was created; the oldest row dates the session
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Attendance and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    /// Each record belongs to one grade
    #[sea_orm(
        belongs_to = "super::grade::Entity",
        from = "Column::GradeId",
        to = "super::grade::Column::Id",
        on_delete = "Restrict"
    )]
    Grade,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::grade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
