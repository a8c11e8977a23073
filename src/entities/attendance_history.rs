//! Attendance history entity - Immutable snapshot of an archived session.
//!
//! The per-student rows are stored as a JSON array of name/presence snapshots so
//! the history survives later edits or deletion of the students themselves.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One student's line in an archived session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSnapshot {
    /// Student's given name at archive time
    pub first_name: String,
    /// Student's family name at archive time
    pub last_name: String,
    /// Whether the student was present
    pub present: bool,
}

impl AttendanceSnapshot {
    fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Ordered snapshot list, stored as a JSON column
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, FromJsonQueryResult)]
pub struct AttendanceRecords(pub Vec<AttendanceSnapshot>);

/// Attendance history database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_history")]
pub struct Model {
    /// Unique identifier for the history entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Grade the session belonged to; cleared if the grade is deleted
    pub grade_id: Option<i64>,
    /// Date of the session's first record
    pub attendance_date: Date,
    /// Snapshots in session order
    #[sea_orm(column_type = "Json")]
    pub records: AttendanceRecords,
}

impl Model {
    /// Names of students marked present, in session order.
    #[must_use]
    pub fn present_students(&self) -> Vec<String> {
        self.records
            .0
            .iter()
            .filter(|r| r.present)
            .map(AttendanceSnapshot::display_name)
            .collect()
    }

    /// Names of students marked absent, in session order.
    #[must_use]
    pub fn absent_students(&self) -> Vec<String> {
        self.records
            .0
            .iter()
            .filter(|r| !r.present)
            .map(AttendanceSnapshot::display_name)
            .collect()
    }
}

/// Defines relationships between `AttendanceHistory` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each history entry belongs to at most one grade
    #[sea_orm(
        belongs_to = "super::grade::Entity",
        from = "Column::GradeId",
        to = "super::grade::Column::Id",
        on_delete = "SetNull"
    )]
    Grade,
}

impl Related<super::grade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
