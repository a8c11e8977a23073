//! Grade entity - A class/section of students with its own attendance schedule.
//!
//! A grade opens an attendance session either at its weekly class time or at its
//! daily reset time, and the session is archived once `lesson_duration` hours pass.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grade database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grades")]
pub struct Model {
    /// Unique identifier for the grade
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Robotics A")
    pub name: String,
    /// Daily time-of-day (UTC) at which a session opens when no weekly schedule matches
    pub reset_time: Time,
    /// Weekly class start time (UTC), used together with `weekdays`
    pub class_time: Option<Time>,
    /// Length of a lesson in hours; sessions older than this are archived
    pub lesson_duration: i32,
    /// Comma-separated weekday tags, e.g. `"MONDAY,WEDNESDAY"`
    pub weekdays: String,
}

/// Defines relationships between Grade and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One grade has many students
    #[sea_orm(has_many = "super::student::Entity")]
    Students,
    /// Open attendance records of the current session
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
    /// Archived sessions
    #[sea_orm(has_many = "super::attendance_history::Entity")]
    History,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl Related<super::attendance_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
