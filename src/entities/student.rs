//! Student entity - Identity, contact and bookkeeping data for one student.
//!
//! `student_id` is the human-readable identifier (`YYYYMMDD-NNNNN`) and `uuid` is
//! the opaque identifier encoded in the student's check-in card.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Unique identifier for the student
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Inactive students are left out of new attendance sessions
    pub active: bool,
    /// Empty or exactly 10 digits
    pub phone_number: String,
    /// Postal address
    pub address: String,
    /// Grade the student attends, if assigned
    pub grade_id: Option<i64>,
    /// School the student attends outside this one
    pub school: String,
    /// School year at that school
    pub school_year: String,
    /// Date of birth
    pub birth_date: Option<Date>,
    /// Tuition plan, if any
    pub payment_plan_id: Option<i64>,
    /// Number of archived sessions the student attended
    pub presences: i32,
    /// Number of archived sessions the student missed
    pub absences: i32,
    /// Contact email
    pub email: String,
    /// Opaque identifier used for check-in scanning
    #[sea_orm(unique)]
    pub uuid: Uuid,
    /// Enrollment date, also the prefix of `student_id`
    pub date_joined: Date,
    /// Human-readable identifier, `YYYYMMDD-NNNNN`
    #[sea_orm(unique)]
    pub student_id: String,
}

impl Model {
    /// Full display name, "First Last".
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Defines relationships between Student and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each student belongs to at most one grade
    #[sea_orm(
        belongs_to = "super::grade::Entity",
        from = "Column::GradeId",
        to = "super::grade::Column::Id",
        on_delete = "SetNull"
    )]
    Grade,
    /// Each student follows at most one payment plan
    #[sea_orm(
        belongs_to = "super::payment_plan::Entity",
        from = "Column::PaymentPlanId",
        to = "super::payment_plan::Column::Id",
        on_delete = "SetNull"
    )]
    PaymentPlan,
    /// Open attendance records
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,
    /// Payments made under any plan
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::grade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grade.def()
    }
}

impl Related<super::payment_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentPlan.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::guardian::Entity> for Entity {
    fn to() -> RelationDef {
        super::student_guardian::Relation::Guardian.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::student_guardian::Relation::Student.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
