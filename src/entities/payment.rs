//! Payment entity - A student's enrollment in a payment plan for an academic year.
//!
//! `one_time_fee_paid` and the paid months are derived from the receipts by
//! `core::payment::recompute_months_paid`; they are never edited directly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Paying student
    pub student_id: Option<i64>,
    /// Plan being paid
    pub payment_plan_id: i64,
    /// Whether receipts have covered the plan's one-time fee
    pub one_time_fee_paid: bool,
    /// Academic year, e.g. `"2024-2025"`
    pub academic_year: String,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    /// Each payment follows one plan
    #[sea_orm(
        belongs_to = "super::payment_plan::Entity",
        from = "Column::PaymentPlanId",
        to = "super::payment_plan::Column::Id",
        on_delete = "Cascade"
    )]
    PaymentPlan,
    /// One payment has many receipts
    #[sea_orm(has_many = "super::receipt::Entity")]
    Receipts,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::payment_plan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentPlan.def()
    }
}

impl Related<super::receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipts.def()
    }
}

impl Related<super::month::Entity> for Entity {
    fn to() -> RelationDef {
        super::payment_month::Relation::Month.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::payment_month::Relation::Payment.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
