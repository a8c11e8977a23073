//! Payment plan entity - A tuition scheme with a one-time fee and a monthly fee.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment plan database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_plans")]
pub struct Model {
    /// Unique identifier for the plan
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Plan name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Registration fee charged once, covered before any month
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub one_time_fee: Decimal,
    /// Fee per eligible month
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub monthly_fee: Decimal,
}

/// Defines relationships between `PaymentPlan` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One plan has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::month::Entity> for Entity {
    fn to() -> RelationDef {
        super::payment_plan_month::Relation::Month.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::payment_plan_month::Relation::PaymentPlan.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
