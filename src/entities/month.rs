//! Month entity - Calendar months a payment plan can bill for.
//!
//! The table is seeded with January..December; `sort_order` fixes the order in
//! which a plan's months are considered paid.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Month database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "months")]
pub struct Model {
    /// Unique identifier for the month
    #[sea_orm(primary_key)]
    pub id: i64,
    /// English month name
    #[sea_orm(unique)]
    pub name: String,
    /// Position in the billing order (1 = first)
    pub sort_order: i32,
}

/// Months relate to plans and payments through join tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Related<super::payment_plan::Entity> for Entity {
    fn to() -> RelationDef {
        super::payment_plan_month::Relation::PaymentPlan.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::payment_plan_month::Relation::Month.def().rev())
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        super::payment_month::Relation::Payment.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::payment_month::Relation::Month.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
