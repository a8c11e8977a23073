//! Join table listing the months a payment plan bills for.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Plan/month link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_plan_months")]
pub struct Model {
    /// Linked plan
    #[sea_orm(primary_key, auto_increment = false)]
    pub payment_plan_id: i64,
    /// Linked month
    #[sea_orm(primary_key, auto_increment = false)]
    pub month_id: i64,
}

/// Both sides of the link
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Linked plan
    #[sea_orm(
        belongs_to = "super::payment_plan::Entity",
        from = "Column::PaymentPlanId",
        to = "super::payment_plan::Column::Id",
        on_delete = "Cascade"
    )]
    PaymentPlan,
    /// Linked month
    #[sea_orm(
        belongs_to = "super::month::Entity",
        from = "Column::MonthId",
        to = "super::month::Column::Id",
        on_delete = "Cascade"
    )]
    Month,
}

impl ActiveModelBehavior for ActiveModel {}
