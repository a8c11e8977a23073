//! Join table holding the months a payment currently covers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment/month link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_months")]
pub struct Model {
    /// Linked payment
    #[sea_orm(primary_key, auto_increment = false)]
    pub payment_id: i64,
    /// Linked month
    #[sea_orm(primary_key, auto_increment = false)]
    pub month_id: i64,
}

/// Both sides of the link
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Linked payment
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id",
        on_delete = "Cascade"
    )]
    Payment,
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
