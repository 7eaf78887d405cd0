//! Per-user, per-currency balances.
//!
//! One row per `(username, currency)` pair; `amount_minor` must never go
//! negative. The uniqueness and the non-negativity are both enforced at the
//! database level (unique index, guarded update), not in process memory.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::{Currency, EngineError};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub username: String,
    pub currency: String,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::Username",
        to = "super::users::Column::Username"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A user's holding of one currency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Balance {
    pub id: Uuid,
    pub username: String,
    pub currency: Currency,
    pub amount_minor: i64,
}

impl TryFrom<Model> for Balance {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("balance not exists".to_string()))?,
            currency: Currency::try_from(model.currency.as_str())?,
            username: model.username,
            amount_minor: model.amount_minor,
        })
    }
}
