//! Exchange ledger primitives.
//!
//! An `Exchange` is the immutable record of one completed conversion:
//! `amount_minor` left the source balance, `converted_minor` entered the
//! target balance, and `fee_minor` left circulation. Rows are append-only.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, fee_minor};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: Uuid,
    pub username: String,
    pub source: Currency,
    pub target: Currency,
    /// Amount debited from the source balance, in source minor units.
    pub amount_minor: i64,
    /// Fixed fee, in source minor units. Debited but never credited.
    pub fee_minor: i64,
    /// Amount credited to the target balance, in target minor units.
    pub converted_minor: i64,
    /// Rate applied to the post-fee amount, in major units.
    pub rate: f64,
    pub created_at: DateTime<Utc>,
}

impl Exchange {
    pub fn new(
        username: String,
        source: Currency,
        target: Currency,
        amount_minor: i64,
        converted_minor: i64,
        rate: f64,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if source == target {
            return Err(EngineError::InvalidAmount(
                "source and target currency must differ".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            username,
            source,
            target,
            amount_minor,
            fee_minor: fee_minor(source),
            converted_minor,
            rate,
            created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "exchanges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub username: String,
    pub source_currency: String,
    pub target_currency: String,
    pub amount_minor: i64,
    pub fee_minor: i64,
    pub converted_minor: i64,
    pub rate: f64,
    pub created_at: DateTimeUtc,
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

impl From<&Exchange> for ActiveModel {
    fn from(exchange: &Exchange) -> Self {
        Self {
            id: ActiveValue::Set(exchange.id.to_string()),
            username: ActiveValue::Set(exchange.username.clone()),
            source_currency: ActiveValue::Set(exchange.source.code().to_string()),
            target_currency: ActiveValue::Set(exchange.target.code().to_string()),
            amount_minor: ActiveValue::Set(exchange.amount_minor),
            fee_minor: ActiveValue::Set(exchange.fee_minor),
            converted_minor: ActiveValue::Set(exchange.converted_minor),
            rate: ActiveValue::Set(exchange.rate),
            created_at: ActiveValue::Set(exchange.created_at),
        }
    }
}

impl TryFrom<Model> for Exchange {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("exchange not exists".to_string()))?,
            username: model.username,
            source: Currency::try_from(model.source_currency.as_str())?,
            target: Currency::try_from(model.target_currency.as_str())?,
            amount_minor: model.amount_minor,
            fee_minor: model.fee_minor,
            converted_minor: model.converted_minor,
            rate: model.rate,
            created_at: model.created_at,
        })
    }
}
