use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{Currency, EngineError, ResultEngine, User, balances, users};

use super::{Engine, with_tx};

/// Opening balance granted to every new user: 1000.00 USD.
const STARTING_BALANCE_MINOR: i64 = 100_000;
const STARTING_BALANCE_CURRENCY: Currency = Currency::Usd;

impl Engine {
    /// Creates a user and seeds their opening balance in one transaction.
    ///
    /// `password_hash` must already be hashed; the engine never sees clear
    /// text passwords.
    pub async fn register_user(&self, username: &str, password_hash: &str) -> ResultEngine<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(EngineError::InvalidAmount(
                "username must not be empty".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            async {
                if users::Entity::find_by_id(username).one(&db_tx).await?.is_some() {
                    return Err(EngineError::ExistingKey(username.to_string()));
                }

                let model = users::ActiveModel {
                    username: ActiveValue::Set(username.to_string()),
                    password: ActiveValue::Set(password_hash.to_string()),
                    created_at: ActiveValue::Set(Utc::now()),
                }
                .insert(&db_tx)
                .await?;

                balances::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    username: ActiveValue::Set(username.to_string()),
                    currency: ActiveValue::Set(STARTING_BALANCE_CURRENCY.code().to_string()),
                    amount_minor: ActiveValue::Set(STARTING_BALANCE_MINOR),
                }
                .insert(&db_tx)
                .await?;

                Ok(User::from(model))
            }
            .await
        })
    }

    /// Looks a user up by username.
    pub async fn find_user(&self, username: &str) -> ResultEngine<Option<User>> {
        let model = users::Entity::find_by_id(username)
            .one(&self.database)
            .await?;
        Ok(model.map(User::from))
    }
}
