use sea_orm::{QueryFilter, QueryOrder, prelude::*};

use crate::{ResultEngine, balances, balances::Balance};

use super::Engine;

impl Engine {
    /// All balance rows for a user, ordered by currency code.
    pub async fn balances(&self, username: &str) -> ResultEngine<Vec<Balance>> {
        let models = balances::Entity::find()
            .filter(balances::Column::Username.eq(username))
            .order_by_asc(balances::Column::Currency)
            .all(&self.database)
            .await?;

        models.into_iter().map(Balance::try_from).collect()
    }
}
