use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{EngineError, RateProvider, ResultEngine};

mod balances;
mod exchanges;
mod users;

pub use exchanges::{ExchangeCmd, ExchangeListFilter};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    rates: Arc<dyn RateProvider>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    rates: Option<Arc<dyn RateProvider>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Pass the required rate provider
    pub fn rates(mut self, rates: Arc<dyn RateProvider>) -> EngineBuilder {
        self.rates = Some(rates);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let rates = self
            .rates
            .ok_or_else(|| EngineError::KeyNotFound("rate provider".to_string()))?;
        Ok(Engine {
            database: self.database,
            rates,
        })
    }
}
