use async_trait::async_trait;

use crate::{Currency, ResultEngine};

/// Source of current conversion rates.
///
/// The production implementation lives in the `rates` crate and talks to an
/// external HTTP API; tests inject fixed tables. A returned rate is the
/// number of major units of `target` per major unit of `source`.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Current rate for the pair.
    ///
    /// Errors with `RateUnavailable` when the provider cannot be reached and
    /// `UnsupportedCurrency` when the provider does not quote the pair.
    async fn rate(&self, source: Currency, target: Currency) -> ResultEngine<f64>;
}
