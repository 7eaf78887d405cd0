//! Balances API endpoint.

use api_types::balance::{BalanceView, BalancesResponse};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, exchanges::map_currency, server::ServerState};

pub async fn list(
    Extension(user): Extension<engine::User>,
    State(state): State<ServerState>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let balances = state.engine.balances(&user.username).await?;

    let balances = balances
        .into_iter()
        .map(|balance| BalanceView {
            currency: map_currency(balance.currency),
            amount_minor: balance.amount_minor,
            amount: engine::format_minor(balance.amount_minor, balance.currency),
        })
        .collect();

    Ok(Json(BalancesResponse { balances }))
}
