//! Exchange API endpoints.

use api_types::exchange::{ExchangeList, ExchangeListResponse, ExchangeNew, ExchangeView};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{FixedOffset, NaiveTime};

use crate::{ServerError, server::ServerState};

pub(crate) fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Gbp => api_types::Currency::Gbp,
        engine::Currency::Jpy => api_types::Currency::Jpy,
        engine::Currency::Chf => api_types::Currency::Chf,
    }
}

pub(crate) fn map_api_currency(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Gbp => engine::Currency::Gbp,
        api_types::Currency::Jpy => engine::Currency::Jpy,
        api_types::Currency::Chf => engine::Currency::Chf,
    }
}

fn map_exchange(exchange: engine::Exchange, utc: FixedOffset) -> ExchangeView {
    ExchangeView {
        id: exchange.id,
        source: map_currency(exchange.source),
        target: map_currency(exchange.target),
        amount_minor: exchange.amount_minor,
        fee_minor: exchange.fee_minor,
        converted_minor: exchange.converted_minor,
        rate: exchange.rate,
        created_at: exchange.created_at.with_timezone(&utc),
    }
}

fn utc_offset() -> Result<FixedOffset, ServerError> {
    FixedOffset::east_opt(0).ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))
}

pub async fn create(
    Extension(user): Extension<engine::User>,
    State(state): State<ServerState>,
    Json(payload): Json<ExchangeNew>,
) -> Result<(StatusCode, Json<ExchangeView>), ServerError> {
    let source = map_api_currency(payload.source);
    let target = map_api_currency(payload.target);
    let amount_minor = engine::parse_major(&payload.amount, source)?;

    let exchange = state
        .engine
        .exchange(engine::ExchangeCmd {
            username: user.username.clone(),
            source,
            target,
            amount_minor,
        })
        .await?;

    let utc = utc_offset()?;
    Ok((StatusCode::CREATED, Json(map_exchange(exchange, utc))))
}

pub async fn list(
    Extension(user): Extension<engine::User>,
    State(state): State<ServerState>,
    Query(payload): Query<ExchangeList>,
) -> Result<Json<ExchangeListResponse>, ServerError> {
    let limit = payload.limit.unwrap_or(50);

    let from = payload
        .start_date
        .map(|date| date.and_time(NaiveTime::MIN).and_utc());
    // end_date is inclusive: the filter upper bound is the next midnight.
    let to = match payload.end_date {
        Some(date) => Some(
            date.succ_opt()
                .ok_or_else(|| ServerError::Generic("invalid end_date".to_string()))?
                .and_time(NaiveTime::MIN)
                .and_utc(),
        ),
        None => None,
    };

    let filter = engine::ExchangeListFilter {
        currency: payload.currency_code.map(map_api_currency),
        from,
        to,
    };

    let (exchanges, next_cursor) = state
        .engine
        .list_exchanges(&user.username, &filter, limit, payload.cursor.as_deref())
        .await?;

    let utc = utc_offset()?;
    let exchanges = exchanges
        .into_iter()
        .map(|exchange| map_exchange(exchange, utc))
        .collect();

    Ok(Json(ExchangeListResponse {
        exchanges,
        next_cursor,
    }))
}
