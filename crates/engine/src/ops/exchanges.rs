use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::Expr, prelude::*,
};

use crate::{
    Currency, EngineError, ResultEngine, balances, convert_minor, exchanges,
    exchanges::Exchange, fee_minor,
};

use super::{Engine, with_tx};

/// One exchange request, already reduced to minor units.
#[derive(Clone, Debug)]
pub struct ExchangeCmd {
    pub username: String,
    pub source: Currency,
    pub target: Currency,
    /// Amount to debit from the source balance, in source minor units.
    pub amount_minor: i64,
}

/// Filters for listing exchange history.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct ExchangeListFilter {
    /// If present, matches exchanges whose source or target equals this code.
    pub currency: Option<Currency>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExchangesCursor {
    created_at: DateTime<Utc>,
    exchange_id: String,
}

impl ExchangesCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid exchanges cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input)
            .map_err(|_| EngineError::InvalidCursor("invalid exchanges cursor".to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid exchanges cursor".to_string()))
    }
}

fn validate_list_filter(filter: &ExchangeListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    /// Performs one currency exchange for a user.
    ///
    /// Checks the source balance and fetches the current rate, then, inside
    /// a single database transaction: debits the source balance, credits
    /// (or creates) the target balance and appends the exchange record.
    /// Balance writes are guarded by a compare-and-set on the previously
    /// read amount, so two racing exchanges over the same row cannot both
    /// apply; the loser gets `Conflict` and can retry.
    pub async fn exchange(&self, cmd: ExchangeCmd) -> ResultEngine<Exchange> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        if cmd.source == cmd.target {
            return Err(EngineError::InvalidAmount(
                "source and target currency must differ".to_string(),
            ));
        }

        // An amount equal to the fee is allowed and converts to zero.
        let fee = fee_minor(cmd.source);
        if cmd.amount_minor < fee {
            return Err(EngineError::InsufficientFunds(format!(
                "amount must cover the {fee} minor unit fee"
            )));
        }

        // Funds check first: insufficient requests never hit the rate API.
        let source_row = balances::Entity::find()
            .filter(balances::Column::Username.eq(cmd.username.as_str()))
            .filter(balances::Column::Currency.eq(cmd.source.code()))
            .one(&self.database)
            .await?
            .ok_or_else(|| {
                EngineError::InsufficientFunds(format!("no {} balance", cmd.source.code()))
            })?;

        if source_row.amount_minor < cmd.amount_minor {
            return Err(EngineError::InsufficientFunds(format!(
                "balance {} is below the requested {}",
                source_row.amount_minor, cmd.amount_minor
            )));
        }

        // Network I/O stays outside the database transaction.
        let rate = self.rates.rate(cmd.source, cmd.target).await?;
        let converted_minor = convert_minor(cmd.amount_minor - fee, cmd.source, cmd.target, rate)?;

        let exchange = Exchange::new(
            cmd.username.clone(),
            cmd.source,
            cmd.target,
            cmd.amount_minor,
            converted_minor,
            rate,
            Utc::now(),
        )?;

        with_tx!(self, |db_tx| {
            async {
                let debited = balances::Entity::update_many()
                    .col_expr(
                        balances::Column::AmountMinor,
                        Expr::value(source_row.amount_minor - cmd.amount_minor),
                    )
                    .filter(balances::Column::Id.eq(source_row.id.as_str()))
                    .filter(balances::Column::AmountMinor.eq(source_row.amount_minor))
                    .exec(&db_tx)
                    .await?;
                if debited.rows_affected == 0 {
                    return Err(EngineError::Conflict(format!(
                        "{} balance changed underneath this exchange",
                        cmd.source.code()
                    )));
                }

                let target_row = balances::Entity::find()
                    .filter(balances::Column::Username.eq(cmd.username.as_str()))
                    .filter(balances::Column::Currency.eq(cmd.target.code()))
                    .one(&db_tx)
                    .await?;

                match target_row {
                    Some(row) => {
                        let credited = balances::Entity::update_many()
                            .col_expr(
                                balances::Column::AmountMinor,
                                Expr::value(row.amount_minor + converted_minor),
                            )
                            .filter(balances::Column::Id.eq(row.id.as_str()))
                            .filter(balances::Column::AmountMinor.eq(row.amount_minor))
                            .exec(&db_tx)
                            .await?;
                        if credited.rows_affected == 0 {
                            return Err(EngineError::Conflict(format!(
                                "{} balance changed underneath this exchange",
                                cmd.target.code()
                            )));
                        }
                    }
                    None => {
                        balances::ActiveModel {
                            id: ActiveValue::Set(Uuid::new_v4().to_string()),
                            username: ActiveValue::Set(cmd.username.clone()),
                            currency: ActiveValue::Set(cmd.target.code().to_string()),
                            amount_minor: ActiveValue::Set(converted_minor),
                        }
                        .insert(&db_tx)
                        .await?;
                    }
                }

                exchanges::ActiveModel::from(&exchange).insert(&db_tx).await?;

                Ok(exchange)
            }
            .await
        })
    }

    /// Newest-first page of a user's exchange history.
    ///
    /// Returns the page plus an opaque cursor for the next (older) page, or
    /// `None` when the history is exhausted.
    pub async fn list_exchanges(
        &self,
        username: &str,
        filter: &ExchangeListFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Exchange>, Option<String>)> {
        validate_list_filter(filter)?;
        let limit = limit.clamp(1, 200);

        let mut query = exchanges::Entity::find()
            .filter(exchanges::Column::Username.eq(username));

        if let Some(currency) = filter.currency {
            query = query.filter(
                Condition::any()
                    .add(exchanges::Column::SourceCurrency.eq(currency.code()))
                    .add(exchanges::Column::TargetCurrency.eq(currency.code())),
            );
        }
        if let Some(from) = filter.from {
            query = query.filter(exchanges::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(exchanges::Column::CreatedAt.lt(to));
        }

        if let Some(cursor) = cursor {
            let cursor = ExchangesCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(exchanges::Column::CreatedAt.lt(cursor.created_at))
                    .add(
                        Condition::all()
                            .add(exchanges::Column::CreatedAt.eq(cursor.created_at))
                            .add(exchanges::Column::Id.lt(cursor.exchange_id)),
                    ),
            );
        }

        let models = query
            .order_by_desc(exchanges::Column::CreatedAt)
            .order_by_desc(exchanges::Column::Id)
            .limit(limit + 1)
            .all(&self.database)
            .await?;

        let has_more = models.len() as u64 > limit;
        let page: Vec<exchanges::Model> = models.into_iter().take(limit as usize).collect();

        let next_cursor = if has_more {
            match page.last() {
                Some(last) => Some(
                    ExchangesCursor {
                        created_at: last.created_at,
                        exchange_id: last.id.clone(),
                    }
                    .encode()?,
                ),
                None => None,
            }
        } else {
            None
        };

        let exchanges = page
            .into_iter()
            .map(Exchange::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok((exchanges, next_cursor))
    }
}
