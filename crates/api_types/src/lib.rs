use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currencies the API accepts.
///
/// Serialized as the upper-case ISO 4217 code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Jpy,
    Chf,
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub username: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Refresh {
        pub refresh_token: String,
    }

    /// Tokens returned by login and refresh.
    ///
    /// Tokens are opaque strings; clients must not parse them.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TokenPair {
        pub access_token: String,
        pub refresh_token: String,
        /// Expiry of `access_token`. `refresh_token` lives longer.
        pub expires_at: DateTime<Utc>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub currency: Currency,
        /// Integer minor units (e.g. cents for USD).
        pub amount_minor: i64,
        /// Human-readable major-unit rendering, e.g. `"1000.00"`.
        pub amount: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub balances: Vec<BalanceView>,
    }
}

pub mod exchange {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExchangeNew {
        pub source: Currency,
        pub target: Currency,
        /// Amount in major units of `source`, e.g. `"50"` or `"50.00"`.
        pub amount: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExchangeView {
        pub id: Uuid,
        pub source: Currency,
        pub target: Currency,
        pub amount_minor: i64,
        pub fee_minor: i64,
        pub converted_minor: i64,
        /// Rate applied to the post-fee amount, in major units.
        pub rate: f64,
        /// RFC3339 timestamp, including timezone offset.
        pub created_at: DateTime<FixedOffset>,
    }

    /// Query parameters for the history listing.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExchangeList {
        /// Restrict to exchanges whose source or target matches this code.
        pub currency_code: Option<Currency>,
        /// Inclusive lower bound on the creation date (UTC).
        pub start_date: Option<NaiveDate>,
        /// Inclusive upper bound on the creation date (UTC).
        pub end_date: Option<NaiveDate>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExchangeListResponse {
        pub exchanges: Vec<ExchangeView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }
}
