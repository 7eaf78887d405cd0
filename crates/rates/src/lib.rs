//! Rate provider gateway.
//!
//! Talks to the exchangerate-api.com `latest` endpoint and exposes the
//! result through the engine's [`RateProvider`] trait. The provider quotes
//! every supported currency against USD in one response, so a single fetch
//! answers any pair via a cross rate; the last successful table is reused
//! for a short, configurable interval to avoid hammering the API on bursts.
//!
//! No retry or backoff beyond the HTTP client's own timeout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use engine::{Currency, EngineError, RateProvider};

pub const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com";
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(60);

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// One fetched table of USD-based rates.
#[derive(Clone, Debug)]
pub struct RatesTable {
    /// Major units of each currency per 1 USD.
    per_usd: HashMap<String, f64>,
}

impl RatesTable {
    #[must_use]
    pub fn new(per_usd: HashMap<String, f64>) -> Self {
        Self { per_usd }
    }

    /// Cross rate for a pair, both legs quoted against USD.
    pub fn cross(&self, source: Currency, target: Currency) -> Result<f64, EngineError> {
        let source_per_usd = self
            .per_usd
            .get(source.code())
            .copied()
            .ok_or_else(|| EngineError::UnsupportedCurrency(source.code().to_string()))?;
        let target_per_usd = self
            .per_usd
            .get(target.code())
            .copied()
            .ok_or_else(|| EngineError::UnsupportedCurrency(target.code().to_string()))?;

        if source_per_usd <= 0.0 || !source_per_usd.is_finite() || !target_per_usd.is_finite() {
            return Err(EngineError::RateUnavailable(format!(
                "provider quoted a degenerate rate for {source} or {target}"
            )));
        }

        Ok(target_per_usd / source_per_usd)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

/// HTTP client for exchangerate-api.com.
pub struct ExchangeRateClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    snapshot_ttl: Duration,
    snapshot: RwLock<Option<(Instant, RatesTable)>>,
}

impl ExchangeRateClient {
    pub fn new(api_key: String) -> Result<Self, EngineError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string(), DEFAULT_SNAPSHOT_TTL)
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        snapshot_ttl: Duration,
    ) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| EngineError::RateUnavailable(err.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url,
            snapshot_ttl,
            snapshot: RwLock::new(None),
        })
    }

    async fn fetch_table(&self) -> Result<RatesTable, EngineError> {
        if self.api_key.is_empty() {
            return Err(EngineError::RateUnavailable(
                "exchange rate API key not configured".to_string(),
            ));
        }

        let url = format!("{}/v6/{}/latest/USD", self.base_url, self.api_key);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| EngineError::RateUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::RateUnavailable(format!(
                "provider answered {}",
                response.status()
            )));
        }

        let body: LatestRatesResponse = response
            .json()
            .await
            .map_err(|err| EngineError::RateUnavailable(err.to_string()))?;

        if body.result != "success" || body.conversion_rates.is_empty() {
            return Err(EngineError::RateUnavailable(
                "provider returned no conversion rates".to_string(),
            ));
        }

        Ok(RatesTable::new(body.conversion_rates))
    }

    /// Returns the current table, reusing the last fetch within the TTL.
    async fn table(&self) -> Result<RatesTable, EngineError> {
        {
            let snapshot = self.snapshot.read().await;
            if let Some((fetched_at, table)) = snapshot.as_ref()
                && fetched_at.elapsed() < self.snapshot_ttl
            {
                return Ok(table.clone());
            }
        }

        let table = self.fetch_table().await?;
        tracing::debug!("refreshed exchange rate table");

        let mut snapshot = self.snapshot.write().await;
        *snapshot = Some((Instant::now(), table.clone()));
        Ok(table)
    }
}

#[async_trait]
impl RateProvider for ExchangeRateClient {
    async fn rate(&self, source: Currency, target: Currency) -> Result<f64, EngineError> {
        self.table().await?.cross(source, target)
    }
}
