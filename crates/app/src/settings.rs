//! Handles settings for the application. Configuration is written in
//! `settings.toml`; any value can be overridden from the environment with
//! the `CAMBIO_` prefix (e.g. `CAMBIO_RATES__API_KEY`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    /// Log level filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Rates {
    /// exchangerate-api.com API key. Keep it out of the TOML file in
    /// production and pass `CAMBIO_RATES__API_KEY` instead.
    pub api_key: String,
    pub base_url: Option<String>,
    pub snapshot_ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub rates: Rates,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("CAMBIO").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
