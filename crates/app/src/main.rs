use std::sync::Arc;
use std::time::Duration;

use migration::{Migrator, MigratorTrait};

use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "cambio={level},server={level},engine={level},rates={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;

    let rates_client = match (&settings.rates.base_url, settings.rates.snapshot_ttl_secs) {
        (Some(base_url), ttl) => rates::ExchangeRateClient::with_base_url(
            settings.rates.api_key.clone(),
            base_url.clone(),
            ttl.map(Duration::from_secs)
                .unwrap_or(rates::DEFAULT_SNAPSHOT_TTL),
        )?,
        (None, Some(ttl)) => rates::ExchangeRateClient::with_base_url(
            settings.rates.api_key.clone(),
            rates::DEFAULT_BASE_URL.to_string(),
            Duration::from_secs(ttl),
        )?,
        (None, None) => rates::ExchangeRateClient::new(settings.rates.api_key.clone())?,
    };

    let engine = engine::Engine::builder()
        .database(db.clone())
        .rates(Arc::new(rates_client))
        .build()
        .await?;

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if let Err(err) = server::run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
