//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod price;
pub mod seed;

use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;

use vitalis_core::PricingError;
use vitalis_storefront::config::{ConfigError, StorefrontConfig};
use vitalis_storefront::db::RepositoryError;
use vitalis_storefront::store::{PersistentStore, PgStore, RestStore, StoreError, create_pool};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Pricing(#[from] PricingError),
}

/// Database URL from `STOREFRONT_DATABASE_URL`, then `DATABASE_URL`.
pub fn database_url() -> Option<SecretString> {
    ["STOREFRONT_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Open the same store the server would use.
///
/// # Errors
///
/// Returns an error if neither a database URL nor Supabase settings are
/// available, or the connection fails.
pub async fn connect_store() -> Result<Arc<dyn PersistentStore>, CliError> {
    dotenvy::dotenv().ok();

    if let Some(url) = database_url() {
        tracing::info!("Connecting to PostgreSQL...");
        let pool = create_pool(&url).await?;
        return Ok(Arc::new(PgStore::new(pool)));
    }

    let config = StorefrontConfig::from_env()?;
    tracing::info!(url = %config.supabase.url, "Connecting to Supabase REST...");
    let store = RestStore::new(
        &config.supabase.url,
        config.supabase.store_key().clone(),
        config.store_timeout,
    )?;
    Ok(Arc::new(store))
}
