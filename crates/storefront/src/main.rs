//! Vitalis storefront - JSON API server.
//!
//! # Architecture
//!
//! - Axum JSON API with tower-sessions for the signed-in user and cart
//! - Supabase (`PostgREST` + `GoTrue`) as the backing store and identity
//!   provider, or direct `PostgreSQL` when a database URL is configured
//! - Sentry + tracing for errors and request logs

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitalis_storefront::config::StorefrontConfig;
use vitalis_storefront::identity::{GoTrueClient, IdentityProvider};
use vitalis_storefront::middleware::SessionBackend;
use vitalis_storefront::state::AppState;
use vitalis_storefront::store::{PersistentStore, PgStore, RestStore, create_pool};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            // Emails and session cookies stay out of events; the user id is
            // attached explicitly on login.
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Only errors become Sentry events.
///
/// Warnings here are rejected logins, non-admin probes and subscription
/// reload misses; they ride along as breadcrumbs on the next real error.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Pick the persistent store and session backend: direct Postgres for both
/// when a database URL is set, otherwise Supabase REST with in-memory
/// sessions.
async fn build_store(config: &StorefrontConfig) -> (Arc<dyn PersistentStore>, SessionBackend) {
    if let Some(database_url) = &config.database_url {
        let pool = create_pool(database_url)
            .await
            .expect("Failed to create database pool");
        tracing::info!("Using PostgreSQL store and sessions");
        let sessions = SessionBackend::postgres(pool.clone());
        sessions.spawn_expired_deletion();
        return (Arc::new(PgStore::new(pool)), sessions);
    }

    let store = RestStore::new(
        &config.supabase.url,
        config.supabase.store_key().clone(),
        config.store_timeout,
    )
    .expect("Failed to create Supabase REST client");
    tracing::info!(url = %config.supabase.url, "Using Supabase REST store, in-memory sessions");
    (Arc::new(store), SessionBackend::in_memory())
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitalis_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p vitalis-cli -- migrate

    let (store, sessions) = build_store(&config).await;
    let identity: Arc<dyn IdentityProvider> = Arc::new(
        GoTrueClient::new(
            &config.supabase.url,
            config.supabase.anon_key.clone(),
            config.store_timeout,
        )
        .expect("Failed to create Supabase auth client"),
    );

    let addr = config.socket_addr();
    let state = AppState::new(config, store, identity, sessions);

    let app = vitalis_storefront::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
