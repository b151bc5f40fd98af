//! Session middleware configuration.
//!
//! Sessions hold the signed-in user and the cart. With a database configured
//! they live in Postgres and survive restarts. Otherwise they live in a
//! bounded moka cache that evicts the least recently used sessions and drops
//! expired ones on its own.

use std::time::Duration;

use async_trait::async_trait;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "vitalis_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Most sessions kept in memory without a database.
pub const MAX_MEMORY_SESSIONS: u64 = 10_000;

/// How often expired Postgres sessions are swept.
const EXPIRED_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Where HTTP sessions are kept.
#[derive(Debug, Clone)]
pub enum SessionBackend {
    Postgres(PostgresStore),
    Memory(MokaStore),
}

impl SessionBackend {
    /// Bounded in-process sessions.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::Memory(MokaStore::new(Some(MAX_MEMORY_SESSIONS)))
    }

    /// Postgres-backed sessions.
    ///
    /// The `tower_sessions.session` table must be created via migration.
    #[must_use]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::Postgres(PostgresStore::new(pool))
    }

    /// Sweep expired sessions in the background.
    ///
    /// Only Postgres needs this; the moka cache expires entries itself.
    pub fn spawn_expired_deletion(&self) {
        let Self::Postgres(store) = self else {
            return;
        };
        let store = store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(EXPIRED_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(e) = store.delete_expired().await {
                    tracing::warn!(error = %e, "Failed to delete expired sessions");
                }
            }
        });
    }
}

#[async_trait]
impl SessionStore for SessionBackend {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        match self {
            Self::Postgres(store) => store.create(record).await,
            Self::Memory(store) => store.create(record).await,
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        match self {
            Self::Postgres(store) => store.save(record).await,
            Self::Memory(store) => store.save(record).await,
        }
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        match self {
            Self::Postgres(store) => store.load(session_id).await,
            Self::Memory(store) => store.load(session_id).await,
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        match self {
            Self::Postgres(store) => store.delete(session_id).await,
            Self::Memory(store) => store.delete(session_id).await,
        }
    }
}

/// Create the session layer.
#[must_use]
pub fn create_session_layer(
    backend: SessionBackend,
    config: &StorefrontConfig,
) -> SessionManagerLayer<SessionBackend> {
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(backend)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tower_sessions::cookie::time::{self, OffsetDateTime};

    use super::*;

    #[tokio::test]
    async fn test_memory_backend_round_trip() {
        let backend = SessionBackend::in_memory();
        let mut record = Record {
            id: Id::default(),
            data: HashMap::new(),
            expiry_date: OffsetDateTime::now_utc() + time::Duration::minutes(30),
        };
        backend.create(&mut record).await.unwrap();
        let loaded = backend.load(&record.id).await.unwrap();
        assert_eq!(loaded.map(|r| r.id), Some(record.id));

        backend.delete(&record.id).await.unwrap();
        assert!(backend.load(&record.id).await.unwrap().is_none());
    }

    #[test]
    fn test_default_backend_is_bounded_memory() {
        assert!(matches!(SessionBackend::in_memory(), SessionBackend::Memory(_)));
    }
}
