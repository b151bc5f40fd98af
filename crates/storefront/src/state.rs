//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::identity::IdentityProvider;
use crate::middleware::SessionBackend;
use crate::services::{OrderWorkflow, SessionManager};
use crate::store::PersistentStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The store and identity
/// provider are trait objects so the same router runs against Supabase,
/// Postgres, or the in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn PersistentStore>,
    identity: Arc<dyn IdentityProvider>,
    sessions: SessionBackend,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn PersistentStore>,
        identity: Arc<dyn IdentityProvider>,
        sessions: SessionBackend,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                identity,
                sessions,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Where HTTP sessions are kept.
    #[must_use]
    pub fn sessions(&self) -> &SessionBackend {
        &self.inner.sessions
    }

    /// Get a reference to the persistent store.
    #[must_use]
    pub fn store(&self) -> &dyn PersistentStore {
        self.inner.store.as_ref()
    }

    /// Get a shared handle to the persistent store.
    #[must_use]
    pub fn store_handle(&self) -> Arc<dyn PersistentStore> {
        Arc::clone(&self.inner.store)
    }

    /// Get a shared handle to the identity provider.
    #[must_use]
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.inner.identity)
    }

    /// Order workflow bound to this state's store and timeouts.
    #[must_use]
    pub fn order_workflow(&self) -> OrderWorkflow {
        OrderWorkflow::new(self.store_handle())
            .with_step_timeout(self.inner.config.store_timeout)
            .with_fallback_offset(self.inner.config.fallback_utc_offset)
    }

    /// Fresh, signed-out session manager.
    #[must_use]
    pub fn session_manager(&self) -> SessionManager {
        SessionManager::new(self.identity(), self.store_handle())
            .with_store_timeout(self.inner.config.store_timeout)
    }
}
