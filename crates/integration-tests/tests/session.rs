//! Session manager against the in-memory identity provider and store.

use std::sync::Arc;

use vitalis_integration_tests::{add_account, seed_user};
use vitalis_storefront::error::ErrorKind;
use vitalis_storefront::identity::MemoryIdentityProvider;
use vitalis_storefront::services::{SessionError, SessionManager};
use vitalis_storefront::store::{MemoryStore, StoreOp, Table};

fn manager(identity: &MemoryIdentityProvider, store: &MemoryStore) -> SessionManager {
    SessionManager::new(Arc::new(identity.clone()), Arc::new(store.clone()))
}

#[tokio::test]
async fn test_rejected_login_does_not_touch_store() {
    let identity = MemoryIdentityProvider::new();
    let store = MemoryStore::new();

    let err = manager(&identity, &store)
        .login("bad@x.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::InvalidCredentials));
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
    assert_eq!(identity.sign_in_attempts().await, 1);
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn test_first_login_mirrors_account() {
    let identity = MemoryIdentityProvider::new();
    let store = MemoryStore::new();
    add_account(&identity, "u-ada", "ada@example.com", "correct horse", "Ada Lovelace").await;

    let snapshot = manager(&identity, &store)
        .login("ada@example.com", "correct horse")
        .await
        .unwrap();

    assert_eq!(snapshot.user.id.as_str(), "u-ada");
    assert_eq!(snapshot.user.full_name, "Ada Lovelace");
    assert!(!snapshot.user.is_admin);
    assert!(snapshot.subscriptions.is_empty());

    let rows = store.rows(Table::UserAccount).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_existing_row_is_not_recreated() {
    let identity = MemoryIdentityProvider::new();
    let store = MemoryStore::new();
    add_account(&identity, "u-1", "grace@example.com", "hopper1906", "Grace Hopper").await;
    seed_user(&store, "u-1", "grace@example.com", true).await;

    let snapshot = manager(&identity, &store)
        .login("grace@example.com", "hopper1906")
        .await
        .unwrap();

    assert!(snapshot.user.is_admin);
    let inserts = store
        .calls()
        .await
        .into_iter()
        .filter(|call| call.op == StoreOp::Insert)
        .count();
    assert_eq!(inserts, 0);
}

#[tokio::test]
async fn test_mirror_failure_fails_login() {
    let identity = MemoryIdentityProvider::new();
    let store = MemoryStore::new();
    add_account(&identity, "u-2", "lin@example.com", "password123", "Lin").await;
    store
        .fail_on(Table::UserAccount, StoreOp::Insert, "read-only replica")
        .await;

    let manager = manager(&identity, &store);
    let err = manager.login("lin@example.com", "password123").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MirrorRowCreationFailed);
    assert!(manager.current_user().await.is_none());
}

#[tokio::test]
async fn test_subscription_load_failure_still_logs_in() {
    let identity = MemoryIdentityProvider::new();
    let store = MemoryStore::new();
    add_account(&identity, "u-3", "sam@example.com", "password123", "Sam").await;
    store
        .fail_on(Table::Subscription, StoreOp::Select, "timeout")
        .await;

    let manager = manager(&identity, &store);
    let snapshot = manager.login("sam@example.com", "password123").await.unwrap();

    assert!(snapshot.subscriptions.is_empty());
    assert_eq!(manager.current_user().await.unwrap().id.as_str(), "u-3");
}

#[tokio::test]
async fn test_provider_outage_is_reported_as_unavailable() {
    let identity = MemoryIdentityProvider::new();
    let store = MemoryStore::new();
    identity.set_unavailable(true);

    let err = manager(&identity, &store)
        .login("ada@example.com", "correct horse")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn test_register_does_not_create_mirror_row() {
    let identity = MemoryIdentityProvider::new();
    let store = MemoryStore::new();
    let manager = manager(&identity, &store);

    let registration = manager
        .register("Mary Somerville", "mary@example.com", "long enough")
        .await
        .unwrap();

    assert_eq!(registration.email.as_str(), "mary@example.com");
    assert!(store.calls().await.is_empty());
    assert!(manager.current_user().await.is_none());

    // The row shows up on first login instead.
    manager.login("mary@example.com", "long enough").await.unwrap();
    let rows = store.rows(Table::UserAccount).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["full_name"], "Mary Somerville");
}

#[tokio::test]
async fn test_register_duplicate_and_weak_password() {
    let identity = MemoryIdentityProvider::new();
    let store = MemoryStore::new();
    add_account(&identity, "u-4", "taken@example.com", "password123", "Taken").await;
    let manager = manager(&identity, &store);

    let duplicate = manager
        .register("Someone", "taken@example.com", "password123")
        .await
        .unwrap_err();
    assert!(matches!(duplicate, SessionError::UserAlreadyExists));

    let weak = manager
        .register("Someone", "new@example.com", "short")
        .await
        .unwrap_err();
    assert!(matches!(weak, SessionError::WeakPassword(_)));
    assert_eq!(weak.kind(), ErrorKind::ValidationFailed);
}

#[tokio::test]
async fn test_logout_notifies_watchers_and_ends_provider_session() {
    let identity = MemoryIdentityProvider::new();
    let store = MemoryStore::new();
    add_account(&identity, "u-5", "kay@example.com", "password123", "Kay").await;
    let manager = manager(&identity, &store);
    let mut watcher = manager.subscribe();

    manager.login("kay@example.com", "password123").await.unwrap();
    watcher.changed().await.unwrap();
    assert!(watcher.borrow_and_update().is_some());
    assert_eq!(identity.active_sessions().await, 1);

    manager.logout().await;
    watcher.changed().await.unwrap();
    assert!(watcher.borrow().is_none());
    assert_eq!(identity.active_sessions().await, 0);
    assert!(manager.access_token().await.is_none());
    assert!(manager.subscriptions().await.is_empty());
}
