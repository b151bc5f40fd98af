//! User account repository.

use serde_json::json;

use vitalis_core::UserId;

use super::{RepositoryError, decode, decode_all, decode_first, encode};
use crate::models::{NewUser, User};
use crate::store::{Filter, PersistentStore, Query, Table};

/// Repository for `user_account` rows.
pub struct UserRepository<'a> {
    store: &'a dyn PersistentStore,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(store: &'a dyn PersistentStore) -> Self {
        Self { store }
    }

    /// Get a user by identity-provider id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is malformed.
    pub async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let rows = self
            .store
            .select(Table::UserAccount, &Query::new().eq("id", id.as_str()).limit(1))
            .await?;
        decode_first(rows)
    }

    /// Insert the mirrored row for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id already exists.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = self.store.insert(Table::UserAccount, encode(user)?).await?;
        decode(row)
    }

    /// All users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = self
            .store
            .select(Table::UserAccount, &Query::new().order_by("created_at", false))
            .await?;
        decode_all(rows)
    }

    /// Grant or revoke admin access.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that id.
    pub async fn set_admin(&self, id: &UserId, is_admin: bool) -> Result<User, RepositoryError> {
        let patch = encode(&json!({ "is_admin": is_admin }))?;
        let rows = self
            .store
            .update(Table::UserAccount, &[Filter::eq("id", id.as_str())], patch)
            .await?;
        decode_first(rows)?.ok_or(RepositoryError::NotFound)
    }
}
