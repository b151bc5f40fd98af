//! Admin access management.
//!
//! The account must already exist in `user_account`, i.e. the user has
//! signed in at least once.

use vitalis_core::UserId;
use vitalis_storefront::db::{RepositoryError, UserRepository};

use super::{CliError, connect_store};

/// Set or clear `is_admin` on a user account.
///
/// # Errors
///
/// Returns an error if the store can't be reached or no account has that id.
pub async fn set_admin(user_id: &str, is_admin: bool) -> Result<(), CliError> {
    let store = connect_store().await?;
    let id = UserId::new(user_id.trim());

    let user = match UserRepository::new(store.as_ref())
        .set_admin(&id, is_admin)
        .await
    {
        Ok(user) => user,
        Err(RepositoryError::NotFound) => {
            tracing::error!(
                user_id = %id,
                "No user_account row; the user must sign in once before being granted admin"
            );
            return Err(RepositoryError::NotFound.into());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        user_id = %user.id,
        email = %user.email,
        is_admin = user.is_admin,
        "Admin access updated"
    );
    Ok(())
}
