//! Mirrored user account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitalis_core::{Email, UserId};

/// Application-side copy of an identity-provider account (`user_account`).
///
/// The id is the identity provider's user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert model for `user_account`.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub is_admin: bool,
}
