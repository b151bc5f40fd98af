//! In-memory identity provider for development and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::Mutex;
use uuid::Uuid;

use vitalis_core::{Email, UserId};

use super::{AuthSession, IdentityError, IdentityProvider, IdentityUser, SignUpOutcome, UserMetadata};

const MIN_PASSWORD_LENGTH: usize = 8;

struct Account {
    user: IdentityUser,
    password_hash: String,
}

#[derive(Default)]
struct ProviderState {
    accounts: HashMap<Email, Account>,
    /// access token → account email
    sessions: HashMap<String, Email>,
    sign_in_attempts: usize,
}

/// Identity provider keeping argon2-hashed accounts in memory.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    state: Arc<Mutex<ProviderState>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with a fixed id, bypassing the password policy.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::UserAlreadyExists` if the email is taken.
    pub async fn add_account(
        &self,
        id: impl Into<UserId>,
        email: &Email,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<IdentityUser, IdentityError> {
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(email) {
            return Err(IdentityError::UserAlreadyExists);
        }
        let user = IdentityUser {
            id: id.into(),
            email: email.clone(),
            user_metadata: metadata,
            created_at: Some(Utc::now()),
        };
        state.accounts.insert(
            email.clone(),
            Account {
                user: user.clone(),
                password_hash: hash_password(password)?,
            },
        );
        Ok(user)
    }

    /// Make every call fail as if the provider were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of sign-in attempts seen, successful or not.
    pub async fn sign_in_attempts(&self) -> usize {
        self.state.lock().await.sign_in_attempts
    }

    /// Number of live access tokens.
    pub async fn active_sessions(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::Unavailable(format!("password hashing failed: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), IdentityError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| IdentityError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| IdentityError::InvalidCredentials)
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUpOutcome, IdentityError> {
        self.check_available()?;
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakPassword(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        let user = self
            .add_account(Uuid::new_v4().to_string(), email, password, metadata)
            .await?;
        Ok(SignUpOutcome {
            user,
            confirmation_required: false,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, IdentityError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        state.sign_in_attempts += 1;

        let account = state
            .accounts
            .get(email)
            .ok_or(IdentityError::InvalidCredentials)?;
        verify_password(password, &account.password_hash)?;
        let user = account.user.clone();

        let token = Uuid::new_v4().simple().to_string();
        state.sessions.insert(token.clone(), email.clone());
        Ok(AuthSession {
            access_token: SecretString::from(token),
            user,
        })
    }

    async fn current_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        self.check_available()?;
        let state = self.state.lock().await;
        state
            .sessions
            .get(access_token)
            .and_then(|email| state.accounts.get(email))
            .map(|account| account.user.clone())
            .ok_or(IdentityError::InvalidToken)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.check_available()?;
        self.state
            .lock()
            .await
            .sessions
            .remove(access_token)
            .map(|_| ())
            .ok_or(IdentityError::InvalidToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let outcome = provider
            .sign_up(&email("ada@example.com"), "correct horse", UserMetadata::new())
            .await
            .unwrap();

        let session = provider
            .sign_in_with_password(&email("ada@example.com"), "correct horse")
            .await
            .unwrap();
        assert_eq!(session.user.id, outcome.user.id);

        let me = provider
            .current_user(session.access_token.expose_secret())
            .await
            .unwrap();
        assert_eq!(me.email.as_str(), "ada@example.com");

        provider
            .sign_out(session.access_token.expose_secret())
            .await
            .unwrap();
        assert_eq!(provider.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let provider = MemoryIdentityProvider::new();
        provider
            .add_account("u1", &email("ada@example.com"), "correct horse", UserMetadata::new())
            .await
            .unwrap();

        assert!(matches!(
            provider
                .sign_in_with_password(&email("ada@example.com"), "wrong")
                .await,
            Err(IdentityError::InvalidCredentials)
        ));
        assert!(matches!(
            provider
                .sign_in_with_password(&email("bob@example.com"), "correct horse")
                .await,
            Err(IdentityError::InvalidCredentials)
        ));
        assert_eq!(provider.sign_in_attempts().await, 2);
    }

    #[tokio::test]
    async fn test_policy_and_duplicates() {
        let provider = MemoryIdentityProvider::new();
        assert!(matches!(
            provider
                .sign_up(&email("ada@example.com"), "short", UserMetadata::new())
                .await,
            Err(IdentityError::WeakPassword(_))
        ));

        provider
            .sign_up(&email("ada@example.com"), "long enough", UserMetadata::new())
            .await
            .unwrap();
        assert!(matches!(
            provider
                .sign_up(&email("ada@example.com"), "long enough", UserMetadata::new())
                .await,
            Err(IdentityError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let provider = MemoryIdentityProvider::new();
        provider.set_unavailable(true);
        let err = provider
            .sign_in_with_password(&email("ada@example.com"), "whatever")
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }
}
