//! Supabase auth (`GoTrue`) adapter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use vitalis_core::Email;

use super::{AuthSession, IdentityError, IdentityProvider, IdentityUser, SignUpOutcome, UserMetadata};

/// Client for the Supabase auth endpoints under `/auth/v1`.
#[derive(Clone)]
pub struct GoTrueClient {
    inner: Arc<GoTrueClientInner>,
}

struct GoTrueClientInner {
    client: reqwest::Client,
    base: Url,
    anon_key: SecretString,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: IdentityUser,
}

impl GoTrueClient {
    /// Create a client for a Supabase project.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Http` if the HTTP client cannot be built.
    pub fn new(project_url: &Url, anon_key: SecretString, timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base = project_url
            .join("auth/v1/")
            .map_err(|e| IdentityError::Parse(format!("invalid project URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(GoTrueClientInner {
                client,
                base,
                anon_key,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.inner
            .base
            .join(path)
            .map_err(|e| IdentityError::Parse(format!("invalid auth URL: {e}")))
    }

    /// Send a request and return `(status, body)`.
    ///
    /// Transport failures and 5xx answers surface as `Unavailable`; other
    /// statuses are left to the caller to interpret.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String), IdentityError> {
        let response = request
            .header("apikey", self.inner.anon_key.expose_secret())
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            tracing::error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "Identity provider returned server error"
            );
            return Err(IdentityError::Unavailable(format!("HTTP {status}")));
        }
        Ok((status, text))
    }
}

/// Pull the human-readable message out of a `GoTrue` error body.
///
/// Older releases use `error_description`, newer ones `msg` or `message`.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .into_iter()
                .find_map(|key| v.get(key).and_then(Value::as_str))
        })
        .map_or_else(|| body.chars().take(200).collect(), str::to_string)
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, IdentityError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse identity provider response"
        );
        IdentityError::Parse(e.to_string())
    })
}

/// Interpret a sign-up response.
///
/// With email confirmation on, `GoTrue` answers with the bare user; with it
/// off, it answers with a full session.
fn sign_up_outcome(body: &str) -> Result<SignUpOutcome, IdentityError> {
    let value: Value = parse(body)?;
    if value.get("access_token").is_some() {
        let session: TokenResponse = parse(body)?;
        return Ok(SignUpOutcome {
            user: session.user,
            confirmation_required: false,
        });
    }
    Ok(SignUpOutcome {
        user: parse(body)?,
        confirmation_required: true,
    })
}

fn sign_up_error(status: StatusCode, body: &str) -> IdentityError {
    let message = error_message(body);
    let lower = message.to_lowercase();
    if lower.contains("already registered") || lower.contains("already exists") {
        IdentityError::UserAlreadyExists
    } else if lower.contains("password") {
        IdentityError::WeakPassword(message)
    } else {
        IdentityError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    #[tracing::instrument(skip(self, password, metadata), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<SignUpOutcome, IdentityError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("signup")?)
            .json(&json!({
                "email": email.as_str(),
                "password": password,
                "data": metadata,
            }));
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(sign_up_error(status, &body));
        }
        sign_up_outcome(&body)
    }

    #[tracing::instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, IdentityError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let request = self.inner.client.post(url).json(&json!({
            "email": email.as_str(),
            "password": password,
        }));

        let (status, body) = self.send(request).await?;
        match status {
            s if s.is_success() => {
                let token: TokenResponse = parse(&body)?;
                Ok(AuthSession {
                    access_token: SecretString::from(token.access_token),
                    user: token.user,
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                tracing::debug!(message = %error_message(&body), "Sign-in rejected");
                Err(IdentityError::InvalidCredentials)
            }
            other => Err(IdentityError::Api {
                status: other.as_u16(),
                message: error_message(&body),
            }),
        }
    }

    async fn current_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let request = self
            .inner
            .client
            .get(self.endpoint("user")?)
            .bearer_auth(access_token);
        let (status, body) = self.send(request).await?;
        match status {
            s if s.is_success() => parse(&body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::InvalidToken),
            other => Err(IdentityError::Api {
                status: other.as_u16(),
                message: error_message(&body),
            }),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let request = self
            .inner
            .client
            .post(self.endpoint("logout")?)
            .bearer_auth(access_token);
        let (status, body) = self.send(request).await?;
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::InvalidToken),
            other => Err(IdentityError::Api {
                status: other.as_u16(),
                message: error_message(&body),
            }),
        }
    }
}
