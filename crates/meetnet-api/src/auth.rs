// OAuth2 password-grant authentication.
//
// The token endpoint trades username/password for a bearer token with a
// server-declared lifetime. We store the token with an absolute expiry
// pulled 60 seconds forward, and re-run the exchange whenever the held
// token is missing or past that instant.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::client::MeetnetClient;
use crate::error::Error;

/// Lifetime assumed when the token response omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Seconds shaved off the declared lifetime to absorb clock skew and latency.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Username/password pair for the password grant.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

/// Source of "now" for token expiry checks.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock UTC time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A bearer token and the instant it stops being trusted.
#[derive(Debug, Clone)]
pub(crate) struct AccessToken {
    pub(crate) value: SecretString,
    pub(crate) expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Build from a token response received at `now`.
    ///
    /// Lifetimes past chrono's range clamp to the latest representable
    /// instant, or to `now` when hugely negative.
    fn issued(value: String, expires_in_secs: i64, now: DateTime<Utc>) -> Self {
        let lifetime_secs = expires_in_secs.saturating_sub(EXPIRY_MARGIN_SECS);
        let expires_at = TimeDelta::try_seconds(lifetime_secs)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(if lifetime_secs > 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                now
            });
        Self {
            value: SecretString::from(value),
            expires_at,
        }
    }

    /// An exactly-expired token counts as expired.
    pub(crate) fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN_SECS
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error_description: Option<String>,
}

impl MeetnetClient {
    /// Run the password-grant exchange and store the resulting token.
    ///
    /// - HTTP 400: `Error::Authentication` with the server's
    ///   `error_description`.
    /// - Any other non-200: `Error::Authentication` naming the status.
    /// - Transport failure: `Error::Connection`.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let token = self.request_token().await?;
        *self.token.lock().await = Some(token);
        Ok(())
    }

    /// Return a non-expired token, authenticating first if none is held
    /// or the held one has expired.
    pub async fn ensure_authenticated(&self) -> Result<SecretString, Error> {
        self.bearer_token().await
    }

    /// Drop the held token so the next request re-authenticates.
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Whether a token is held and not yet expired.
    pub async fn has_valid_token(&self) -> bool {
        let now = self.clock.now();
        self.token
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.is_expired_at(now))
    }

    /// Current bearer token, refreshed first if missing or expired.
    ///
    /// The lock is held across the exchange so concurrent callers share
    /// one re-authentication instead of racing.
    pub(crate) async fn bearer_token(&self) -> Result<SecretString, Error> {
        let mut guard = self.token.lock().await;
        let now = self.clock.now();
        if let Some(token) = guard.as_ref().filter(|t| !t.is_expired_at(now)) {
            return Ok(token.value.clone());
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken, Error> {
        let http = self.http()?;
        let url = self.endpoints().token_url()?;
        debug!("requesting access token at {url}");

        let form = [
            ("grant_type", "password"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.expose_secret()),
        ];

        let resp = http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::transport("connection error during authentication", e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description)
                .unwrap_or_else(|| "Invalid credentials".into());
            return Err(Error::auth(message));
        }
        if status != reqwest::StatusCode::OK {
            return Err(Error::auth(format!(
                "authentication failed with status {}",
                status.as_u16()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::transport("failed to read token response", e))?;
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("invalid token response: {e}"),
                body: body.clone(),
            })?;

        debug!("authenticated, token expires in {} seconds", parsed.expires_in);
        Ok(AccessToken::issued(
            parsed.access_token,
            parsed.expires_in,
            self.clock.now(),
        ))
    }
}
