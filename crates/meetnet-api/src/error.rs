use thiserror::Error;

/// Top-level error type for the `meetnet-api` crate.
///
/// Two families matter to callers: authentication failures (bad
/// credentials, a token rejected even after re-authenticating) and
/// connection failures (transport errors, non-success HTTP statuses,
/// undecodable bodies). Use [`is_auth`](Self::is_auth) and
/// [`is_connection`](Self::is_connection) to branch on the family, or
/// match the variants directly. `meetnet-core` maps these into
/// host-level failure signals.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token exchange rejected, or bearer token refused after the retry.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Network failure (DNS, TCP, TLS, timeout) or a non-success HTTP status.
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        /// HTTP status when the server answered with a failure code.
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Response body was not the JSON we expected, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    pub(crate) fn auth(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Wrap a transport-level `reqwest` failure.
    pub(crate) fn transport(context: &str, err: reqwest::Error) -> Self {
        Self::Connection {
            message: format!("{context}: {err}"),
            status: err.status().map(|s| s.as_u16()),
            source: Some(err),
        }
    }

    /// Non-success HTTP status. The body preview is capped at 200 chars.
    pub(crate) fn http_status(status: reqwest::StatusCode, body: &str) -> Self {
        let preview: String = body.chars().take(200).collect();
        let message = if preview.is_empty() {
            format!("API request failed (HTTP {status})")
        } else {
            format!("API request failed (HTTP {status}): {preview}")
        };
        Self::Connection {
            message,
            status: Some(status.as_u16()),
            source: None,
        }
    }

    /// Returns `true` for credential or token rejection.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` for everything in the connection family:
    /// transport, HTTP status, TLS, URL, and decoding failures.
    pub fn is_connection(&self) -> bool {
        !self.is_auth()
    }

    /// Returns `true` if the underlying transport timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Connection {
                source: Some(e), ..
            } => e.is_timeout(),
            _ => false,
        }
    }

    /// HTTP status code attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Connection { status, .. } => *status,
            _ => None,
        }
    }
}
