// Meetnet Vlaamse Banken HTTP client
//
// Owns the HTTP session, the bearer token, and the catalog cache. Endpoint
// operations live in `catalog.rs` and `current.rs` as inherent methods so
// this module stays focused on transport mechanics: session lifecycle,
// URL construction, and the authenticated request loop.

use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwapOption;
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::auth::{AccessToken, Clock, Credentials, SystemClock};
use crate::error::Error;
use crate::models::Catalog;
use crate::schema::SchemaVariant;
use crate::transport::TransportConfig;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.meetnetvlaamsebanken.be";

/// One 401 triggers a single re-authentication and retry, no more.
const MAX_ATTEMPTS: u8 = 2;

// ── Endpoints ────────────────────────────────────────────────────────

/// Base URL plus the relative paths of the three endpoints the client uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: Url,
    pub token_path: String,
    pub catalog_path: String,
    pub current_data_path: String,
}

impl Endpoints {
    /// Endpoints under `base_url` with the standard paths.
    ///
    /// The base is normalized to end with `/` so any path prefix
    /// (e.g. a reverse proxy mount) survives joining.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let mut url = Url::parse(base_url)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(Self {
            base_url: url,
            token_path: "Token".into(),
            catalog_path: "V2/catalog".into(),
            current_data_path: "V2/currentData".into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join(&self.token_path)?)
    }

    pub fn catalog_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join(&self.catalog_path)?)
    }

    pub fn current_data_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join(&self.current_data_path)?)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base_url: Url::parse(&format!("{DEFAULT_BASE_URL}/"))
                .unwrap_or_else(|_| unreachable!("constant URL parses")),
            token_path: "Token".into(),
            catalog_path: "V2/catalog".into(),
            current_data_path: "V2/currentData".into(),
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Where the `reqwest::Client` comes from.
///
/// An owned session is built on first use and dropped by
/// [`MeetnetClient::close`]; the next request builds a fresh one.
/// A shared session belongs to the caller and is never dropped here.
enum Session {
    Owned {
        transport: TransportConfig,
        http: RwLock<Option<reqwest::Client>>,
    },
    Shared(reqwest::Client),
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Meetnet Vlaamse Banken API.
///
/// Methods take `&self`; the token and catalog caches use interior
/// mutability so the client can sit behind an `Arc` shared by a
/// coordinator and a credential flow.
pub struct MeetnetClient {
    session: Session,
    endpoints: Endpoints,
    pub(crate) credentials: Credentials,
    pub(crate) schema: SchemaVariant,
    pub(crate) token: Mutex<Option<AccessToken>>,
    pub(crate) catalog: ArcSwapOption<Catalog>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl MeetnetClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Client that creates (lazily) and owns its own HTTP session.
    pub fn new(credentials: Credentials, transport: &TransportConfig) -> Self {
        Self::from_session(
            credentials,
            Session::Owned {
                transport: transport.clone(),
                http: RwLock::new(None),
            },
        )
    }

    /// Client that borrows a caller-supplied `reqwest::Client`.
    pub fn with_client(credentials: Credentials, http: reqwest::Client) -> Self {
        Self::from_session(credentials, Session::Shared(http))
    }

    fn from_session(credentials: Credentials, session: Session) -> Self {
        Self {
            session,
            endpoints: Endpoints::default(),
            credentials,
            schema: SchemaVariant::default(),
            token: Mutex::new(None),
            catalog: ArcSwapOption::empty(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Point the client at a different API root.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Select the response schema used for parsing.
    pub fn with_schema(mut self, schema: SchemaVariant) -> Self {
        self.schema = schema;
        self
    }

    /// Replace the clock used for token expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    /// Whether this client created its HTTP session (and may close it).
    pub fn is_session_owned(&self) -> bool {
        matches!(self.session, Session::Owned { .. })
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// The HTTP session, building the owned one on first use.
    pub(crate) fn http(&self) -> Result<reqwest::Client, Error> {
        match &self.session {
            Session::Shared(http) => Ok(http.clone()),
            Session::Owned { transport, http } => {
                if let Some(client) = http.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
                    return Ok(client.clone());
                }
                let mut slot = http.write().unwrap_or_else(PoisonError::into_inner);
                if let Some(client) = slot.as_ref() {
                    return Ok(client.clone());
                }
                debug!("creating HTTP session");
                let client = transport.build_client()?;
                *slot = Some(client.clone());
                Ok(client)
            }
        }
    }

    /// Release the HTTP session if this client created it.
    ///
    /// A caller-supplied session is left untouched. Cached token and
    /// catalog survive; a later request opens a new session.
    pub fn close(&self) {
        if let Session::Owned { http, .. } = &self.session {
            if http
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .is_some()
            {
                debug!("closed owned HTTP session");
            }
        }
    }

    // ── Credential check ─────────────────────────────────────────────

    /// Check credentials by running the token exchange.
    ///
    /// Rejected credentials yield `Ok(false)`; connection and other
    /// failures propagate so a UI can tell "wrong password" apart from
    /// "server unreachable".
    pub async fn validate_credentials(&self) -> Result<bool, Error> {
        match self.authenticate().await {
            Ok(()) => Ok(true),
            Err(Error::Authentication { message }) => {
                debug!(%message, "credentials rejected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    // ── Request helper ───────────────────────────────────────────────

    /// Issue a bearer-authenticated request and decode the JSON body.
    ///
    /// A 401 clears the token, forces one re-authentication, and retries
    /// once. A second 401 is an authentication error; no third request is
    /// sent. Any other failure status is a connection error.
    pub(crate) async fn authenticated_request(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Value, Error> {
        let http = self.http()?;
        let mut attempt = 1;

        loop {
            let token = self.bearer_token().await?;
            debug!(attempt, "{method} {url}");

            let mut builder = http
                .request(method.clone(), url.clone())
                .bearer_auth(token.expose_secret())
                .header(ACCEPT, "application/json");
            if !query.is_empty() {
                builder = builder.query(query);
            }
            let resp = builder
                .send()
                .await
                .map_err(|e| Error::transport("connection error", e))?;

            let status = resp.status();
            if status == StatusCode::UNAUTHORIZED {
                if attempt >= MAX_ATTEMPTS {
                    return Err(Error::auth("authentication failed after retry"));
                }
                debug!("bearer token rejected, re-authenticating");
                self.invalidate_token().await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::http_status(status, &body));
            }

            let body = resp
                .text()
                .await
                .map_err(|e| Error::transport("failed to read response body", e))?;
            return serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body: body.clone(),
                }
            });
        }
    }
}
