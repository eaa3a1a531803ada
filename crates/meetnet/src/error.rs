//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `meetnet_api::Error` and `ConfigError` into
//! user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use meetnet_config::ConfigError;
use meetnet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Meetnet API: {reason}")]
    #[diagnostic(
        code(meetnet::connection_failed),
        help(
            "Check your network connection and the API root URL.\n\
             Override it with --base-url or MEETNET_BASE_URL."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out: {reason}")]
    #[diagnostic(
        code(meetnet::timeout),
        help("Increase timeout with --timeout or try again later.")
    )]
    Timeout { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(meetnet::auth_failed),
        help(
            "Verify your Meetnet username and password.\n\
             Run: meetnet config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(meetnet::no_credentials),
        help(
            "Configure credentials with: meetnet config init\n\
             Or set MEETNET_USERNAME and MEETNET_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(meetnet::not_found),
        help("Run: meetnet {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No locations selected")]
    #[diagnostic(
        code(meetnet::no_locations),
        help(
            "Pass --location <ID> (repeatable) or save a selection with:\n\
             meetnet config set locations NPT,OST"
        )
    )]
    NoLocations,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(meetnet::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(meetnet::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: meetnet config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(meetnet::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {message}")]
    #[diagnostic(
        code(meetnet::keyring),
        help("Store the password in the config file or MEETNET_PASSWORD instead.")
    )]
    Keyring { message: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(meetnet::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(meetnet::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(meetnet::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoLocations => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to an authentication failure.
    pub fn with_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: name.into(),
                message,
            },
            other => other,
        }
    }
}

// ── Library error → CliError mapping ─────────────────────────────────

impl From<meetnet_api::Error> for CliError {
    fn from(err: meetnet_api::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                reason: err.to_string(),
            };
        }
        match err {
            meetnet_api::Error::Authentication { message } => Self::AuthFailed {
                profile: "default".into(),
                message,
            },
            other => Self::ConnectionFailed {
                reason: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationRequired { message } => Self::AuthFailed {
                profile: "default".into(),
                message,
            },
            CoreError::NotReady { source } | CoreError::UpdateFailed { source } => source.into(),
            CoreError::NotSetUp => Self::Internal(err.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Keyring(e) => Self::Keyring {
                message: e.to_string(),
            },
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Io(e) => Self::Io(e),
            ConfigError::Serialization(e) => Self::Internal(e.to_string()),
        }
    }
}
