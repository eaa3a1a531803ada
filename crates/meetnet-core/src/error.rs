// ── Core error types ──
//
// Host-level failure signals. Consumers see "re-authenticate", "not ready
// yet", or "this poll failed", never raw HTTP details. Every
// `meetnet_api::Error` is converted here; which variant it lands in
// depends on whether it happened during setup or during a poll tick.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Credentials rejected. Fatal until the user supplies new ones.
    #[error("Authentication required: {message}")]
    AuthenticationRequired { message: String },

    /// Setup could not load the catalog. Retry later.
    #[error("Not ready: failed to fetch catalog: {source}")]
    NotReady {
        #[source]
        source: meetnet_api::Error,
    },

    /// A poll tick failed. The previous data is kept.
    #[error("Update failed: error communicating with API: {source}")]
    UpdateFailed {
        #[source]
        source: meetnet_api::Error,
    },

    /// A poll tick was requested before `setup()` succeeded.
    #[error("Coordinator has not been set up")]
    NotSetUp,
}

impl CoreError {
    /// Map a failure from the setup phase.
    pub fn from_setup(err: meetnet_api::Error) -> Self {
        match err {
            meetnet_api::Error::Authentication { message } => {
                Self::AuthenticationRequired { message }
            }
            source => Self::NotReady { source },
        }
    }

    /// Map a failure from a poll tick.
    pub fn from_update(err: meetnet_api::Error) -> Self {
        match err {
            meetnet_api::Error::Authentication { message } => {
                Self::AuthenticationRequired { message }
            }
            source => Self::UpdateFailed { source },
        }
    }

    /// The user must re-enter credentials before anything else works.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthenticationRequired { .. })
    }

    /// Worth retrying on the next tick without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotReady { .. } | Self::UpdateFailed { .. })
    }
}

impl From<meetnet_api::Error> for CoreError {
    fn from(err: meetnet_api::Error) -> Self {
        Self::from_update(err)
    }
}
