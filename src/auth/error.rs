use thiserror::Error;

/// Failures surfaced by the authentication core.
///
/// `authorization_pending` and `slow_down` never appear here; the poll loop
/// absorbs them.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Identity provider error: {0}")]
    Provider(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("authentication timed out")]
    Timeout,
    #[error("not authenticated - run 'login' command first")]
    NotAuthenticated,
    #[error("No login in progress. Call 'login' first.")]
    NoLoginInProgress,
    #[error("authentication cancelled")]
    Cancelled,
}

impl AuthError {
    /// Whether the caller has to run the device-code flow again to recover.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::Timeout | Self::Provider(_)
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Storage(error.to_string())
    }
}
