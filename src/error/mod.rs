//! Crate-level error type.

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for crate operations outside the auth core.
#[derive(Error, Debug)]
pub enum MsTodoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl MsTodoError {
    /// Whether recovering needs a fresh interactive login.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Auth(err) if err.requires_login())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, MsTodoError>;
