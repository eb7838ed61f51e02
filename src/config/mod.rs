//! Configuration (layered: code > env > defaults).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MsTodoError, Result};

/// Microsoft identity platform authority for personal accounts.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/consumers";

/// Scopes needed for To-Do access plus a refresh token.
pub const DEFAULT_SCOPES: &[&str] = &["Tasks.ReadWrite", "offline_access"];

const APP_DIR_NAME: &str = "ms-todo-mcp";
const TOKEN_FILE_NAME: &str = "tokens.json";

/// Runtime configuration for the authentication core.
///
/// # Example
/// ```
/// use mstodo::config::MsTodoConfig;
///
/// let config = MsTodoConfig::new("my-client-id");
/// assert_eq!(
///     config.token_url(),
///     "https://login.microsoftonline.com/consumers/oauth2/v2.0/token"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MsTodoConfig {
    pub client_id: String,
    pub authority: String,
    pub scopes: Vec<String>,
    pub token_path: PathBuf,
    /// Tokens closer than this to expiry are refreshed before use.
    pub refresh_buffer: chrono::Duration,
    pub http_timeout: Duration,
    pub max_poll_interval: Duration,
}

impl MsTodoConfig {
    /// Defaults for everything except the application (client) id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authority: DEFAULT_AUTHORITY.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            token_path: default_token_path(),
            refresh_buffer: chrono::Duration::minutes(5),
            http_timeout: Duration::from_secs(30),
            max_poll_interval: Duration::from_secs(60),
        }
    }

    /// Load from environment variables (`MS_TODO_CLIENT_ID`, `MS_TODO_AUTHORITY`,
    /// `MS_TODO_TOKEN_PATH`), reading `.env` first when present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = lookup("MS_TODO_CLIENT_ID").unwrap_or_default();
        let mut config = Self::new(client_id.trim());

        if let Some(authority) = lookup("MS_TODO_AUTHORITY").filter(|v| !v.trim().is_empty()) {
            config.authority = authority.trim().trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup("MS_TODO_TOKEN_PATH").filter(|v| !v.trim().is_empty()) {
            config.token_path = PathBuf::from(path);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(MsTodoError::Configuration(
                "MS_TODO_CLIENT_ID environment variable is required".to_string(),
            ));
        }
        if self.scopes.is_empty() {
            return Err(MsTodoError::Configuration(
                "at least one OAuth scope is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Space-separated scope string for form bodies.
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn device_code_url(&self) -> String {
        format!("{}/oauth2/v2.0/devicecode", self.authority)
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }
}

/// `<user config dir>/ms-todo-mcp/tokens.json`.
pub fn default_token_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR_NAME}")))
        .join(TOKEN_FILE_NAME)
}
