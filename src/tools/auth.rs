//! `login`, `login_complete`, `logout` and `auth_status` tools.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{ToolOutput, ToolSpec};
use crate::auth::{AuthError, LoginStatus, TokenManager};

pub const LOGIN: ToolSpec = ToolSpec {
    name: "login",
    description: "Start Microsoft authentication. Returns a URL and code for the user to complete sign-in.",
};

pub const LOGIN_COMPLETE: ToolSpec = ToolSpec {
    name: "login_complete",
    description: "Complete Microsoft authentication after the user has entered the device code.",
};

pub const LOGOUT: ToolSpec = ToolSpec {
    name: "logout",
    description: "Sign out of Microsoft and delete the stored credentials.",
};

pub const AUTH_STATUS: ToolSpec = ToolSpec {
    name: "auth_status",
    description: "Report whether Microsoft credentials are stored and when they expire.",
};

/// Auth tool handlers over a shared [`TokenManager`].
#[derive(Clone)]
pub struct AuthTools {
    manager: Arc<TokenManager>,
}

impl AuthTools {
    pub fn new(manager: Arc<TokenManager>) -> Self {
        Self { manager }
    }

    pub fn specs() -> [ToolSpec; 4] {
        [LOGIN, LOGIN_COMPLETE, LOGOUT, AUTH_STATUS]
    }

    /// Dispatch by tool name; `None` for names this group does not own.
    pub async fn call(&self, name: &str, cancel: CancellationToken) -> Option<ToolOutput> {
        let output = match name {
            "login" => self.login().await,
            "login_complete" => self.login_complete(cancel).await,
            "logout" => self.logout().await,
            "auth_status" => self.auth_status(),
            _ => return None,
        };
        Some(output)
    }

    pub async fn login(&self) -> ToolOutput {
        match self.manager.begin_login().await {
            Ok(prompt) => ToolOutput::text(format!(
                "Please visit: {}\nEnter code: {}\n\nOnce you have entered the code, call the 'login_complete' tool to finish authentication.",
                prompt.verification_uri, prompt.user_code
            )),
            Err(err) => ToolOutput::error(format!("Error requesting device code: {err}")),
        }
    }

    pub async fn login_complete(&self, cancel: CancellationToken) -> ToolOutput {
        match self.manager.complete_login(cancel).await {
            Ok(_) => ToolOutput::text(
                "Authentication successful! You can now use Microsoft To-Do tools.",
            ),
            Err(AuthError::NoLoginInProgress) => {
                ToolOutput::error(AuthError::NoLoginInProgress.to_string())
            }
            Err(err) => ToolOutput::error(format!("Authentication failed: {err}")),
        }
    }

    pub async fn logout(&self) -> ToolOutput {
        match self.manager.logout().await {
            Ok(()) => ToolOutput::text("Logged out. Stored Microsoft credentials were removed."),
            Err(err) => ToolOutput::error(format!("Logout failed: {err}")),
        }
    }

    pub fn auth_status(&self) -> ToolOutput {
        match self.manager.status() {
            Ok(LoginStatus::LoggedOut) => {
                ToolOutput::text("Not logged in. Call 'login' to authenticate.")
            }
            Ok(LoginStatus::Active { expires_at }) => ToolOutput::text(format!(
                "Logged in. Access token expires {}.",
                expires_at.format("%Y-%m-%d %H:%M UTC")
            )),
            Ok(LoginStatus::Expired { expires_at }) => ToolOutput::text(format!(
                "Logged in. Access token expired {} and will be refreshed on next use.",
                expires_at.format("%Y-%m-%d %H:%M UTC")
            )),
            Err(err) => ToolOutput::error(format!("Could not read stored credentials: {err}")),
        }
    }
}
