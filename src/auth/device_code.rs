use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

use super::token::TokenResponse;

/// Polling cadence used when the provider sends no interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Longest lifetime honoured for a device-code challenge.
pub const MAX_CHALLENGE_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Device-code challenge issued by the identity provider.
///
/// `issued_at` is stamped on receipt; the challenge is only valid until
/// `issued_at + expires_in`, with `expires_in` clamped to
/// [`MAX_CHALLENGE_LIFETIME`].
#[derive(Debug, Clone)]
pub struct DeviceCodeChallenge {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    pub interval: u64,
    pub message: String,
    pub issued_at: Instant,
}

impl DeviceCodeChallenge {
    pub(crate) fn from_response(payload: DeviceCodeResponse, issued_at: Instant) -> Self {
        Self {
            device_code: payload.device_code,
            user_code: payload.user_code,
            verification_uri: payload.verification_uri,
            expires_in: payload.expires_in,
            interval: payload.interval,
            message: payload.message,
            issued_at,
        }
    }

    pub fn deadline(&self) -> Instant {
        let lifetime = Duration::from_secs(self.expires_in).min(MAX_CHALLENGE_LIFETIME);
        self.issued_at + lifetime
    }

    /// Initial polling interval, falling back to five seconds.
    pub fn poll_interval(&self) -> Duration {
        if self.interval == 0 {
            DEFAULT_POLL_INTERVAL
        } else {
            Duration::from_secs(self.interval)
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline()
    }
}

/// Wire shape of the `devicecode` endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: u64,
    #[serde(default)]
    message: String,
}

/// Outcome of a single device-code exchange attempt.
#[derive(Debug, Clone)]
pub enum DeviceCodePoll {
    Authorized { token: TokenResponse },
    Pending,
    SlowDown,
    Expired,
    Failed { reason: ProviderErrorReason, body: String },
}

/// Provider error codes the poll loop distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorReason {
    AuthorizationPending,
    SlowDown,
    ExpiredToken,
    AccessDenied,
    InvalidGrant,
    Other(String),
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: String,
}

impl ProviderErrorReason {
    /// Classify a provider error body.
    ///
    /// Reads the JSON `error` field; bodies that are not JSON fall back to a
    /// substring match.
    pub fn parse(body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<ProviderErrorBody>(body) {
            return Self::from_code(&parsed.error);
        }
        if body.contains("authorization_pending") {
            Self::AuthorizationPending
        } else if body.contains("slow_down") {
            Self::SlowDown
        } else {
            Self::Other(body.trim().to_string())
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "authorization_pending" => Self::AuthorizationPending,
            "slow_down" => Self::SlowDown,
            "expired_token" => Self::ExpiredToken,
            "access_denied" | "authorization_declined" => Self::AccessDenied,
            "invalid_grant" => Self::InvalidGrant,
            other => Self::Other(other.to_string()),
        }
    }
}

impl DeviceCodePoll {
    /// Map a non-success token endpoint body to a poll outcome.
    pub fn from_error_body(body: String) -> Self {
        match ProviderErrorReason::parse(&body) {
            ProviderErrorReason::AuthorizationPending => Self::Pending,
            ProviderErrorReason::SlowDown => Self::SlowDown,
            ProviderErrorReason::ExpiredToken => Self::Expired,
            reason => Self::Failed { reason, body },
        }
    }
}
