//! Device-code polling loop.

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::device_code::{DeviceCodeChallenge, DeviceCodePoll};
use super::error::AuthError;
use super::provider::IdentityProvider;
use super::token::TokenResponse;

/// Interval increase applied on every `slow_down`.
pub const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Tuning for [`poll_for_token`].
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Upper bound for the interval after repeated `slow_down` responses.
    pub max_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_interval: Duration::from_secs(60),
        }
    }
}

/// Poll the token endpoint until the user finishes signing in.
///
/// Sleeps one interval before every attempt, never past the challenge
/// deadline. Returns [`AuthError::Timeout`] once the challenge expires and [`AuthError::Cancelled`] as soon as `cancel`
/// fires at a sleep boundary.
pub async fn poll_for_token(
    provider: &dyn IdentityProvider,
    challenge: &DeviceCodeChallenge,
    config: PollConfig,
    cancel: &CancellationToken,
) -> Result<TokenResponse, AuthError> {
    let deadline = challenge.deadline();
    let mut interval = challenge.poll_interval();
    let mut attempts = 0u32;

    while Instant::now() < deadline {
        let nap = interval.min(deadline.saturating_duration_since(Instant::now()));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AuthError::Cancelled),
            _ = time::sleep(nap) => {}
        }
        if Instant::now() >= deadline {
            break;
        }

        attempts += 1;
        debug!(attempt = attempts, interval_secs = interval.as_secs(), "polling token endpoint");
        match provider.exchange_device_code(&challenge.device_code).await? {
            DeviceCodePoll::Authorized { token } => return Ok(token),
            DeviceCodePoll::Pending => continue,
            DeviceCodePoll::SlowDown => {
                interval = interval
                    .saturating_add(SLOW_DOWN_STEP)
                    .min(config.max_interval)
                    .max(interval);
            }
            DeviceCodePoll::Expired => return Err(AuthError::Timeout),
            DeviceCodePoll::Failed { body, .. } => {
                return Err(AuthError::Provider(format!("token request failed: {body}")));
            }
        }
    }

    Err(AuthError::Timeout)
}
