//! Identity provider seam and the Microsoft identity platform client.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use super::device_code::{DeviceCodeChallenge, DeviceCodePoll, DeviceCodeResponse};
use super::error::AuthError;
use super::token::TokenResponse;
use crate::config::MsTodoConfig;

/// Grant type for the device-code exchange.
pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Grant type sent on refresh. Not the RFC 6749 `refresh_token` value; kept
/// verbatim because the consumer endpoint has accepted it in practice.
pub const REFRESH_GRANT: &str = "urn:ietf:params:oauth:grant_type=refresh_token";

/// Network operations the token lifecycle needs from an OAuth provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Request a new device-code challenge.
    async fn request_device_code(&self) -> Result<DeviceCodeChallenge, AuthError>;

    /// Perform one device-code exchange attempt.
    async fn exchange_device_code(&self, device_code: &str) -> Result<DeviceCodePoll, AuthError>;

    /// Exchange a refresh token for a fresh access token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;
}

/// Microsoft identity platform v2.0 client for a public (device-code) app.
///
/// # Example
/// ```no_run
/// use mstodo::auth::{IdentityProvider, MicrosoftIdentityClient};
/// use mstodo::config::MsTodoConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = MsTodoConfig::new("00000000-0000-0000-0000-000000000000");
/// let client = MicrosoftIdentityClient::new(&config)?;
/// let challenge = client.request_device_code().await?;
/// println!("{}", challenge.message);
/// # Ok(())
/// # }
/// ```
pub struct MicrosoftIdentityClient {
    client: reqwest::Client,
    client_id: String,
    scope: String,
    device_code_url: String,
    token_url: String,
}

impl MicrosoftIdentityClient {
    pub fn new(config: &MsTodoConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            scope: config.scope(),
            device_code_url: config.device_code_url(),
            token_url: config.token_url(),
        })
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<(reqwest::StatusCode, String), AuthError> {
        let resp = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .form(params)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl IdentityProvider for MicrosoftIdentityClient {
    async fn request_device_code(&self) -> Result<DeviceCodeChallenge, AuthError> {
        debug!(url = %self.device_code_url, "requesting device code");
        let (status, body) = self
            .post_form(
                &self.device_code_url,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("scope", self.scope.as_str()),
                ],
            )
            .await?;
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "device code request failed: {body}"
            )));
        }
        let payload: DeviceCodeResponse = serde_json::from_str(&body).map_err(|err| {
            AuthError::Provider(format!("invalid device code response: {err}"))
        })?;
        Ok(DeviceCodeChallenge::from_response(payload, Instant::now()))
    }

    async fn exchange_device_code(&self, device_code: &str) -> Result<DeviceCodePoll, AuthError> {
        let (status, body) = self
            .post_form(
                &self.token_url,
                &[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", device_code),
                ],
            )
            .await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "device code exchange not yet authorized");
            return Ok(DeviceCodePoll::from_error_body(body));
        }
        let token: TokenResponse = serde_json::from_str(&body).map_err(|err| {
            AuthError::Provider(format!("invalid token response: {err}"))
        })?;
        Ok(DeviceCodePoll::Authorized { token })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        debug!(url = %self.token_url, "refreshing access token");
        let (status, body) = self
            .post_form(
                &self.token_url,
                &[
                    ("grant_type", REFRESH_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("refresh_token", refresh_token),
                    ("scope", self.scope.as_str()),
                ],
            )
            .await?;
        if !status.is_success() {
            return Err(AuthError::Provider(format!(
                "token refresh failed (user may need to re-authenticate): {body}"
            )));
        }
        serde_json::from_str(&body)
            .map_err(|err| AuthError::Provider(format!("invalid refresh response: {err}")))
    }
}
