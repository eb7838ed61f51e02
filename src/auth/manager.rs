use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::device_code::DeviceCodeChallenge;
use super::error::AuthError;
use super::poller::{poll_for_token, PollConfig};
use super::provider::{IdentityProvider, MicrosoftIdentityClient};
use super::store::{FileTokenStore, TokenStore};
use super::token::{TokenRecord, TokenResponse};
use crate::config::MsTodoConfig;

/// What the user needs to finish a device-code sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPrompt {
    pub verification_uri: String,
    pub user_code: String,
    pub message: String,
    pub expires_in: u64,
}

impl From<&DeviceCodeChallenge> for LoginPrompt {
    fn from(challenge: &DeviceCodeChallenge) -> Self {
        Self {
            verification_uri: challenge.verification_uri.clone(),
            user_code: challenge.user_code.clone(),
            message: challenge.message.clone(),
            expires_in: challenge.expires_in,
        }
    }
}

/// Stored credential state, derived without network traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStatus {
    LoggedOut,
    Active { expires_at: DateTime<Utc> },
    /// Access token expired; the next [`TokenManager::get_valid_token`] refreshes it.
    Expired { expires_at: DateTime<Utc> },
}

/// Owns the token lifecycle: device-code login, storage and refresh.
///
/// Share it as `Arc<TokenManager>` between tool handlers. The pending
/// device-code login is a single slot on the instance, so concurrent logins
/// through the same manager replace each other.
///
/// # Example
/// ```no_run
/// use mstodo::auth::TokenManager;
/// use mstodo::config::MsTodoConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = TokenManager::from_config(&MsTodoConfig::from_env()?)?;
/// let token = manager.get_valid_token().await?;
/// println!("Authorization: Bearer {token}");
/// # Ok(())
/// # }
/// ```
pub struct TokenManager {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn TokenStore>,
    pending: Mutex<Option<DeviceCodeChallenge>>,
    refresh_lock: Mutex<()>,
    refresh_buffer: Duration,
    poll_config: PollConfig,
}

impl TokenManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            provider,
            store,
            pending: Mutex::new(None),
            refresh_lock: Mutex::new(()),
            refresh_buffer: Duration::minutes(5),
            poll_config: PollConfig::default(),
        }
    }

    /// Build a manager backed by the Microsoft identity platform and the
    /// configured token file.
    pub fn from_config(config: &MsTodoConfig) -> Result<Self, AuthError> {
        let provider = MicrosoftIdentityClient::new(config)?;
        let store = FileTokenStore::new(config.token_path.clone());
        Ok(Self::new(Arc::new(provider), Arc::new(store))
            .with_refresh_buffer(config.refresh_buffer)
            .with_poll_config(PollConfig {
                max_interval: config.max_poll_interval,
            }))
    }

    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    pub fn with_poll_config(mut self, config: PollConfig) -> Self {
        self.poll_config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Return a bearer token that stays valid for at least the refresh buffer.
    ///
    /// Serves the stored token without network traffic while it is fresh and
    /// refreshes it otherwise.
    pub async fn get_valid_token(&self) -> Result<String, AuthError> {
        let record = self.store.load()?.ok_or(AuthError::NotAuthenticated)?;
        if record.is_fresh(Utc::now(), self.refresh_buffer) {
            return Ok(record.access_token);
        }
        debug!(expires_at = %record.expires_at, "access token near expiry");
        self.refresh(record).await
    }

    /// Exchange the record's refresh token, persist the result and return the
    /// new access token. Provider failures are not retried.
    pub async fn refresh(&self, record: TokenRecord) -> Result<String, AuthError> {
        let _guard = self.refresh_lock.lock().await;

        // A concurrent caller may have refreshed while this one waited.
        let current = self.store.load()?.ok_or(AuthError::NotAuthenticated)?;
        if current.access_token != record.access_token
            && current.is_fresh(Utc::now(), self.refresh_buffer)
        {
            return Ok(current.access_token);
        }
        if current.refresh_token.is_empty() {
            return Err(AuthError::Provider(
                "no refresh token stored (user may need to re-authenticate)".to_string(),
            ));
        }

        let response = match self.provider.refresh(&current.refresh_token).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                return Err(err);
            }
        };
        // Credentials removed underneath the provider call stay removed.
        if self.store.load()?.is_none() {
            return Err(AuthError::NotAuthenticated);
        }
        let refreshed = TokenRecord::from_response(&response, Some(&current.refresh_token), Utc::now());
        self.store.save(&refreshed)?;
        info!(expires_at = %refreshed.expires_at, "access token refreshed");
        Ok(refreshed.access_token)
    }

    /// Request a device code and remember it as the pending login.
    ///
    /// Returns immediately; a previous pending login is discarded.
    pub async fn begin_login(&self) -> Result<LoginPrompt, AuthError> {
        let challenge = self.provider.request_device_code().await?;
        let prompt = LoginPrompt::from(&challenge);
        let replaced = self.pending.lock().await.replace(challenge).is_some();
        info!(
            expires_in = prompt.expires_in,
            replaced_pending = replaced,
            "device code login started"
        );
        Ok(prompt)
    }

    /// Wait for the user to finish the pending login and persist the tokens.
    ///
    /// Blocks for up to the challenge lifetime. The pending slot is empty
    /// afterwards whatever the outcome.
    pub async fn complete_login(&self, cancel: CancellationToken) -> Result<TokenRecord, AuthError> {
        let challenge = self
            .pending
            .lock()
            .await
            .take()
            .ok_or(AuthError::NoLoginInProgress)?;
        let response = self.run_poll(challenge, cancel).await?;
        self.persist_login(&response)
    }

    /// One-shot login: request a code, hand the prompt to `on_prompt`, then
    /// poll until the user signs in. Does not touch the pending slot.
    pub async fn login_interactive<F>(
        &self,
        on_prompt: F,
        cancel: CancellationToken,
    ) -> Result<TokenRecord, AuthError>
    where
        F: FnOnce(&LoginPrompt),
    {
        let challenge = self.provider.request_device_code().await?;
        on_prompt(&LoginPrompt::from(&challenge));
        let response = self.run_poll(challenge, cancel).await?;
        self.persist_login(&response)
    }

    pub async fn has_pending_login(&self) -> bool {
        self.pending.lock().await.is_some()
    }

    /// Remove stored credentials and drop any pending login.
    ///
    /// Waits for an in-flight refresh to finish before clearing the store.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.pending.lock().await.take();
        // Waits out an in-flight refresh so it cannot write the file back.
        let _guard = self.refresh_lock.lock().await;
        self.store.clear()?;
        info!("stored credentials removed");
        Ok(())
    }

    pub fn status(&self) -> Result<LoginStatus, AuthError> {
        Ok(match self.store.load()? {
            None => LoginStatus::LoggedOut,
            Some(record) if record.expires_at > Utc::now() => LoginStatus::Active {
                expires_at: record.expires_at,
            },
            Some(record) => LoginStatus::Expired {
                expires_at: record.expires_at,
            },
        })
    }

    /// Poll on a dedicated task so the caller's executor thread stays free.
    ///
    /// Dropping the returned future cancels the poll.
    async fn run_poll(
        &self,
        challenge: DeviceCodeChallenge,
        cancel: CancellationToken,
    ) -> Result<TokenResponse, AuthError> {
        let cancel = cancel.child_token();
        let _cancel_on_drop = cancel.clone().drop_guard();
        let provider = Arc::clone(&self.provider);
        let config = self.poll_config;
        let handle = tokio::spawn(async move {
            poll_for_token(provider.as_ref(), &challenge, config, &cancel).await
        });
        match handle.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(AuthError::Cancelled),
        }
    }

    fn persist_login(&self, response: &TokenResponse) -> Result<TokenRecord, AuthError> {
        let record = TokenRecord::from_response(response, None, Utc::now());
        self.store.save(&record)?;
        info!(expires_at = %record.expires_at, "device code login completed");
        Ok(record)
    }
}
