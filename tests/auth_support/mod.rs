#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mstodo::auth::{
    AuthError, DeviceCodeChallenge, DeviceCodePoll, IdentityProvider, TokenRecord, TokenResponse,
    TokenStore,
};
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Default)]
pub struct InMemoryTokenStore {
    record: Mutex<Option<TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(record: TokenRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    pub fn get(&self) -> Option<TokenRecord> {
        self.record.lock().expect("store lock poisoned").clone()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        Ok(self.get())
    }

    fn save(&self, record: &TokenRecord) -> Result<(), AuthError> {
        *self.record.lock().expect("store lock poisoned") = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.record.lock().expect("store lock poisoned").take();
        Ok(())
    }
}

/// Provider double that replays scripted exchange outcomes and records calls.
#[derive(Default)]
pub struct ScriptedProvider {
    device_codes: Mutex<VecDeque<DeviceCodeChallenge>>,
    exchanges: Mutex<VecDeque<DeviceCodePoll>>,
    refreshes: Mutex<VecDeque<Result<TokenResponse, AuthError>>>,
    exchange_log: Mutex<Vec<(String, Instant)>>,
    device_code_calls: Mutex<u32>,
    refresh_log: Mutex<Vec<String>>,
    refresh_started: Notify,
    refresh_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_device_code(&self, challenge: DeviceCodeChallenge) {
        self.device_codes.lock().unwrap().push_back(challenge);
    }

    pub fn push_exchange(&self, outcome: DeviceCodePoll) {
        self.exchanges.lock().unwrap().push_back(outcome);
    }

    pub fn push_refresh(&self, outcome: Result<TokenResponse, AuthError>) {
        self.refreshes.lock().unwrap().push_back(outcome);
    }

    pub fn exchange_log(&self) -> Vec<(String, Instant)> {
        self.exchange_log.lock().unwrap().clone()
    }

    pub fn exchange_count(&self) -> usize {
        self.exchange_log.lock().unwrap().len()
    }

    pub fn device_code_calls(&self) -> u32 {
        *self.device_code_calls.lock().unwrap()
    }

    pub fn refresh_log(&self) -> Vec<String> {
        self.refresh_log.lock().unwrap().clone()
    }

    /// Make every later refresh wait until the returned gate is notified.
    pub fn hold_refreshes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.refresh_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Resolves once a refresh call has reached the provider.
    pub async fn refresh_started(&self) {
        self.refresh_started.notified().await;
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn request_device_code(&self) -> Result<DeviceCodeChallenge, AuthError> {
        *self.device_code_calls.lock().unwrap() += 1;
        let mut challenge = self
            .device_codes
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AuthError::Provider("no scripted device code".to_string()))?;
        challenge.issued_at = Instant::now();
        Ok(challenge)
    }

    async fn exchange_device_code(&self, device_code: &str) -> Result<DeviceCodePoll, AuthError> {
        self.exchange_log
            .lock()
            .unwrap()
            .push((device_code.to_string(), Instant::now()));
        Ok(self
            .exchanges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(DeviceCodePoll::Pending))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.refresh_log.lock().unwrap().push(refresh_token.to_string());
        self.refresh_started.notify_one();
        let gate = self.refresh_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::Provider("no scripted refresh".to_string())))
    }
}

pub fn challenge(device_code: &str, interval_secs: u64, expires_in: u64) -> DeviceCodeChallenge {
    DeviceCodeChallenge {
        device_code: device_code.to_string(),
        user_code: format!("{}-CODE", device_code.to_uppercase()),
        verification_uri: "https://microsoft.com/devicelogin".to_string(),
        expires_in,
        interval: interval_secs,
        message: "To sign in, use a web browser to open the page https://microsoft.com/devicelogin"
            .to_string(),
        issued_at: Instant::now(),
    }
}

pub fn token_response(access_token: &str, refresh_token: Option<&str>) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_in: 3600,
        token_type: "Bearer".to_string(),
        scope: "Tasks.ReadWrite".to_string(),
    }
}

pub fn record(access_token: &str, expires_in: chrono::Duration) -> TokenRecord {
    TokenRecord {
        access_token: access_token.to_string(),
        refresh_token: format!("{access_token}-refresh"),
        expires_at: Utc::now() + expires_in,
    }
}

pub fn authorized(access_token: &str) -> DeviceCodePoll {
    DeviceCodePoll::Authorized {
        token: token_response(access_token, Some("refresh-1")),
    }
}

pub const SECOND: Duration = Duration::from_secs(1);
