use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound applied to a provider-reported `expires_in`, in seconds.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// Persisted credential record. One per installation.
///
/// # Example
/// ```
/// use mstodo::auth::TokenRecord;
/// use chrono::{Duration, Utc};
///
/// let record = TokenRecord {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     expires_at: Utc::now() + Duration::hours(1),
/// };
/// assert!(record.is_fresh(Utc::now(), Duration::minutes(5)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Build a record from a token endpoint response received at `now`.
    ///
    /// Falls back to `previous_refresh` when the provider did not rotate the
    /// refresh token. Lifetimes beyond [`MAX_TOKEN_LIFETIME_SECS`] are clamped.
    pub fn from_response(
        response: &TokenResponse,
        previous_refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let refresh_token = response
            .refresh_token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();
        Self {
            access_token: response.access_token.clone(),
            refresh_token,
            expires_at: now + lifetime(response.expires_in),
        }
    }

    /// True when the access token is still usable for at least `buffer`.
    pub fn is_fresh(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        now + buffer < self.expires_at
    }
}

fn lifetime(expires_in: u64) -> Duration {
    let secs = i64::try_from(expires_in.min(MAX_TOKEN_LIFETIME_SECS)).unwrap_or(i64::MAX);
    Duration::seconds(secs)
}

/// Successful token endpoint payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}
