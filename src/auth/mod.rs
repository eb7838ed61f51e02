//! OAuth device-code login, token storage and refresh.

pub mod device_code;
pub mod error;
pub mod manager;
pub mod poller;
pub mod provider;
pub mod store;
pub mod token;

pub use device_code::{DeviceCodeChallenge, DeviceCodePoll, ProviderErrorReason};
pub use error::AuthError;
pub use manager::{LoginPrompt, LoginStatus, TokenManager};
pub use poller::{poll_for_token, PollConfig};
pub use provider::{IdentityProvider, MicrosoftIdentityClient};
pub use store::{FileTokenStore, TokenStore};
pub use token::{TokenRecord, TokenResponse};
