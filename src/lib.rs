//! mstodo — Microsoft To-Do authentication core
//!
//! Device-code sign-in against the Microsoft identity platform, token
//! persistence and refresh-on-demand for a Microsoft To-Do MCP server.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mstodo::auth::TokenManager;
//! use mstodo::config::MsTodoConfig;
//! use mstodo::tools::AuthTools;
//!
//! # async fn example() -> mstodo::error::Result<()> {
//! let config = MsTodoConfig::from_env()?;
//! let manager = Arc::new(TokenManager::from_config(&config)?);
//! let tools = AuthTools::new(Arc::clone(&manager));
//! println!("{}", tools.login().await.text);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod tools;

#[cfg(feature = "cli")]
pub mod cli;
