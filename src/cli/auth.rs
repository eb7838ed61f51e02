//! CLI auth command handlers for login, status, logout and token.

use tokio_util::sync::CancellationToken;

use crate::auth::{LoginStatus, TokenManager};
use crate::config::MsTodoConfig;

fn manager() -> Result<TokenManager, Box<dyn std::error::Error>> {
    let config = MsTodoConfig::from_env()?;
    Ok(TokenManager::from_config(&config)?)
}

/// Handle `mstodo auth login`.
pub async fn handle_login() -> Result<(), Box<dyn std::error::Error>> {
    let manager = manager()?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let record = manager
        .login_interactive(
            |prompt| {
                println!("\n{}", prompt.message);
                println!(
                    "\nWaiting for authentication (expires in {} seconds)...",
                    prompt.expires_in
                );
            },
            cancel,
        )
        .await?;

    println!(
        "\n✓ Authentication successful! Tokens saved (access token expires {}).",
        record.expires_at.format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

/// Handle `mstodo auth status`.
pub async fn handle_status() -> Result<(), Box<dyn std::error::Error>> {
    let manager = manager()?;
    match manager.status()? {
        LoginStatus::LoggedOut => println!("❌ Not logged in"),
        LoginStatus::Active { expires_at } => println!(
            "✅ Logged in (expires {})",
            expires_at.format("%Y-%m-%d %H:%M")
        ),
        LoginStatus::Expired { .. } => println!("⚠️  Token expired (will refresh on next use)"),
    }
    Ok(())
}

/// Handle `mstodo auth logout`.
pub async fn handle_logout() -> Result<(), Box<dyn std::error::Error>> {
    manager()?.logout().await?;
    println!("✅ Logged out");
    Ok(())
}

/// Handle `mstodo auth token`.
pub async fn handle_token() -> Result<(), Box<dyn std::error::Error>> {
    let token = manager()?.get_valid_token().await?;
    println!("{token}");
    Ok(())
}
