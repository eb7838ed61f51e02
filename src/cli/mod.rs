//! CLI entry point for mstodo.

pub mod auth;

use clap::{Parser, Subcommand};

/// Microsoft To-Do auth CLI
#[derive(Parser, Debug)]
#[command(name = "mstodo", version, about = "Microsoft To-Do authentication CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication management
    Auth(AuthArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in with a device code and store the tokens
    Login,
    /// Show stored credential status
    Status,
    /// Delete stored credentials
    Logout,
    /// Print a valid access token, refreshing it if needed
    Token,
}
