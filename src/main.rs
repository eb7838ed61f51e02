//! mstodo CLI binary entry point.

use clap::Parser;
use mstodo::cli::{AuthCommands, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login => mstodo::cli::auth::handle_login().await,
            AuthCommands::Status => mstodo::cli::auth::handle_status().await,
            AuthCommands::Logout => mstodo::cli::auth::handle_logout().await,
            AuthCommands::Token => mstodo::cli::auth::handle_token().await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
