//! torrotate - Tor exit IP rotation client
//!
//! Routes HTTP requests through a local Tor SOCKS proxy and rotates
//! the exit address on demand via the control port.
//!
//! # Usage
//!
//! ```bash
//! # Show the current exit IP
//! torrotate ip
//!
//! # Rotate the exit IP (up to 5 attempts)
//! torrotate renew --max-retries 5
//!
//! # Proxied requests
//! torrotate get --url https://example.com -H "Accept: application/json"
//! torrotate post --url https://example.com/api --body '{"key":"value"}'
//!
//! # Service management
//! torrotate daemon status
//! ```

use anyhow::Result;
use clap::Parser;
use torrotate::cli::{self, Cli, Commands};
use torrotate::{config, logging};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        logging::init_with_level(Level::DEBUG);
    } else {
        logging::init();
    }

    let config = match &cli.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load()?,
    };

    match &cli.command {
        Commands::Ip(args) => cli::run_ip(config, args).await?,
        Commands::Renew(args) => cli::run_renew(config, args).await?,
        Commands::Get(args) => cli::run_get(config, args).await?,
        Commands::Post(args) => cli::run_post(config, args).await?,
        Commands::Daemon(args) => cli::run_daemon(config, args).await?,
    }

    Ok(())
}
