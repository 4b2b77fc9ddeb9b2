//! Command-line interface for torrotate
//!
//! Thin wrapper around [`crate::client::TorClient`]:
//! - `ip` - print the current exit (or local) IP
//! - `renew` - rotate the exit IP
//! - `get` / `post` - issue proxied requests
//! - `daemon` - manage and inspect the local Tor service

mod daemon;
mod fetch;
mod ip;
mod renew;

pub use daemon::run_daemon;
pub use fetch::{run_get, run_post};
pub use ip::run_ip;
pub use renew::run_renew;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::path::PathBuf;

/// torrotate - Tor exit IP rotation client
#[derive(Parser, Debug)]
#[command(name = "torrotate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the current exit IP (or the local IP)
    Ip(IpArgs),

    /// Request new Tor circuits until the exit IP changes
    Renew(RenewArgs),

    /// Issue a GET request through the Tor proxy
    Get(GetArgs),

    /// Issue a JSON POST request through the Tor proxy
    Post(PostArgs),

    /// Manage the local Tor service
    Daemon(DaemonArgs),
}

/// Arguments for the ip command
#[derive(Parser, Debug)]
pub struct IpArgs {
    /// Show the local (unproxied) IP instead of the exit IP
    #[arg(long, default_value_t = false)]
    pub local: bool,
}

/// Arguments for the renew command
#[derive(Parser, Debug)]
pub struct RenewArgs {
    /// Maximum number of renewal attempts
    #[arg(long, default_value_t = 5)]
    pub max_retries: u32,
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Target URL
    #[arg(long)]
    pub url: String,

    /// Extra request header ("Name: Value"), repeatable
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,
}

/// Arguments for the post command
#[derive(Parser, Debug)]
pub struct PostArgs {
    /// Target URL
    #[arg(long)]
    pub url: String,

    /// Extra request header ("Name: Value"), repeatable
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// JSON request body (defaults to {})
    #[arg(long)]
    pub body: Option<String>,
}

/// Arguments for the daemon command
#[derive(Parser, Debug)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub action: DaemonAction,
}

/// Daemon subcommands
#[derive(Subcommand, Debug)]
pub enum DaemonAction {
    /// Start the Tor service if it is not already running
    Start,

    /// Report service and port reachability
    Status,
}

/// Parse repeated "Name: Value" header arguments into a typed map
pub fn parse_headers(raw: &[String]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(raw.len());
    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .with_context(|| format!("invalid header (expected \"Name: Value\"): {}", entry))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("invalid header name in: {}", entry))?;
        let value = HeaderValue::from_str(value.trim())
            .with_context(|| format!("invalid header value in: {}", entry))?;
        map.insert(name, value);
    }
    Ok(map)
}
