//! torrotate library crate
//!
//! Routes HTTP requests through a local Tor SOCKS proxy and rotates the
//! exit IP address on demand via the control port.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface (ip, renew, get, post, daemon)
//! - [`client`] - Proxied HTTP session and identity rotation
//! - [`config`] - Configuration loading and validation
//! - [`logging`] - Structured logging setup
//! - [`tor`] - Control port client and daemon management

// Allow common stylistic patterns during development.
// These can be tightened as the codebase matures.
#![allow(clippy::uninlined_format_args)] // Format string style preference
#![allow(clippy::doc_markdown)] // Doc formatting is secondary
#![allow(clippy::missing_const_for_fn)] // Const fn optimization is low priority
#![allow(clippy::module_name_repetitions)] // Explicit type names are clearer

pub mod cli;
pub mod client;
pub mod config;
pub mod logging;
pub mod tor;

pub use client::TorClient;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
