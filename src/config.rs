//! Configuration loading and validation
//!
//! TOML configuration with strict validation. No runtime mutation -
//! configuration is immutable after load.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Default config file locations
const CONFIG_PATHS: &[&str] = &["/etc/torrotate/config.toml", "./torrotate.toml"];

/// Environment variable consulted when no control password is configured
pub const PASSWORD_ENV: &str = "TOR_PASSWORD";

/// Legacy placeholder that must never reach a real control port
const PLACEHOLDER_PASSWORD: &str = "YOUR_PASSWORD_HERE";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tor: TorConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Validate structural invariants (see [`validate`])
    pub fn validate(&self) -> Result<()> {
        validate(self)
    }
}

/// Tor daemon connection and rotation policy
#[derive(Debug, Clone, Deserialize)]
pub struct TorConfig {
    #[serde(default = "default_socks_host")]
    pub socks_host: String,
    #[serde(default = "default_socks_port")]
    pub socks_port: u16,
    #[serde(default = "default_control_host")]
    pub control_host: String,
    #[serde(default = "default_control_port")]
    pub control_port: u16,
    /// Control port password; falls back to $TOR_PASSWORD when unset
    pub control_password: Option<String>,
    /// Seconds the daemon rate-limits consecutive NEWNYM signals
    #[serde(default = "default_newnym_cooldown")]
    pub newnym_cooldown_secs: u64,
    /// Close lingering circuits after each renewal signal
    #[serde(default)]
    pub close_circuits_on_renew: bool,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            socks_host: default_socks_host(),
            socks_port: default_socks_port(),
            control_host: default_control_host(),
            control_port: default_control_port(),
            control_password: None,
            newnym_cooldown_secs: default_newnym_cooldown(),
            close_circuits_on_renew: false,
        }
    }
}

impl TorConfig {
    /// Resolve the control password: the explicit config value first,
    /// then the environment. An unset secret is a hard error - there is
    /// no placeholder fallback.
    pub fn resolved_control_password(&self) -> Result<String> {
        let password = match &self.control_password {
            Some(p) => p.clone(),
            None => std::env::var(PASSWORD_ENV).map_err(|_| {
                anyhow::anyhow!(
                    "no control password configured: set [tor] control_password or ${}",
                    PASSWORD_ENV
                )
            })?,
        };
        if password.is_empty() || password == PLACEHOLDER_PASSWORD {
            bail!("control password is a placeholder - refusing to use it against a control port");
        }
        Ok(password)
    }
}

fn default_socks_host() -> String {
    "127.0.0.1".to_string()
}
fn default_socks_port() -> u16 {
    crate::tor::DEFAULT_SOCKS_PORT
}
fn default_control_host() -> String {
    "127.0.0.1".to_string()
}
fn default_control_port() -> u16 {
    crate::tor::DEFAULT_CONTROL_PORT
}
fn default_newnym_cooldown() -> u64 {
    10
}

/// IP lookup endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    /// Endpoint returning a JSON body with an `ip` field
    #[serde(default = "default_lookup_url")]
    pub url: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            url: default_lookup_url(),
        }
    }
}

fn default_lookup_url() -> String {
    "https://api.ipify.org?format=json".to_string()
}

/// Outgoing HTTP request settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Default headers merged into every outgoing request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Total per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// TCP/SOCKS connect timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}
fn default_connect_timeout() -> u64 {
    30
}

/// Validate configuration invariants
pub fn validate(config: &Config) -> Result<()> {
    if config.tor.socks_port == 0 {
        bail!("[tor] socks_port must be non-zero");
    }
    if config.tor.control_port == 0 {
        bail!("[tor] control_port must be non-zero");
    }
    if config.tor.socks_host == config.tor.control_host
        && config.tor.socks_port == config.tor.control_port
    {
        bail!("[tor] socks_port and control_port must differ");
    }
    if !config.lookup.url.starts_with("http://") && !config.lookup.url.starts_with("https://") {
        bail!("[lookup] url must be an http(s) URL");
    }
    if let Some(password) = &config.tor.control_password {
        if password == PLACEHOLDER_PASSWORD {
            bail!("[tor] control_password is the placeholder value - set a real secret");
        }
    }
    Ok(())
}

/// Load configuration from the first default location, falling back to
/// built-in defaults when no file exists
pub fn load() -> Result<Config> {
    for path in CONFIG_PATHS {
        if Path::new(path).exists() {
            return load_from_path(Path::new(path));
        }
    }
    let config = Config::default();
    validate(&config)?;
    Ok(config)
}

/// Load and parse config from an explicit path
pub fn load_from_path(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    validate(&config)?;

    Ok(config)
}
