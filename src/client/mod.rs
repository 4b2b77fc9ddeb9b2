//! Tor-proxied HTTP client with exit IP rotation
//!
//! [`TorClient`] holds a persistent HTTP session egressing through the
//! local Tor SOCKS listener and drives the control port to rotate the
//! exit address. Intended for sequential use by a single caller.

mod session;

pub use session::HttpSession;

use crate::config::Config;
use crate::tor::TorController;
use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, error, info};

pub struct TorClient {
    config: Config,
    session: HttpSession,
    control_password: String,
    controller: Option<TorController>,
    ip_history: Vec<String>,
}

impl TorClient {
    /// Build a client from configuration.
    ///
    /// Fails when the configuration is invalid or no real control
    /// password is available. The daemon is never started here; call
    /// [`crate::tor::daemon::ensure_running`] explicitly when that is
    /// wanted.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let control_password = config.tor.resolved_control_password()?;
        let session = HttpSession::new(&config)?;

        Ok(Self {
            config,
            session,
            control_password,
            controller: None,
            ip_history: Vec::new(),
        })
    }

    /// Control session, established on first use and kept open until
    /// the process exits
    async fn controller(&mut self) -> Result<&mut TorController> {
        if self.controller.is_none() {
            let controller = TorController::connect(&self.config.tor).await?;
            self.controller = Some(controller);
        }
        self.controller
            .as_mut()
            .context("control session unavailable")
    }

    /// GET through the Tor proxy. Call-time headers win over the
    /// configured defaults on name collision.
    pub async fn get(&self, url: &str, headers: Option<&HeaderMap>) -> Result<reqwest::Response> {
        self.session.get(url, headers).await
    }

    /// JSON POST through the Tor proxy. A missing body is sent as `{}`.
    pub async fn post(
        &self,
        url: &str,
        headers: Option<&HeaderMap>,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        self.session.post(url, headers, body).await
    }

    /// Current public IP.
    ///
    /// Always resolves the local (unproxied) address first. With
    /// `prefer_tor` the exit address is additionally fetched through
    /// the proxy and returned instead. When the two match, traffic is
    /// not actually leaving through Tor: an error is logged, but the
    /// value is still handed back for the caller to inspect.
    pub async fn get_ip(&self, prefer_tor: bool) -> Result<String> {
        let url = &self.config.lookup.url;

        let local = self.session.get_direct(url).await?;
        let payload: Value = local
            .json()
            .await
            .context("IP lookup response was not JSON")?;
        let local_ip = parse_ip_field(&payload)?;

        if !prefer_tor {
            return Ok(local_ip);
        }

        let proxied = self.session.get(url, None).await?;
        let payload: Value = proxied
            .json()
            .await
            .context("proxied IP lookup response was not JSON")?;
        let tor_ip = parse_ip_field(&payload)?;

        if tor_ip == local_ip {
            error!(
                "exit IP {} matches the local IP - traffic is NOT protected",
                tor_ip
            );
        }

        Ok(tor_ip)
    }

    /// Rotate the exit IP, retrying until it actually changes.
    ///
    /// Returns `Ok(true)` once the exit IP differs from the one
    /// observed before signaling, `Ok(false)` after `max_retries`
    /// unchanged attempts. A failed AUTHENTICATE aborts immediately:
    /// retrying cannot fix a bad control password.
    pub async fn renew_identity(&mut self, max_retries: u32) -> Result<bool> {
        for attempt in 1..=max_retries {
            let current_ip = self.get_ip(true).await?;
            self.ip_history.push(current_ip.clone());

            let password = self.control_password.clone();
            let close_circuits = self.config.tor.close_circuits_on_renew;

            let controller = self.controller().await?;
            controller.authenticate(&password).await?;
            controller.signal_newnym().await?;

            // The daemon rejects or ignores NEWNYM inside the cooldown
            // window, so the follow-up fetch must wait it out.
            let wait = controller.newnym_wait();
            debug!("waiting {:?} for the NEWNYM cooldown", wait);
            tokio::time::sleep(wait).await;

            if close_circuits {
                let controller = self.controller().await?;
                controller.close_all_circuits().await?;
            }

            let new_ip = self.get_ip(true).await?;
            if new_ip != current_ip {
                info!("exit IP renewed: {} -> {}", current_ip, new_ip);
                return Ok(true);
            }
            info!(
                "exit IP unchanged on attempt {}/{}, retrying",
                attempt, max_retries
            );
        }

        error!("failed to renew the exit IP after {} attempts", max_retries);
        Ok(false)
    }

    /// Exit IPs recorded at the start of each renewal attempt, oldest
    /// first. Diagnostic only; never pruned.
    pub fn ip_history(&self) -> &[String] {
        &self.ip_history
    }
}

/// Extract the `ip` field from a lookup endpoint reply
fn parse_ip_field(payload: &Value) -> Result<String> {
    payload
        .get("ip")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("IP lookup response is missing the `ip` field")
}
