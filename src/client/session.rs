//! Proxied HTTP session
//!
//! Owns the reqwest clients: one egressing through the Tor SOCKS
//! listener with a persistent cookie store, one direct for local
//! lookups. The proxy is bound at client construction, so no request
//! issued through the proxied client can bypass it.

use crate::config::Config;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Reusable connection and cookie context for proxied requests
pub struct HttpSession {
    proxied: reqwest::Client,
    direct: reqwest::Client,
    defaults: HeaderMap,
}

impl HttpSession {
    pub fn new(config: &Config) -> Result<Self> {
        let socks_url = format!(
            "socks5h://{}:{}",
            config.tor.socks_host, config.tor.socks_port
        );
        let proxy = reqwest::Proxy::all(&socks_url)
            .with_context(|| format!("failed to configure SOCKS proxy {}", socks_url))?;

        let timeout = Duration::from_secs(config.http.timeout_secs);
        let connect_timeout = Duration::from_secs(config.http.connect_timeout_secs);

        let proxied = reqwest::Client::builder()
            .proxy(proxy)
            .cookie_store(true)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .context("failed to build proxied HTTP client")?;

        let direct = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .context("failed to build direct HTTP client")?;

        let defaults = build_header_map(&config.http.headers)?;

        Ok(Self {
            proxied,
            direct,
            defaults,
        })
    }

    /// Merge call-time headers over the session defaults.
    /// Call-time entries win on name collision.
    pub fn merge_headers(&self, extra: Option<&HeaderMap>) -> HeaderMap {
        let mut merged = self.defaults.clone();
        if let Some(extra) = extra {
            for (name, value) in extra {
                merged.insert(name.clone(), value.clone());
            }
        }
        merged
    }

    /// GET through the Tor proxy. No retries; transport errors
    /// propagate to the caller.
    pub async fn get(&self, url: &str, headers: Option<&HeaderMap>) -> Result<reqwest::Response> {
        let response = self
            .proxied
            .get(url)
            .headers(self.merge_headers(headers))
            .send()
            .await
            .with_context(|| format!("GET {} via Tor failed", url))?;
        Ok(response)
    }

    /// JSON POST through the Tor proxy. A missing body is sent as the
    /// empty object `{}`.
    pub async fn post(
        &self,
        url: &str,
        headers: Option<&HeaderMap>,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let empty = Value::Object(serde_json::Map::new());
        let payload = body.unwrap_or(&empty);

        let response = self
            .proxied
            .post(url)
            .headers(self.merge_headers(headers))
            .json(payload)
            .send()
            .await
            .with_context(|| format!("POST {} via Tor failed", url))?;
        Ok(response)
    }

    /// GET without the proxy. Used only for local-IP lookups; default
    /// headers are deliberately not attached.
    pub async fn get_direct(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .direct
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        Ok(response)
    }
}

/// Convert configured string headers into a typed header map
pub fn build_header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name: {}", name))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("invalid value for header {}", name))?;
        map.insert(name, value);
    }
    Ok(map)
}
