//! Tor control port client
//!
//! Speaks the subset of the control protocol needed for identity
//! rotation: AUTHENTICATE, SIGNAL NEWNYM, GETINFO and CLOSECIRCUIT.

use crate::config::TorConfig;
use anyhow::{bail, Context, Result};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Read timeout for a single control port reply line
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Tracks the NEWNYM rate-limit window.
///
/// The daemon honors at most one NEWNYM per cooldown window; signaling
/// earlier is ignored by daemon policy. The controller mirrors the
/// window locally and reports the remaining wait.
#[derive(Debug)]
pub struct NewnymTimer {
    last_signal: Option<Instant>,
    cooldown: Duration,
}

impl NewnymTimer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_signal: None,
            cooldown,
        }
    }

    /// Record a NEWNYM signal at the current instant
    pub fn mark(&mut self) {
        self.last_signal = Some(Instant::now());
    }

    /// Remaining wait before the next NEWNYM will be honored
    pub fn remaining(&self) -> Duration {
        match self.last_signal {
            None => Duration::ZERO,
            Some(at) => self.cooldown.saturating_sub(at.elapsed()),
        }
    }
}

/// Connection to the Tor control port
pub struct TorController {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    authenticated: bool,
    newnym: NewnymTimer,
}

impl TorController {
    /// Connect to the control port. Authentication is deferred to
    /// [`TorController::authenticate`].
    pub async fn connect(config: &TorConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.control_host, config.control_port);
        debug!("connecting to Tor control port {}", addr);

        let stream = TcpStream::connect(&addr)
            .await
            .with_context(|| format!("failed to connect to Tor control port {}", addr))?;

        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            authenticated: false,
            newnym: NewnymTimer::new(Duration::from_secs(config.newnym_cooldown_secs)),
        })
    }

    /// Send a command and collect the reply payload lines.
    ///
    /// Reply format: `250-` continuation lines, `250+` data blocks
    /// terminated by a lone `.`, and a final `250 ` line. Any 4xx/5xx
    /// reply is an error.
    async fn command(&mut self, cmd: &str) -> Result<Vec<String>> {
        self.writer
            .write_all(format!("{}\r\n", cmd).as_bytes())
            .await
            .context("failed to send control command")?;
        self.writer
            .flush()
            .await
            .context("failed to flush control stream")?;

        let mut lines = Vec::new();
        let mut in_data = false;

        loop {
            let mut line = String::new();
            let read = tokio::time::timeout(REPLY_TIMEOUT, self.reader.read_line(&mut line))
                .await
                .context("timed out waiting for a control port reply")?
                .context("failed to read control port reply")?;

            if read == 0 {
                bail!("control port connection closed");
            }

            let line = line.trim_end();

            if in_data {
                if line == "." {
                    in_data = false;
                } else {
                    lines.push(line.to_string());
                }
                continue;
            }

            let (code, separator, text) = split_reply(line)?;
            if !code.starts_with('2') {
                bail!("control port error: {}", line);
            }

            match separator {
                '+' => {
                    in_data = true;
                    if !text.is_empty() {
                        lines.push(text.to_string());
                    }
                }
                '-' => lines.push(text.to_string()),
                _ => {
                    if !text.is_empty() && text != "OK" {
                        lines.push(text.to_string());
                    }
                    break;
                }
            }
        }

        Ok(lines)
    }

    /// Authenticate with the configured control password.
    ///
    /// Safe to call repeatedly; Tor accepts re-authentication on an
    /// open control connection.
    pub async fn authenticate(&mut self, password: &str) -> Result<()> {
        let cmd = format!("AUTHENTICATE \"{}\"", quote_escape(password));
        self.command(&cmd)
            .await
            .context("control port authentication failed (check the control password)")?;
        self.authenticated = true;
        debug!("authenticated with Tor control port");
        Ok(())
    }

    /// Request a fresh circuit and start the rate-limit window
    pub async fn signal_newnym(&mut self) -> Result<()> {
        if !self.authenticated {
            bail!("not authenticated");
        }
        self.command("SIGNAL NEWNYM").await?;
        self.newnym.mark();
        info!("requested a new Tor circuit");
        Ok(())
    }

    /// Remaining cooldown before the next NEWNYM is honored
    pub fn newnym_wait(&self) -> Duration {
        self.newnym.remaining()
    }

    /// Raw GETINFO query
    pub async fn get_info(&mut self, keyword: &str) -> Result<Vec<String>> {
        self.command(&format!("GETINFO {}", keyword)).await
    }

    /// Tor daemon version string
    pub async fn get_version(&mut self) -> Result<String> {
        let lines = self.get_info("version").await?;
        lines
            .iter()
            .find_map(|line| line.strip_prefix("version="))
            .map(str::to_string)
            .context("version missing from GETINFO reply")
    }

    /// Whether the daemon has finished bootstrapping circuits
    pub async fn is_bootstrapped(&mut self) -> Result<bool> {
        let lines = self.get_info("status/bootstrap-phase").await?;
        Ok(lines.iter().any(|line| line.contains("PROGRESS=100")))
    }

    /// Close every open circuit so follow-up requests cannot reuse a
    /// pre-renewal path. Returns the number of circuits closed.
    pub async fn close_all_circuits(&mut self) -> Result<usize> {
        if !self.authenticated {
            bail!("not authenticated");
        }

        let lines = self.get_info("circuit-status").await?;
        let ids: Vec<String> = lines
            .iter()
            .filter_map(|line| circuit_id(line))
            .map(str::to_string)
            .collect();

        for id in &ids {
            self.command(&format!("CLOSECIRCUIT {}", id)).await?;
        }

        debug!("closed {} circuits", ids.len());
        Ok(ids.len())
    }
}

/// Split a reply line into (code, separator, text).
///
/// `250 OK` -> ("250", ' ', "OK"); `250-version=...` -> ("250", '-', ...)
fn split_reply(line: &str) -> Result<(&str, char, &str)> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        bail!("malformed control port reply: {:?}", line);
    }
    let separator = if bytes.len() > 3 { bytes[3] as char } else { ' ' };
    if !matches!(separator, ' ' | '-' | '+') {
        bail!("malformed control port reply: {:?}", line);
    }
    // indices 0..4 are ASCII here, so slicing is safe
    let code = &line[..3];
    let text = if line.len() > 4 { &line[4..] } else { "" };
    Ok((code, separator, text))
}

/// First token of a circuit-status line, if it is a circuit id
fn circuit_id(line: &str) -> Option<&str> {
    let candidate = line
        .strip_prefix("circuit-status=")
        .unwrap_or(line)
        .split_whitespace()
        .next()?;
    if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_digit()) {
        Some(candidate)
    } else {
        None
    }
}

/// Escape a string for the control protocol's quoted-string form
fn quote_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
