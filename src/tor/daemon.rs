//! OS-level Tor daemon management
//!
//! The daemon is provisioned externally; these helpers only issue
//! best-effort service commands and reachability probes.

use crate::config::TorConfig;
use anyhow::{bail, Result};
use std::process::Command;
use tracing::{debug, info};

/// Service start commands, tried in order
const START_COMMANDS: &[(&str, &[&str])] = &[
    ("systemctl", &["start", "tor"]),
    ("service", &["tor", "start"]),
];

/// Start the Tor service if it is not already running.
///
/// Best-effort: succeeds as soon as one init system accepts the start
/// command. An externally provisioned daemon (container, torrc by
/// hand) is detected via `is_running` and left alone.
pub fn ensure_running() -> Result<()> {
    if is_running() {
        debug!("Tor service already active");
        return Ok(());
    }

    for (program, args) in START_COMMANDS {
        match Command::new(program).args(*args).status() {
            Ok(status) if status.success() => {
                info!("Tor started via {}", program);
                return Ok(());
            }
            Ok(status) => debug!("{} exited with {}", program, status),
            Err(e) => debug!("{} unavailable: {}", program, e),
        }
    }

    bail!("failed to start Tor: no suitable init system found")
}

/// Whether the Tor service is active according to the init system
pub fn is_running() -> bool {
    let result = Command::new("systemctl")
        .args(["is-active", "--quiet", "tor"])
        .status();
    matches!(result, Ok(status) if status.success())
}

/// TCP probe of the SOCKS listener
pub fn socks_reachable(config: &TorConfig) -> bool {
    std::net::TcpStream::connect((config.socks_host.as_str(), config.socks_port)).is_ok()
}

/// TCP probe of the control listener
pub fn control_reachable(config: &TorConfig) -> bool {
    std::net::TcpStream::connect((config.control_host.as_str(), config.control_port)).is_ok()
}
