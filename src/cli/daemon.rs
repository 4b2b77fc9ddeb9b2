//! `daemon` command

use super::{DaemonAction, DaemonArgs};
use crate::config::{Config, TorConfig};
use crate::tor::{daemon, TorController};
use anyhow::Result;
use tracing::warn;

/// Start or inspect the local Tor service
pub async fn run_daemon(config: Config, args: &DaemonArgs) -> Result<()> {
    match args.action {
        DaemonAction::Start => {
            daemon::ensure_running()?;
            println!("tor is running");
            Ok(())
        }
        DaemonAction::Status => run_status(&config).await,
    }
}

async fn run_status(config: &Config) -> Result<()> {
    let tor = &config.tor;

    let service = if daemon::is_running() {
        "active"
    } else {
        "inactive"
    };
    println!("service: {}", service);

    println!(
        "socks {}:{}: {}",
        tor.socks_host,
        tor.socks_port,
        reachability(daemon::socks_reachable(tor))
    );
    println!(
        "control {}:{}: {}",
        tor.control_host,
        tor.control_port,
        reachability(daemon::control_reachable(tor))
    );

    if daemon::control_reachable(tor) {
        match probe_control(tor).await {
            Ok((version, bootstrapped)) => {
                println!("tor version: {}", version);
                println!("bootstrapped: {}", if bootstrapped { "yes" } else { "no" });
            }
            Err(e) => warn!("control port probe failed: {:#}", e),
        }
    }

    Ok(())
}

async fn probe_control(tor: &TorConfig) -> Result<(String, bool)> {
    let password = tor.resolved_control_password()?;
    let mut controller = TorController::connect(tor).await?;
    controller.authenticate(&password).await?;

    let version = controller.get_version().await?;
    let bootstrapped = controller.is_bootstrapped().await?;
    Ok((version, bootstrapped))
}

fn reachability(reachable: bool) -> &'static str {
    if reachable {
        "reachable"
    } else {
        "unreachable"
    }
}
