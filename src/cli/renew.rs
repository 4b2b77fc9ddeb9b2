//! `renew` command

use super::RenewArgs;
use crate::client::TorClient;
use crate::config::Config;
use anyhow::Result;

/// Rotate the exit IP. Exits non-zero when the IP did not change
/// within the configured attempt bound.
pub async fn run_renew(config: Config, args: &RenewArgs) -> Result<()> {
    let mut client = TorClient::new(config)?;

    let renewed = client.renew_identity(args.max_retries).await?;
    if !renewed {
        // Exhaustion is already logged by the client; surface it in
        // the exit status for scripts.
        std::process::exit(1);
    }

    let exit_ip = client.get_ip(true).await?;
    println!("{}", exit_ip);
    Ok(())
}
