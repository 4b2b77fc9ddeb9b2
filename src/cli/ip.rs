//! `ip` command

use super::IpArgs;
use crate::client::TorClient;
use crate::config::Config;
use anyhow::Result;

/// Print the current exit IP, or the local IP with `--local`
pub async fn run_ip(config: Config, args: &IpArgs) -> Result<()> {
    let client = TorClient::new(config)?;
    let ip = client.get_ip(!args.local).await?;
    println!("{}", ip);
    Ok(())
}
