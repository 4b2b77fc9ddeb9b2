//! `get` and `post` commands

use super::{parse_headers, GetArgs, PostArgs};
use crate::client::TorClient;
use crate::config::Config;
use anyhow::{Context, Result};
use serde_json::Value;

/// Proxied GET; prints the status line and body
pub async fn run_get(config: Config, args: &GetArgs) -> Result<()> {
    let headers = parse_headers(&args.headers)?;
    let client = TorClient::new(config)?;

    let response = client.get(&args.url, Some(&headers)).await?;
    print_response(response).await
}

/// Proxied JSON POST; prints the status line and body
pub async fn run_post(config: Config, args: &PostArgs) -> Result<()> {
    let headers = parse_headers(&args.headers)?;
    let body = match &args.body {
        Some(raw) => {
            Some(serde_json::from_str::<Value>(raw).context("request body is not valid JSON")?)
        }
        None => None,
    };
    let client = TorClient::new(config)?;

    let response = client.post(&args.url, Some(&headers), body.as_ref()).await?;
    print_response(response).await
}

async fn print_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let body = response.text().await.context("failed to read response body")?;

    println!("{}", status);
    if !body.is_empty() {
        println!("{}", body);
    }
    Ok(())
}
