// src/public_ip.rs - "what is my public IP" lookup

use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};

const IPIFY_URL: &str = "https://api.ipify.org";

/// Asks ipify for the caller's current public IPv4 address.
pub async fn lookup() -> Result<Ipv4Addr> {
    info!("Getting our public IP address");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("cloudstart/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let body = client
        .get(IPIFY_URL)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    body.trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| Error::Api(format!("unparseable public IP '{}': {}", body.trim(), e)))
}
