// src/dns/mod.rs - hosted zone resolution and record upsert

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};
use crate::poll::{poll_until, PollSpec};

mod route53;
pub use route53::Route53Dns;

/// A hosted zone as returned by the provider. Zone names always carry the
/// trailing dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The record the provider returned for a lookup; its name may differ from
/// the queried host when no record exists at that exact name.
#[derive(Debug, Clone)]
pub struct RecordSet {
    pub name: String,
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Pending,
    InSync,
}

/// Handle to an in-flight record change, used to poll propagation.
#[derive(Debug, Clone)]
pub struct ChangeHandle {
    pub id: String,
    pub status: ChangeStatus,
}

/// Seam over the DNS API, mirroring `ComputeProvider`: the flows and the
/// helpers below only ever talk to this trait.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    async fn list_zones(&self) -> Result<Vec<Zone>>;

    /// First A record at-or-after `host` in the zone, if any. Providers sort
    /// records by name, so an exact match comes back first when it exists.
    async fn first_record_at_or_after(&self, zone_id: &str, host: &str)
        -> Result<Option<RecordSet>>;

    async fn upsert_a_record(
        &self,
        zone_id: &str,
        host: &str,
        ip: Ipv4Addr,
        ttl: i64,
    ) -> Result<ChangeHandle>;

    async fn change_status(&self, change_id: &str) -> Result<ChangeStatus>;
}

/// Hosted zone names are fully qualified; make the host comparable.
pub fn canonicalize_host(host: &str) -> String {
    if host.ends_with('.') {
        host.to_string()
    } else {
        format!("{host}.")
    }
}

/// Picks the zone whose name is the longest suffix of `host` (the most
/// specific one, when both `example.com.` and `sub.example.com.` are
/// present). Strictly-greater comparison keeps the first-seen zone on a
/// length tie, which makes selection deterministic in provider order.
pub fn resolve_zone(host: &str, zones: &[Zone]) -> Result<Zone> {
    let host = canonicalize_host(host);

    let mut best: Option<&Zone> = None;
    for zone in zones {
        if host.ends_with(&zone.name)
            && best.is_none_or(|b| zone.name.len() > b.name.len())
        {
            best = Some(zone);
        }
    }

    best.cloned().ok_or(Error::NoMatchingZone { host })
}

/// TTL to use for the upsert: the existing record's TTL when one exists at
/// exactly `host`, otherwise `default_ttl` so that first-time creation works.
pub async fn lookup_existing_ttl(
    provider: &dyn DnsProvider,
    zone_id: &str,
    host: &str,
    default_ttl: i64,
) -> Result<i64> {
    match provider.first_record_at_or_after(zone_id, host).await? {
        // The lookup is a prefix scan; a different name means the record
        // does not exist and we were handed its successor.
        Some(record) if record.name == host => Ok(record.ttl.unwrap_or(default_ttl)),
        _ => Ok(default_ttl),
    }
}

/// Polls the change until the provider reports it in sync.
pub async fn wait_for_in_sync(
    provider: &dyn DnsProvider,
    change: &ChangeHandle,
    interval: Duration,
    max_attempts: Option<u32>,
) -> Result<()> {
    if change.status == ChangeStatus::InSync {
        return Ok(());
    }

    let spec = PollSpec::new("DNS update to propagate", interval, max_attempts);
    poll_until(
        &spec,
        || provider.change_status(&change.id),
        |status| *status == ChangeStatus::InSync,
    )
    .await?;

    info!("✅ DNS update propagated");
    Ok(())
}
