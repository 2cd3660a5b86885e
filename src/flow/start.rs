// src/flow/start.rs - start/spot-launch an instance and point DNS at it

use std::net::Ipv4Addr;
use tracing::info;

use super::exactly_one;
use crate::compute::{ComputeProvider, Image, Instance, SpotLaunchRequest, SpotRequestState};
use crate::config::{Config, StartMode};
use crate::dns::{canonicalize_host, lookup_existing_ttl, resolve_zone, wait_for_in_sync, DnsProvider};
use crate::error::{Error, Result};
use crate::poll::{poll_until, PollSpec};

#[derive(Debug)]
pub struct StartOutcome {
    pub instance_id: String,
    pub public_ip: Ipv4Addr,
    pub host: String,
    pub ttl: i64,
}

enum Target {
    Existing(Instance),
    SpotLaunch {
        image: Image,
        instance_type: String,
        bid_price: String,
    },
}

/// Runs the whole start sequence: acquire the target, swap the security
/// group's ingress over to the caller, start or launch, then upsert the A
/// record and wait for it to propagate.
pub async fn run(
    compute: &dyn ComputeProvider,
    dns: &dyn DnsProvider,
    config: &Config,
    mode: &StartMode,
    caller_ip: Ipv4Addr,
) -> Result<StartOutcome> {
    let host_arg = match mode {
        StartMode::Named { host, .. } | StartMode::Spot { host, .. } => host,
    };

    let (target, group_id) = match mode {
        StartMode::Named { instance_name, .. } => {
            info!("Getting instance");
            let instance = exactly_one(
                compute.instances_by_name_tag(instance_name).await?,
                "instance",
                instance_name,
            )?;

            info!("Getting security group");
            let group_id = exactly_one(
                instance.security_group_ids.clone(),
                "security group",
                &instance.id,
            )?;

            (Target::Existing(instance), group_id)
        }
        StartMode::Spot {
            ami_name_tag,
            instance_type,
            bid_price,
            security_group,
            ..
        } => {
            info!("Getting AMI");
            let image = exactly_one(
                compute.images_by_name_tag(ami_name_tag).await?,
                "image",
                ami_name_tag,
            )?;

            info!("Getting security group");
            let group = exactly_one(
                compute.security_groups_by_name(security_group).await?,
                "security group",
                security_group,
            )?;

            (
                Target::SpotLaunch {
                    image,
                    instance_type: instance_type.clone(),
                    bid_price: bid_price.clone(),
                },
                group.id,
            )
        }
    };

    let platform = match &target {
        Target::Existing(instance) => instance.platform,
        Target::SpotLaunch { image, .. } => image.platform,
    };
    info!("Detected platform: {platform}");

    let removed = compute.clear_ingress(&group_id).await?;
    if removed > 0 {
        info!("Removed {removed} old ingress rule(s) from security group");
    }

    let port = platform.ingress_port();
    info!("Authorizing connections from {caller_ip} on port {port}");
    compute
        .authorize_ingress(&group_id, port, &format!("{caller_ip}/32"))
        .await?;

    let host = canonicalize_host(host_arg);
    info!("Looking for hosted zone for {host}");
    let zone = resolve_zone(&host, &dns.list_zones().await?)?;
    let ttl = lookup_existing_ttl(dns, &zone.id, &host, config.dns.default_ttl).await?;

    let instance_id = match target {
        Target::Existing(instance) => {
            info!("Starting instance");
            compute.start_instance(&instance.id).await?;
            instance.id
        }
        Target::SpotLaunch {
            image,
            instance_type,
            bid_price,
        } => launch_spot(compute, config, &image, &instance_type, &bid_price, &group_id).await?,
    };

    let spec = PollSpec::new(
        "instance to finish starting",
        config.poll.instance_interval(),
        config.poll.max_attempts,
    );
    let instance = poll_until(
        &spec,
        || compute.instance_by_id(&instance_id),
        |i| i.state.is_running(),
    )
    .await?;

    let public_ip = instance.public_ip.ok_or(Error::NoPublicIp {
        instance_id: instance.id.clone(),
    })?;

    info!("Setting {host} to point to {public_ip} with TTL {ttl}");
    let change = dns.upsert_a_record(&zone.id, &host, public_ip, ttl).await?;
    wait_for_in_sync(dns, &change, config.poll.dns_interval(), config.poll.max_attempts).await?;

    Ok(StartOutcome {
        instance_id: instance.id,
        public_ip,
        host,
        ttl,
    })
}

/// Price-checks the bid, submits the spot request, and waits for it to be
/// fulfilled. Returns the launched instance's id.
async fn launch_spot(
    compute: &dyn ComputeProvider,
    config: &Config,
    image: &Image,
    instance_type: &str,
    bid_price: &str,
    group_id: &str,
) -> Result<String> {
    info!("Getting current spot prices");
    let prices = compute.spot_prices(instance_type, image.platform).await?;
    if prices.is_empty() {
        return Err(Error::NoPriceHistory {
            instance_type: instance_type.to_string(),
        });
    }

    let lowest = prices.iter().copied().fold(f64::INFINITY, f64::min);
    info!("Lowest current spot price: {lowest}");

    let bid: f64 = bid_price
        .parse()
        .map_err(|_| Error::Usage(format!("unparseable bid price '{bid_price}'")))?;
    if bid < lowest {
        return Err(Error::BidTooLow {
            bid: bid_price.to_string(),
            lowest: lowest.to_string(),
        });
    }

    info!("Requesting spot instance");
    let request_id = compute
        .request_spot_instance(&SpotLaunchRequest {
            image_id: image.id.clone(),
            instance_type: instance_type.to_string(),
            security_group_id: group_id.to_string(),
            bid_price: bid_price.to_string(),
        })
        .await?;

    let spec = PollSpec::new(
        "spot instance request to be fulfilled",
        config.poll.spot_interval(),
        config.poll.max_attempts,
    );
    let request = poll_until(
        &spec,
        || compute.spot_request(&request_id),
        |r| r.state != SpotRequestState::Open,
    )
    .await?;

    if request.state != SpotRequestState::Active {
        return Err(Error::RequestNotFulfilled {
            state: request.state.to_string(),
        });
    }

    info!("Getting instance");
    request
        .instance_id
        .ok_or_else(|| Error::Api("fulfilled spot request carries no instance id".to_string()))
}
