// src/dns/route53.rs - DnsProvider over the Route 53 SDK

use async_trait::async_trait;
use aws_sdk_route53::error::{DisplayErrorContext, SdkError};
use aws_sdk_route53::types::{
    Change, ChangeAction, ResourceRecord, ResourceRecordSet as AwsRecordSet, RrType,
};
use std::net::Ipv4Addr;
use tracing::debug;

use super::{ChangeHandle, ChangeStatus, DnsProvider, RecordSet, Zone};
use crate::error::{Error, Result};

pub struct Route53Dns {
    client: aws_sdk_route53::Client,
}

impl Route53Dns {
    pub fn new(client: aws_sdk_route53::Client) -> Self {
        Self { client }
    }
}

fn api_err<E, R>(err: SdkError<E, R>) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    Error::Api(DisplayErrorContext(&err).to_string())
}

fn build_err(err: aws_sdk_route53::error::BuildError) -> Error {
    Error::Api(err.to_string())
}

fn map_status(status: &aws_sdk_route53::types::ChangeStatus) -> ChangeStatus {
    match status {
        aws_sdk_route53::types::ChangeStatus::Insync => ChangeStatus::InSync,
        _ => ChangeStatus::Pending,
    }
}

#[async_trait]
impl DnsProvider for Route53Dns {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        debug!("Listing hosted zones");
        let output = self
            .client
            .list_hosted_zones()
            .send()
            .await
            .map_err(api_err)?;

        Ok(output
            .hosted_zones()
            .iter()
            .map(|z| Zone::new(z.id(), z.name()))
            .collect())
    }

    async fn first_record_at_or_after(
        &self,
        zone_id: &str,
        host: &str,
    ) -> Result<Option<RecordSet>> {
        let output = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .start_record_name(host)
            .start_record_type(RrType::A)
            .max_items(1)
            .send()
            .await
            .map_err(api_err)?;

        Ok(output.resource_record_sets().first().map(|r| RecordSet {
            name: r.name().to_string(),
            ttl: r.ttl(),
        }))
    }

    async fn upsert_a_record(
        &self,
        zone_id: &str,
        host: &str,
        ip: Ipv4Addr,
        ttl: i64,
    ) -> Result<ChangeHandle> {
        let record_set = AwsRecordSet::builder()
            .name(host)
            .r#type(RrType::A)
            .ttl(ttl)
            .resource_records(
                ResourceRecord::builder()
                    .value(ip.to_string())
                    .build()
                    .map_err(build_err)?,
            )
            .build()
            .map_err(build_err)?;

        let change_batch = aws_sdk_route53::types::ChangeBatch::builder()
            .changes(
                Change::builder()
                    .action(ChangeAction::Upsert)
                    .resource_record_set(record_set)
                    .build()
                    .map_err(build_err)?,
            )
            .build()
            .map_err(build_err)?;

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(change_batch)
            .send()
            .await
            .map_err(api_err)?;

        let info = output
            .change_info()
            .ok_or_else(|| Error::Api("ChangeResourceRecordSets returned no change info".to_string()))?;

        Ok(ChangeHandle {
            id: info.id().to_string(),
            status: map_status(info.status()),
        })
    }

    async fn change_status(&self, change_id: &str) -> Result<ChangeStatus> {
        let output = self
            .client
            .get_change()
            .id(change_id)
            .send()
            .await
            .map_err(api_err)?;

        let info = output
            .change_info()
            .ok_or_else(|| Error::Api("GetChange returned no change info".to_string()))?;

        Ok(map_status(info.status()))
    }
}
