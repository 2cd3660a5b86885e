// src/compute/aws.rs - ComputeProvider over the EC2 SDK

use async_trait::async_trait;
use aws_sdk_ec2::error::{DisplayErrorContext, SdkError};
use aws_sdk_ec2::primitives::DateTime;
use aws_sdk_ec2::types::{Filter, InstanceType, RequestSpotLaunchSpecification, Tag};
use std::time::SystemTime;
use tracing::debug;

use super::{
    ComputeProvider, Image, ImageState, Instance, InstanceState, Platform, SecurityGroup,
    SpotLaunchRequest, SpotRequest, SpotRequestState,
};
use crate::error::{Error, Result};

pub struct AwsCompute {
    client: aws_sdk_ec2::Client,
}

impl AwsCompute {
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
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

fn name_tag_filter(name: &str) -> Filter {
    Filter::builder().name("tag:Name").values(name).build()
}

fn map_instance(instance: &aws_sdk_ec2::types::Instance) -> Instance {
    Instance {
        id: instance.instance_id().unwrap_or_default().to_string(),
        state: instance
            .state()
            .and_then(|s| s.name())
            .map(|n| InstanceState::from_provider(n.as_str()))
            .unwrap_or_else(|| InstanceState::Other("unknown".to_string())),
        platform: Platform::from_provider(instance.platform().map(|p| p.as_str())),
        public_ip: instance.public_ip_address().and_then(|s| s.parse().ok()),
        security_group_ids: instance
            .security_groups()
            .iter()
            .filter_map(|g| g.group_id().map(str::to_string))
            .collect(),
    }
}

fn map_image(image: &aws_sdk_ec2::types::Image) -> Image {
    Image {
        id: image.image_id().unwrap_or_default().to_string(),
        name: image.name().map(str::to_string),
        state: image
            .state()
            .map(|s| ImageState::from_provider(s.as_str()))
            .unwrap_or_else(|| ImageState::Other("unknown".to_string())),
        platform: Platform::from_provider(image.platform().map(|p| p.as_str())),
        snapshot_id: image
            .block_device_mappings()
            .iter()
            .find_map(|bdm| bdm.ebs().and_then(|ebs| ebs.snapshot_id()))
            .map(str::to_string),
    }
}

fn map_security_group(group: &aws_sdk_ec2::types::SecurityGroup) -> SecurityGroup {
    SecurityGroup {
        id: group.group_id().unwrap_or_default().to_string(),
        name: group.group_name().unwrap_or_default().to_string(),
        ingress_rule_count: group.ip_permissions().len(),
    }
}

#[async_trait]
impl ComputeProvider for AwsCompute {
    async fn instances_by_name_tag(&self, name: &str) -> Result<Vec<Instance>> {
        debug!("Describing instances with Name tag {name}");
        let output = self
            .client
            .describe_instances()
            .filters(name_tag_filter(name))
            .send()
            .await
            .map_err(api_err)?;

        Ok(output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .map(map_instance)
            .collect())
    }

    async fn instance_by_id(&self, id: &str) -> Result<Instance> {
        let output = self
            .client
            .describe_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(api_err)?;

        output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .map(map_instance)
            .next()
            .ok_or_else(|| Error::Api(format!("instance {id} not found")))
    }

    async fn start_instance(&self, id: &str) -> Result<()> {
        self.client
            .start_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(api_err)?;
        Ok(())
    }

    async fn terminate_instance(&self, id: &str) -> Result<()> {
        self.client
            .terminate_instances()
            .instance_ids(id)
            .send()
            .await
            .map_err(api_err)?;
        Ok(())
    }

    async fn images_by_name_tag(&self, name: &str) -> Result<Vec<Image>> {
        debug!("Describing images with Name tag {name}");
        let output = self
            .client
            .describe_images()
            .filters(name_tag_filter(name))
            .send()
            .await
            .map_err(api_err)?;

        Ok(output.images().iter().map(map_image).collect())
    }

    async fn image_by_id(&self, id: &str) -> Result<Image> {
        let output = self
            .client
            .describe_images()
            .image_ids(id)
            .send()
            .await
            .map_err(api_err)?;

        output
            .images()
            .iter()
            .map(map_image)
            .next()
            .ok_or_else(|| Error::Api(format!("image {id} not found")))
    }

    async fn instances_by_image(&self, image_id: &str) -> Result<Vec<Instance>> {
        let output = self
            .client
            .describe_instances()
            .filters(Filter::builder().name("image-id").values(image_id).build())
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values("running")
                    .values("stopping")
                    .values("stopped")
                    .build(),
            )
            .send()
            .await
            .map_err(api_err)?;

        Ok(output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .map(map_instance)
            .collect())
    }

    async fn create_image(&self, instance_id: &str, name: &str) -> Result<String> {
        let output = self
            .client
            .create_image()
            .instance_id(instance_id)
            .name(name)
            .send()
            .await
            .map_err(api_err)?;

        output
            .image_id()
            .map(str::to_string)
            .ok_or_else(|| Error::Api("CreateImage returned no image id".to_string()))
    }

    async fn deregister_image(&self, image_id: &str) -> Result<()> {
        self.client
            .deregister_image()
            .image_id(image_id)
            .send()
            .await
            .map_err(api_err)?;
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()> {
        self.client
            .delete_snapshot()
            .snapshot_id(snapshot_id)
            .send()
            .await
            .map_err(api_err)?;
        Ok(())
    }

    async fn set_name_tag(&self, resource_id: &str, name: &str) -> Result<()> {
        self.client
            .create_tags()
            .resources(resource_id)
            .tags(Tag::builder().key("Name").value(name).build())
            .send()
            .await
            .map_err(api_err)?;
        Ok(())
    }

    async fn security_groups_by_name(&self, name: &str) -> Result<Vec<SecurityGroup>> {
        // Filter instead of GroupNames so that zero matches comes back as an
        // empty list rather than an API error. Names are only unique per VPC,
        // so several matches are possible.
        let output = self
            .client
            .describe_security_groups()
            .filters(Filter::builder().name("group-name").values(name).build())
            .send()
            .await
            .map_err(api_err)?;

        Ok(output
            .security_groups()
            .iter()
            .map(map_security_group)
            .collect())
    }

    async fn security_group_by_id(&self, id: &str) -> Result<SecurityGroup> {
        let output = self
            .client
            .describe_security_groups()
            .group_ids(id)
            .send()
            .await
            .map_err(api_err)?;

        output
            .security_groups()
            .iter()
            .map(map_security_group)
            .next()
            .ok_or_else(|| Error::Api(format!("security group {id} not found")))
    }

    async fn clear_ingress(&self, group_id: &str) -> Result<usize> {
        let output = self
            .client
            .describe_security_groups()
            .group_ids(group_id)
            .send()
            .await
            .map_err(api_err)?;

        let permissions = output
            .security_groups()
            .first()
            .map(|g| g.ip_permissions().to_vec())
            .unwrap_or_default();

        if permissions.is_empty() {
            return Ok(0);
        }

        let count = permissions.len();
        self.client
            .revoke_security_group_ingress()
            .group_id(group_id)
            .set_ip_permissions(Some(permissions))
            .send()
            .await
            .map_err(api_err)?;

        Ok(count)
    }

    async fn authorize_ingress(&self, group_id: &str, port: u16, cidr: &str) -> Result<()> {
        self.client
            .authorize_security_group_ingress()
            .group_id(group_id)
            .ip_protocol("tcp")
            .from_port(i32::from(port))
            .to_port(i32::from(port))
            .cidr_ip(cidr)
            .send()
            .await
            .map_err(api_err)?;
        Ok(())
    }

    async fn spot_prices(&self, instance_type: &str, platform: Platform) -> Result<Vec<f64>> {
        let output = self
            .client
            .describe_spot_price_history()
            .instance_types(InstanceType::from(instance_type))
            .product_descriptions(platform.product_description())
            .start_time(DateTime::from(SystemTime::now()))
            .send()
            .await
            .map_err(api_err)?;

        Ok(output
            .spot_price_history()
            .iter()
            .filter_map(|p| p.spot_price())
            .filter_map(|p| p.parse::<f64>().ok())
            .collect())
    }

    async fn request_spot_instance(&self, request: &SpotLaunchRequest) -> Result<String> {
        let launch_spec = RequestSpotLaunchSpecification::builder()
            .image_id(&request.image_id)
            .instance_type(InstanceType::from(request.instance_type.as_str()))
            .security_group_ids(&request.security_group_id)
            .build();

        let output = self
            .client
            .request_spot_instances()
            .spot_price(&request.bid_price)
            .launch_specification(launch_spec)
            .send()
            .await
            .map_err(api_err)?;

        output
            .spot_instance_requests()
            .first()
            .and_then(|r| r.spot_instance_request_id())
            .map(str::to_string)
            .ok_or_else(|| Error::Api("RequestSpotInstances returned no request id".to_string()))
    }

    async fn spot_request(&self, request_id: &str) -> Result<SpotRequest> {
        let output = self
            .client
            .describe_spot_instance_requests()
            .spot_instance_request_ids(request_id)
            .send()
            .await
            .map_err(api_err)?;

        let request = output
            .spot_instance_requests()
            .first()
            .ok_or_else(|| Error::Api(format!("spot request {request_id} not found")))?;

        Ok(SpotRequest {
            id: request
                .spot_instance_request_id()
                .unwrap_or(request_id)
                .to_string(),
            state: request
                .state()
                .map(|s| SpotRequestState::from_provider(s.as_str()))
                .unwrap_or_else(|| SpotRequestState::Other("unknown".to_string())),
            instance_id: request.instance_id().map(str::to_string),
        })
    }
}
