// src/compute/mod.rs - compute provider interface

use async_trait::async_trait;
use std::fmt;
use std::net::Ipv4Addr;

use crate::error::Result;

mod aws;
pub use aws::AwsCompute;

/// Instance platform, detected from provider metadata. Drives both the
/// firewall port we open and the spot price product filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// Provider metadata only flags Windows; anything else is Linux.
    pub fn from_provider(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("windows") => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    /// Port to open towards the caller: SSH for Linux, RDP for Windows.
    pub fn ingress_port(&self) -> u16 {
        match self {
            Platform::Linux => 22,
            Platform::Windows => 3389,
        }
    }

    /// Product description used when querying spot price history.
    pub fn product_description(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux/UNIX",
            Platform::Windows => "Windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux => write!(f, "Linux"),
            Platform::Windows => write!(f, "Windows"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    Other(String),
}

impl InstanceState {
    pub fn from_provider(value: &str) -> Self {
        match value {
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            "stopping" => InstanceState::Stopping,
            "stopped" => InstanceState::Stopped,
            other => InstanceState::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        *self == InstanceState::Running
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceState::Pending => write!(f, "pending"),
            InstanceState::Running => write!(f, "running"),
            InstanceState::Stopping => write!(f, "stopping"),
            InstanceState::Stopped => write!(f, "stopped"),
            InstanceState::Other(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    Pending,
    Available,
    Other(String),
}

impl ImageState {
    pub fn from_provider(value: &str) -> Self {
        match value {
            "pending" => ImageState::Pending,
            "available" => ImageState::Available,
            other => ImageState::Other(other.to_string()),
        }
    }

    pub fn is_available(&self) -> bool {
        *self == ImageState::Available
    }
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageState::Pending => write!(f, "pending"),
            ImageState::Available => write!(f, "available"),
            ImageState::Other(s) => write!(f, "{s}"),
        }
    }
}

/// State of a spot instance request. `open` means keep polling; `active`
/// means fulfilled; any other terminal state means the request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpotRequestState {
    Open,
    Active,
    Other(String),
}

impl SpotRequestState {
    pub fn from_provider(value: &str) -> Self {
        match value {
            "open" => SpotRequestState::Open,
            "active" => SpotRequestState::Active,
            other => SpotRequestState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SpotRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpotRequestState::Open => write!(f, "open"),
            SpotRequestState::Active => write!(f, "active"),
            SpotRequestState::Other(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub id: String,
    pub state: InstanceState,
    pub platform: Platform,
    pub public_ip: Option<Ipv4Addr>,
    pub security_group_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Image {
    pub id: String,
    /// The AMI name (not the Name tag), carries the version suffix.
    pub name: Option<String>,
    pub state: ImageState,
    pub platform: Platform,
    /// Snapshot backing the image's first block device, if any.
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    pub ingress_rule_count: usize,
}

#[derive(Debug, Clone)]
pub struct SpotRequest {
    pub id: String,
    pub state: SpotRequestState,
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpotLaunchRequest {
    pub image_id: String,
    pub instance_type: String,
    pub security_group_id: String,
    pub bid_price: String,
}

/// Seam over the compute API so the orchestration flows can run against
/// in-memory fakes in tests.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    async fn instances_by_name_tag(&self, name: &str) -> Result<Vec<Instance>>;
    async fn instance_by_id(&self, id: &str) -> Result<Instance>;
    async fn start_instance(&self, id: &str) -> Result<()>;
    async fn terminate_instance(&self, id: &str) -> Result<()>;

    async fn images_by_name_tag(&self, name: &str) -> Result<Vec<Image>>;
    async fn image_by_id(&self, id: &str) -> Result<Image>;
    /// Instances launched from `image_id` that are running, stopping or stopped.
    async fn instances_by_image(&self, image_id: &str) -> Result<Vec<Instance>>;
    async fn create_image(&self, instance_id: &str, name: &str) -> Result<String>;
    async fn deregister_image(&self, image_id: &str) -> Result<()>;
    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()>;
    async fn set_name_tag(&self, resource_id: &str, name: &str) -> Result<()>;

    async fn security_groups_by_name(&self, name: &str) -> Result<Vec<SecurityGroup>>;
    async fn security_group_by_id(&self, id: &str) -> Result<SecurityGroup>;
    /// Revokes every existing ingress rule; returns how many were removed.
    async fn clear_ingress(&self, group_id: &str) -> Result<usize>;
    async fn authorize_ingress(&self, group_id: &str, port: u16, cidr: &str) -> Result<()>;

    async fn spot_prices(&self, instance_type: &str, platform: Platform) -> Result<Vec<f64>>;
    async fn request_spot_instance(&self, request: &SpotLaunchRequest) -> Result<String>;
    async fn spot_request(&self, request_id: &str) -> Result<SpotRequest>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_detection_defaults_to_linux() {
        assert_eq!(Platform::from_provider(None), Platform::Linux);
        assert_eq!(Platform::from_provider(Some("")), Platform::Linux);
        assert_eq!(Platform::from_provider(Some("windows")), Platform::Windows);
        assert_eq!(Platform::from_provider(Some("Windows")), Platform::Windows);
    }

    #[test]
    fn platform_selects_port_and_product() {
        assert_eq!(Platform::Linux.ingress_port(), 22);
        assert_eq!(Platform::Windows.ingress_port(), 3389);
        assert_eq!(Platform::Linux.product_description(), "Linux/UNIX");
        assert_eq!(Platform::Windows.product_description(), "Windows");
    }

    #[test]
    fn spot_request_state_parses_terminal_states() {
        assert_eq!(SpotRequestState::from_provider("open"), SpotRequestState::Open);
        assert_eq!(SpotRequestState::from_provider("active"), SpotRequestState::Active);
        assert_eq!(
            SpotRequestState::from_provider("cancelled"),
            SpotRequestState::Other("cancelled".into())
        );
    }
}
