// src/config.rs

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Tool configuration, loaded from an optional TOML file and overridden by
/// CLI arguments. Missing file means defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub aws: AwsSettings,
    pub poll: PollSettings,
    pub dns: DnsSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsSettings {
    pub region: Option<String>,
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    pub instance_interval_secs: u64,
    pub spot_interval_secs: u64,
    pub image_interval_secs: u64,
    pub dns_interval_secs: u64,
    /// Upper bound on polling attempts. `None` reproduces the historical
    /// behavior: poll forever.
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsSettings {
    /// TTL used when the record does not exist yet.
    pub default_ttl: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws: AwsSettings::default(),
            poll: PollSettings {
                instance_interval_secs: 5,
                spot_interval_secs: 5,
                image_interval_secs: 5,
                dns_interval_secs: 15,
                max_attempts: None,
            },
            dns: DnsSettings { default_ttl: 60 },
        }
    }
}

impl PollSettings {
    pub fn instance_interval(&self) -> Duration {
        Duration::from_secs(self.instance_interval_secs)
    }
    pub fn spot_interval(&self) -> Duration {
        Duration::from_secs(self.spot_interval_secs)
    }
    pub fn image_interval(&self) -> Duration {
        Duration::from_secs(self.image_interval_secs)
    }
    pub fn dns_interval(&self) -> Duration {
        Duration::from_secs(self.dns_interval_secs)
    }
}

/// Common CLI options shared by both binaries.
pub trait CommonArgs {
    fn config_path(&self) -> &PathBuf;
    fn region(&self) -> Option<&String>;
    fn profile(&self) -> Option<&String>;
}

#[derive(Parser, Debug)]
#[command(name = "cloudstart")]
#[command(about = "Start a named instance or spot-launch one from an AMI, then point DNS at it")]
pub struct StartArgs {
    #[arg(short, long, default_value = "cloudstart.toml")]
    pub config: PathBuf,
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub profile: Option<String>,
    #[arg(long)]
    pub generate_config: bool,
    #[arg(short, long)]
    pub verbose: bool,

    /// Name tag of the instance to start, or of the AMI to launch from
    pub name: Option<String>,
    /// Fully-qualified host name to point at the instance
    pub host: Option<String>,
    /// Instance type for the spot launch (spot form only)
    pub instance_type: Option<String>,
    /// Maximum spot price to bid (spot form only)
    pub bid_price: Option<String>,
    /// Security group name to open (spot form only)
    pub security_group: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "cloudstart-reimage")]
#[command(about = "Re-image an instance into a new versioned AMI and move its Name tag over")]
pub struct ReimageArgs {
    #[arg(short, long, default_value = "cloudstart.toml")]
    pub config: PathBuf,
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub profile: Option<String>,
    #[arg(long)]
    pub generate_config: bool,
    #[arg(short, long)]
    pub verbose: bool,

    /// Delete the old AMI and its EBS snapshot after the new AMI is created
    #[arg(long)]
    pub delete_old: bool,
    /// Terminate the instance the new AMI is created from after creation finishes
    #[arg(long)]
    pub terminate: bool,

    /// Name tag of the AMI to re-image
    pub ami_name_tag: Option<String>,
}

impl CommonArgs for StartArgs {
    fn config_path(&self) -> &PathBuf {
        &self.config
    }
    fn region(&self) -> Option<&String> {
        self.region.as_ref()
    }
    fn profile(&self) -> Option<&String> {
        self.profile.as_ref()
    }
}

impl CommonArgs for ReimageArgs {
    fn config_path(&self) -> &PathBuf {
        &self.config
    }
    fn region(&self) -> Option<&String> {
        self.region.as_ref()
    }
    fn profile(&self) -> Option<&String> {
        self.profile.as_ref()
    }
}

/// Which acquisition variant a `cloudstart` invocation asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum StartMode {
    /// `cloudstart <instance-name> <host-name>`
    Named { instance_name: String, host: String },
    /// `cloudstart <ami-name-tag> <host-name> <instance-type> <bid-price> <security-group-name>`
    Spot {
        ami_name_tag: String,
        host: String,
        instance_type: String,
        bid_price: String,
        security_group: String,
    },
}

impl StartArgs {
    /// The original tool switched on positional-argument count; reproduce
    /// that contract: two args start a named instance, five launch a spot one.
    pub fn mode(&self) -> Result<StartMode> {
        let usage = || {
            Error::Usage(
                "expected <instance-name> <host-name>, or \
                 <ami-name-tag> <host-name> <instance-type> <bid-price> <security-group-name>"
                    .to_string(),
            )
        };

        let name = self.name.clone().ok_or_else(usage)?;
        let host = self.host.clone().ok_or_else(usage)?;

        match (
            self.instance_type.clone(),
            self.bid_price.clone(),
            self.security_group.clone(),
        ) {
            (None, None, None) => Ok(StartMode::Named {
                instance_name: name,
                host,
            }),
            (Some(instance_type), Some(bid_price), Some(security_group)) => Ok(StartMode::Spot {
                ami_name_tag: name,
                host,
                instance_type,
                bid_price,
                security_group,
            }),
            _ => Err(usage()),
        }
    }
}

impl Config {
    pub fn load(args: &impl CommonArgs) -> Result<Self> {
        let mut config = if args.config_path().exists() {
            let content = fs::read_to_string(args.config_path())?;
            toml::from_str(&content)?
        } else {
            tracing::debug!("Config file {:?} not found, using defaults", args.config_path());
            Self::default()
        };

        // Override with CLI arguments
        if let Some(region) = args.region() {
            config.aws.region = Some(region.clone());
        }
        if let Some(profile) = args.profile() {
            config.aws.profile = Some(profile.clone());
        }

        Ok(config)
    }

    pub fn generate_default_file(path: &PathBuf) -> Result<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config)?;
        fs::write(path, content)?;
        tracing::info!("Generated default config: {:?}", path);
        Ok(())
    }
}
