// src/aws.rs - shared SDK configuration for both binaries

use aws_config::{BehaviorVersion, Region};

use crate::config::AwsSettings;

/// Builds the SDK config from the default credential chain, with optional
/// region/profile overrides from our own config.
pub async fn load_sdk_config(settings: &AwsSettings) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(profile) = &settings.profile {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}
