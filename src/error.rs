// src/error.rs - fatal error taxonomy

use thiserror::Error;

/// Everything in here is terminal: errors are propagated straight up to
/// `main`, logged once, and end the run. Nothing is caught or retried.
#[derive(Debug, Error)]
pub enum Error {
    /// A lookup that must match exactly one resource matched zero or several.
    #[error("{count} {kind}(s) matching '{name}' found, expected exactly one")]
    AmbiguousResource {
        kind: &'static str,
        name: String,
        count: usize,
    },

    #[error("no hosted zone found for {host}")]
    NoMatchingZone { host: String },

    #[error("no spot price history found for instance type {instance_type}")]
    NoPriceHistory { instance_type: String },

    #[error("bid price {bid} is below the lowest current spot price {lowest}")]
    BidTooLow { bid: String, lowest: String },

    #[error("spot instance request ended in state '{state}' without being fulfilled")]
    RequestNotFulfilled { state: String },

    #[error("instance {instance_id} has no public IP address")]
    NoPublicIp { instance_id: String },

    #[error("image {image_id} has no EBS snapshot to delete")]
    MissingSnapshot { image_id: String },

    #[error("gave up waiting for {what} after {attempts} attempts")]
    PollDeadline { what: String, attempts: u32 },

    #[error("{0}")]
    Usage(String),

    #[error("cloud API error: {0}")]
    Api(String),

    #[error("public IP lookup failed: {0}")]
    PublicIp(#[from] reqwest::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
