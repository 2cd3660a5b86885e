// src/lib.rs
pub mod aws;
pub mod compute;
pub mod config;
pub mod dns;
pub mod error;
pub mod flow;
pub mod logging;
pub mod poll;
pub mod public_ip;

pub use config::*;
pub use error::{Error, Result};
pub use logging::initialize_tracing;
