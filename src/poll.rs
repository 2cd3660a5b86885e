// src/poll.rs - wait for eventually-consistent cloud state

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

use crate::error::{Error, Result};

/// One wait-operation: what we are waiting for, how often to look, and
/// optionally how long to keep trying. Built per call site, discarded after.
#[derive(Debug, Clone)]
pub struct PollSpec {
    pub what: String,
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl PollSpec {
    pub fn new(what: impl Into<String>, interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            what: what.into(),
            interval,
            max_attempts,
        }
    }
}

/// Repeatedly awaits `fetch` until `is_done` accepts the fetched status, then
/// returns that status. Sleeps `spec.interval` between attempts. Fetch errors
/// propagate immediately; `is_done` only ever sees the status the immediately
/// preceding fetch returned.
///
/// With `max_attempts: None` this polls forever, like the tool always has.
/// Setting a bound turns exhaustion into a fatal [`Error::PollDeadline`].
pub async fn poll_until<T, F, Fut, P>(spec: &PollSpec, mut fetch: F, mut is_done: P) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(&T) -> bool,
{
    let mut attempts: u32 = 0;
    loop {
        let status = fetch().await?;
        attempts += 1;

        if is_done(&status) {
            return Ok(status);
        }

        if let Some(max) = spec.max_attempts {
            if attempts >= max {
                return Err(Error::PollDeadline {
                    what: spec.what.clone(),
                    attempts,
                });
            }
        }

        info!("⏳ Waiting for {}", spec.what);
        sleep(spec.interval).await;
    }
}
