// src/flow/mod.rs - end-to-end orchestration

pub mod reimage;
pub mod start;

#[cfg(test)]
pub(crate) mod fakes;

use crate::error::{Error, Result};

/// Lookups against shared cloud resources must be unambiguous: zero or
/// several matches both abort the run.
pub fn exactly_one<T>(mut items: Vec<T>, kind: &'static str, name: &str) -> Result<T> {
    if items.len() == 1 {
        Ok(items.remove(0))
    } else {
        Err(Error::AmbiguousResource {
            kind,
            name: name.to_string(),
            count: items.len(),
        })
    }
}
