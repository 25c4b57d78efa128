// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pull-based freshness check driven by the cache file's mtime.

use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No cache file yet.
    Missing,
    /// Older than the TTL.
    Stale,
    Fresh,
}

impl Freshness {
    pub fn needs_refresh(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// Classify a last-modified time against `now`.
///
/// Stale means strictly older than `ttl`. A modification time in the future
/// (clock skew) counts as fresh.
pub fn classify(modified: Option<SystemTime>, now: SystemTime, ttl: Duration) -> Freshness {
    let Some(modified) = modified else {
        return Freshness::Missing;
    };
    match now.duration_since(modified) {
        Ok(age) if age > ttl => Freshness::Stale,
        _ => Freshness::Fresh,
    }
}

/// Stat `path` and classify it.
pub fn evaluate(path: &Path, now: SystemTime, ttl: Duration) -> Result<Freshness, ServiceError> {
    let modified = match std::fs::metadata(path) {
        Ok(meta) => Some(meta.modified()?),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };
    Ok(classify(modified, now, ttl))
}

#[cfg(test)]
#[path = "freshness_tests.rs"]
mod tests;
