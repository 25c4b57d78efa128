// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user expense cache: one CSV file per user under the data directory,
//! refreshed on read when missing or older than the TTL.
//!
//! Regenerations are coalesced per user. The first caller spawns the work
//! and registers a watch channel; later callers subscribe and receive the
//! same result.

pub mod freshness;
pub mod regenerate;
pub mod rows;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::cache::freshness::Freshness;
use crate::cache::rows::ExpenseRow;
use crate::credential::TokenPair;
use crate::error::{ErrorCode, ServiceError};
use crate::upstream::client::ExpenseClient;

type Outcome = Option<Result<usize, ServiceError>>;

/// Check that `user_id` is safe to use as a file stem.
pub fn validate_user_id(user_id: &str) -> Result<(), ServiceError> {
    let valid = !user_id.is_empty()
        && user_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::protocol(format!("invalid user id: {user_id:?}")))
    }
}

#[derive(Clone)]
pub struct ExpenseCache {
    data_dir: PathBuf,
    ttl: Duration,
    client: ExpenseClient,
    inflight: Arc<Mutex<HashMap<String, watch::Receiver<Outcome>>>>,
    regenerations: Arc<AtomicU64>,
}

impl ExpenseCache {
    pub fn new(data_dir: impl Into<PathBuf>, ttl: Duration, client: ExpenseClient) -> Self {
        Self {
            data_dir: data_dir.into(),
            ttl,
            client,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            regenerations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `<data_dir>/<user_id>.csv`.
    pub fn path_for(&self, user_id: &str) -> Result<PathBuf, ServiceError> {
        validate_user_id(user_id)?;
        Ok(self.data_dir.join(format!("{user_id}.csv")))
    }

    pub fn freshness(&self, user_id: &str) -> Result<Freshness, ServiceError> {
        freshness::evaluate(&self.path_for(user_id)?, SystemTime::now(), self.ttl)
    }

    /// Regenerations started since construction.
    pub fn regeneration_count(&self) -> u64 {
        self.regenerations.load(Ordering::Relaxed)
    }

    /// Return the user's rows, regenerating first when the file is missing
    /// or stale.
    ///
    /// Without a token a refresh can't run, so a non-fresh file is refused
    /// with `Unauthorized`. A refresh that fails upstream still serves
    /// whatever is on disk: the rows written before the failure, the
    /// previous file, or nothing.
    pub async fn read(
        &self,
        user_id: &str,
        token: Option<&TokenPair>,
    ) -> Result<Vec<ExpenseRow>, ServiceError> {
        let path = self.path_for(user_id)?;
        let state = freshness::evaluate(&path, SystemTime::now(), self.ttl)?;
        if state.needs_refresh() {
            let Some(token) = token else {
                return Err(ServiceError::unauthorized("cache needs refresh and no session is active"));
            };
            tracing::debug!(user = %user_id, ?state, "refreshing cache");
            match self.regenerate(user_id, token.clone()).await {
                Ok(_) => {}
                Err(e) if e.code == ErrorCode::UpstreamApi => {
                    tracing::warn!(user = %user_id, err = %e, "serving cache as left by failed refresh");
                }
                Err(e) => return Err(e),
            }
        }
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(rows::parse(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Regenerate the user's file, joining an in-flight run if there is one.
    pub async fn regenerate(&self, user_id: &str, token: TokenPair) -> Result<usize, ServiceError> {
        let path = self.path_for(user_id)?;
        let mut rx = {
            let mut inflight = self.inflight.lock();
            match inflight.get(user_id) {
                Some(rx) if rx.has_changed().is_ok() => rx.clone(),
                _ => {
                    let (tx, rx) = watch::channel(None);
                    inflight.insert(user_id.to_owned(), rx.clone());
                    self.spawn_regeneration(user_id.to_owned(), token, path, tx);
                    rx
                }
            }
        };

        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ServiceError::internal("regeneration task ended without a result"))?;
        match outcome.as_ref() {
            Some(result) => result.clone(),
            None => Err(ServiceError::internal("regeneration task ended without a result")),
        }
    }

    fn spawn_regeneration(
        &self,
        user_id: String,
        token: TokenPair,
        path: PathBuf,
        tx: watch::Sender<Outcome>,
    ) {
        self.regenerations.fetch_add(1, Ordering::Relaxed);
        let client = self.client.clone();
        let inflight = Arc::clone(&self.inflight);
        tokio::spawn(async move {
            let guard = InflightGuard { inflight, user_id, rx: tx.subscribe() };
            let result = regenerate::regenerate(&client, &token, &path).await;
            match result {
                Ok(rows) => tracing::info!(user = %guard.user_id, rows, "cache regenerated"),
                Err(ref e) => tracing::warn!(user = %guard.user_id, err = %e, "cache regeneration failed"),
            }
            drop(guard);
            let _ = tx.send(Some(result));
        });
    }
}

/// Removes a regeneration's in-flight entry when the task ends, including
/// by panic or abort. Leaves the entry alone if a newer run replaced it.
struct InflightGuard {
    inflight: Arc<Mutex<HashMap<String, watch::Receiver<Outcome>>>>,
    user_id: String,
    rx: watch::Receiver<Outcome>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        if inflight.get(&self.user_id).is_some_and(|rx| rx.same_channel(&self.rx)) {
            inflight.remove(&self.user_id);
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
