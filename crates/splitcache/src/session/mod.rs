// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sessions and the signed cookie that points back at them.

pub mod cookie;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::credential::TokenPair;

/// An authenticated user's server-side state.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    /// Opaque, unique per login. Cookies carrying an older id are stale.
    pub session_id: String,
    pub access: TokenPair,
    pub created_at: Instant,
}

impl Session {
    /// Create a session with a freshly minted session id.
    pub fn new(user_id: impl Into<String>, access: TokenPair) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: uuid::Uuid::new_v4().to_string(),
            access,
            created_at: Instant::now(),
        }
    }
}

/// User id → session, with an absolute TTL per entry.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), ttl }
    }

    /// Insert or overwrite the session for `session.user_id`.
    pub async fn put(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        if sessions.insert(session.user_id.clone(), session).is_some() {
            tracing::debug!("replaced existing session");
        }
    }

    /// Look up a live session. Expired entries read as absent.
    pub async fn get(&self, user_id: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(user_id).filter(|s| s.created_at.elapsed() <= self.ttl).cloned()
    }

    /// Remove expired sessions, returning how many were dropped.
    pub async fn evict_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.created_at.elapsed() <= self.ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
