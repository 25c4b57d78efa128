// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Once};

use axum::http::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::cache::ExpenseCache;
use crate::config::ServiceConfig;
use crate::credential::exchange::{CallbackParams, TokenExchange};
use crate::credential::Consumer;
use crate::error::ServiceError;
use crate::session::cookie::{cookie_from_headers, CookieCodec, COOKIE_NAME};
use crate::session::{Session, SessionStore};
use crate::upstream::client::ExpenseClient;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Outbound HTTP client shared by the token exchange and the expense API.
pub fn build_http_client(config: &ServiceConfig) -> anyhow::Result<reqwest::Client> {
    ensure_crypto();
    Ok(reqwest::Client::builder().timeout(config.request_timeout()).build()?)
}

/// Shared service state.
pub struct AppState {
    pub config: ServiceConfig,
    pub exchange: TokenExchange,
    pub sessions: SessionStore,
    pub cookies: CookieCodec,
    pub client: ExpenseClient,
    pub cache: ExpenseCache,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ServiceConfig, shutdown: CancellationToken) -> anyhow::Result<Self> {
        let http = build_http_client(&config)?;
        let consumer = Consumer::new(config.consumer_key.clone(), config.consumer_secret.clone());
        let client = ExpenseClient::new(config.api_base_url(), consumer, http.clone());
        let cache = ExpenseCache::new(config.data_path.clone(), config.cache_ttl(), client.clone());
        let cookies = CookieCodec::generate(config.cookie_max_age_secs)?;
        Ok(Self {
            exchange: TokenExchange::new(&config, http),
            sessions: SessionStore::new(config.session_ttl()),
            cookies,
            client,
            cache,
            shutdown,
            config,
        })
    }

    /// Finish the handshake, resolve the user's identity and store a fresh
    /// session for them, replacing any earlier one.
    pub async fn complete_login(&self, params: &CallbackParams) -> Result<Session, ServiceError> {
        let access = self.exchange.complete_authorization(params).await?;
        let user_id = self
            .client
            .current_user_id(&access)
            .await
            .map_err(|e| ServiceError::upstream_auth(format!("identity lookup failed: {}", e.message)))?;
        let session = Session::new(user_id, access);
        self.sessions.put(session.clone()).await;
        tracing::info!(user = %session.user_id, "login completed");
        Ok(session)
    }

    /// Resolve the request's session cookie to a live session.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Session, ServiceError> {
        let token = cookie_from_headers(headers, COOKIE_NAME)
            .ok_or_else(|| ServiceError::unauthorized("missing session cookie"))?;
        self.cookies.verify(&token, &self.sessions).await
    }
}

/// Spawn the background task that drops expired sessions and abandoned
/// authorizations.
pub fn spawn_sweeper(state: Arc<AppState>) {
    let interval = state.config.sweep_interval();

    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = state.shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            let sessions = state.sessions.evict_expired().await;
            let pending = state.exchange.evict_expired().await;
            if sessions > 0 || pending > 0 {
                tracing::debug!(sessions, pending, "evicted expired entries");
            }
        }
    });
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
