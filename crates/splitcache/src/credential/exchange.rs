// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token exchange: request token → user authorization → access token.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use crate::config::ServiceConfig;
use crate::credential::oauth::{parse_form, Extras, Signer};
use crate::credential::{Consumer, TokenPair};
use crate::error::ServiceError;

/// In-flight authorization, waiting for the browser to come back.
struct PendingExchange {
    secret: String,
    created_at: Instant,
}

/// Query parameters the provider appends to the callback URL.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub oauth_token: Option<String>,
    #[serde(default)]
    pub oauth_verifier: Option<String>,
}

impl CallbackParams {
    /// Return `(request_token, verifier)`, rejecting missing or empty values.
    pub fn parts(&self) -> Result<(&str, &str), ServiceError> {
        let token = self.oauth_token.as_deref().filter(|t| !t.is_empty());
        let verifier = self.oauth_verifier.as_deref().filter(|v| !v.is_empty());
        match (token, verifier) {
            (Some(token), Some(verifier)) => Ok((token, verifier)),
            _ => Err(ServiceError::protocol("callback missing oauth_token or oauth_verifier")),
        }
    }
}

/// Runs the three-legged handshake.
///
/// Pending exchanges are keyed by request token, so concurrent logins from
/// different browsers never see each other's request secret.
pub struct TokenExchange {
    consumer: Consumer,
    request_token_url: String,
    authorize_url: String,
    access_token_url: String,
    callback_url: String,
    pending: RwLock<HashMap<String, PendingExchange>>,
    pending_ttl: Duration,
    http: reqwest::Client,
}

impl TokenExchange {
    pub fn new(config: &ServiceConfig, http: reqwest::Client) -> Self {
        Self {
            consumer: Consumer::new(&config.consumer_key, &config.consumer_secret),
            request_token_url: config.request_token_url.clone(),
            authorize_url: config.authorize_url.clone(),
            access_token_url: config.access_token_url.clone(),
            callback_url: config.callback_url.clone(),
            pending: RwLock::new(HashMap::new()),
            pending_ttl: config.pending_ttl(),
            http,
        }
    }

    /// Obtain a request token and return the URL the user's browser must visit.
    pub async fn begin_authorization(&self) -> Result<String, ServiceError> {
        let extras = Extras { callback: Some(&self.callback_url), verifier: None };
        let reply = self.post_signed(&self.request_token_url, None, extras).await?;

        if reply.get("oauth_callback_confirmed").map(String::as_str) != Some("true") {
            return Err(ServiceError::upstream_auth("request token reply not callback-confirmed"));
        }
        let request = token_pair(&reply)?;

        let mut auth_url = Url::parse(&self.authorize_url)
            .map_err(|e| ServiceError::upstream_auth(format!("invalid authorize url: {e}")))?;
        auth_url.query_pairs_mut().append_pair("oauth_token", &request.token);

        self.pending.write().await.insert(
            request.token.clone(),
            PendingExchange { secret: request.secret, created_at: Instant::now() },
        );
        tracing::debug!(request_token = %request.token, "authorization started");

        Ok(auth_url.into())
    }

    /// Exchange the callback's verifier for a long-lived access token.
    ///
    /// The pending exchange is consumed whether or not the provider accepts
    /// the verifier.
    pub async fn complete_authorization(
        &self,
        params: &CallbackParams,
    ) -> Result<TokenPair, ServiceError> {
        let (request_token, verifier) = params.parts()?;

        let pending = self
            .pending
            .write()
            .await
            .remove(request_token)
            .filter(|p| p.created_at.elapsed() <= self.pending_ttl)
            .ok_or_else(|| ServiceError::protocol("unknown or expired request token"))?;

        let request = TokenPair::new(request_token, pending.secret);
        let extras = Extras { callback: None, verifier: Some(verifier) };
        let reply = self.post_signed(&self.access_token_url, Some(&request), extras).await?;
        token_pair(&reply)
    }

    /// Drop pending exchanges older than the configured TTL.
    pub async fn evict_expired(&self) -> usize {
        let mut pending = self.pending.write().await;
        let before = pending.len();
        pending.retain(|_, p| p.created_at.elapsed() <= self.pending_ttl);
        before - pending.len()
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    async fn post_signed(
        &self,
        endpoint: &str,
        token: Option<&TokenPair>,
        extras: Extras<'_>,
    ) -> Result<HashMap<String, String>, ServiceError> {
        let url = Url::parse(endpoint)
            .map_err(|e| ServiceError::upstream_auth(format!("invalid url {endpoint}: {e}")))?;
        let header = Signer::new(&self.consumer, token).authorization_header("POST", &url, extras);

        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| ServiceError::upstream_auth(format!("{endpoint} unreachable: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ServiceError::upstream_auth(format!("{endpoint} read failed: {e}")))?;
        if !status.is_success() {
            return Err(ServiceError::upstream_auth(format!(
                "{endpoint} rejected the request ({status}): {body}"
            )));
        }
        Ok(parse_form(&body))
    }
}

fn token_pair(reply: &HashMap<String, String>) -> Result<TokenPair, ServiceError> {
    match (reply.get("oauth_token"), reply.get("oauth_token_secret")) {
        (Some(token), Some(secret)) if !token.is_empty() => {
            Ok(TokenPair::new(token.as_str(), secret.as_str()))
        }
        _ => Err(ServiceError::upstream_auth("token reply missing oauth_token or oauth_token_secret")),
    }
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
