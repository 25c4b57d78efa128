// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tamper-evident session cookie.
//!
//! Value format: `base64url(json) "." base64url(hmac_sha256("clientMap|" + payload))`.
//! The payload is signed, not encrypted.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::hmac;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::session::{Session, SessionStore};

/// Cookie name shared with the downstream viewer.
pub const COOKIE_NAME: &str = "clientMap";

/// What the client carries: who it is and which login it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieValue {
    #[serde(rename = "username")]
    pub user_id: String,
    #[serde(rename = "sessionid")]
    pub session_id: String,
}

pub struct CookieCodec {
    key: hmac::Key,
    max_age_secs: u64,
}

impl CookieCodec {
    /// Codec with a random per-process signing key.
    pub fn generate(max_age_secs: u64) -> Result<Self, ServiceError> {
        let rng = ring::rand::SystemRandom::new();
        let key = hmac::Key::generate(hmac::HMAC_SHA256, &rng)
            .map_err(|_| ServiceError::internal("failed to generate cookie key"))?;
        Ok(Self { key, max_age_secs })
    }

    /// Codec with a caller-supplied signing key.
    pub fn with_key(secret: &[u8], max_age_secs: u64) -> Self {
        Self { key: hmac::Key::new(hmac::HMAC_SHA256, secret), max_age_secs }
    }

    /// Encode and sign. Deterministic for a given key and value.
    pub fn issue(&self, user_id: &str, session_id: &str) -> String {
        let value = CookieValue { user_id: user_id.to_owned(), session_id: session_id.to_owned() };
        // Serializing two strings cannot fail.
        let json = serde_json::to_vec(&value).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let tag = hmac::sign(&self.key, &signing_input(&payload));
        format!("{payload}.{}", URL_SAFE_NO_PAD.encode(tag.as_ref()))
    }

    /// Check the signature and decode. `None` on any tampering or garbage.
    pub fn decode(&self, token: &str) -> Option<CookieValue> {
        let (payload, mac) = token.split_once('.')?;
        let mac = URL_SAFE_NO_PAD.decode(mac).ok()?;
        hmac::verify(&self.key, &signing_input(payload), &mac).ok()?;
        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&json).ok()
    }

    /// Resolve a cookie to its live session.
    ///
    /// Fails closed: bad signature, unknown user, or a session id that no
    /// longer matches the store (the user logged in again) are all rejected.
    pub async fn verify(&self, token: &str, store: &SessionStore) -> Result<Session, ServiceError> {
        let value =
            self.decode(token).ok_or_else(|| ServiceError::unauthorized("invalid session cookie"))?;
        let session = store
            .get(&value.user_id)
            .await
            .ok_or_else(|| ServiceError::unauthorized("no active session"))?;
        if !constant_time_eq(&session.session_id, &value.session_id) {
            tracing::debug!(user = %value.user_id, "stale session cookie");
            return Err(ServiceError::unauthorized("stale session cookie"));
        }
        Ok(session)
    }

    /// `Set-Cookie` header value for an issued token.
    pub fn set_cookie(&self, token: &str) -> String {
        format!("{COOKIE_NAME}={token}; Path=/; Max-Age={}; HttpOnly", self.max_age_secs)
    }
}

fn signing_input(payload: &str) -> Vec<u8> {
    format!("{COOKIE_NAME}|{payload}").into_bytes()
}

/// Extract a named cookie from the request's `Cookie` headers.
pub fn cookie_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_owned())
}

/// Constant-time string comparison to prevent timing side-channel attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

#[cfg(test)]
#[path = "cookie_tests.rs"]
mod tests;
