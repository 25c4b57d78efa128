// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three-legged OAuth 1.0a against the expense service.
//!
//! [`exchange::TokenExchange`] runs the request-token → browser redirect →
//! access-token handshake. [`oauth`] holds the HMAC-SHA1 request signing
//! shared by the exchange and the expense API client.

pub mod exchange;
pub mod oauth;

use std::fmt;

/// Client credential pair identifying this application to the provider.
#[derive(Clone)]
pub struct Consumer {
    pub key: String,
    pub secret: String,
}

impl Consumer {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { key: key.into(), secret: secret.into() }
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("key", &self.key).finish_non_exhaustive()
    }
}

/// A token and its signing secret (request token or access token).
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub secret: String,
}

impl TokenPair {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { token: token.into(), secret: secret.into() }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair").field("token", &self.token).finish_non_exhaustive()
    }
}
