// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth 1.0a (RFC 5849) HMAC-SHA1 request signing.

use std::collections::HashMap;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::Rng;
use ring::hmac;
use url::Url;

use crate::credential::{Consumer, TokenPair};

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const VERSION: &str = "1.0";

/// Protocol parameters that only appear on some requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct Extras<'a> {
    /// `oauth_callback`, sent when requesting a request token.
    pub callback: Option<&'a str>,
    /// `oauth_verifier`, sent when exchanging for an access token.
    pub verifier: Option<&'a str>,
}

/// Signs requests on behalf of a consumer, optionally with a token.
pub struct Signer<'a> {
    consumer: &'a Consumer,
    token: Option<&'a TokenPair>,
}

impl<'a> Signer<'a> {
    pub fn new(consumer: &'a Consumer, token: Option<&'a TokenPair>) -> Self {
        Self { consumer, token }
    }

    /// Build the `Authorization` header value for a request.
    pub fn authorization_header(&self, method: &str, url: &Url, extras: Extras<'_>) -> String {
        self.authorization_header_at(method, url, extras, &generate_nonce(), epoch_secs())
    }

    /// Same as [`Self::authorization_header`] with a fixed nonce and timestamp.
    pub fn authorization_header_at(
        &self,
        method: &str,
        url: &Url,
        extras: Extras<'_>,
        nonce: &str,
        timestamp: u64,
    ) -> String {
        let mut params = self.protocol_params(extras, nonce, timestamp);
        let base = signature_base_string(method, url, &params);
        let token_secret = self.token.map(|t| t.secret.as_str()).unwrap_or("");
        params.push(("oauth_signature".to_owned(), sign(&base, &self.consumer.secret, token_secret)));
        params.sort();

        let fields = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {fields}")
    }

    fn protocol_params(
        &self,
        extras: Extras<'_>,
        nonce: &str,
        timestamp: u64,
    ) -> Vec<(String, String)> {
        let mut params = vec![
            ("oauth_consumer_key".to_owned(), self.consumer.key.clone()),
            ("oauth_nonce".to_owned(), nonce.to_owned()),
            ("oauth_signature_method".to_owned(), SIGNATURE_METHOD.to_owned()),
            ("oauth_timestamp".to_owned(), timestamp.to_string()),
            ("oauth_version".to_owned(), VERSION.to_owned()),
        ];
        if let Some(token) = self.token {
            params.push(("oauth_token".to_owned(), token.token.clone()));
        }
        if let Some(callback) = extras.callback {
            params.push(("oauth_callback".to_owned(), callback.to_owned()));
        }
        if let Some(verifier) = extras.verifier {
            params.push(("oauth_verifier".to_owned(), verifier.to_owned()));
        }
        params
    }
}

/// Signature base string: method, base URI and the sorted, encoded
/// parameter set (query parameters plus protocol parameters).
pub fn signature_base_string(method: &str, url: &Url, oauth_params: &[(String, String)]) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .chain(oauth_params.iter().map(|(k, v)| (percent_encode(k), percent_encode(v))))
        .collect();
    params.sort();

    let normalized = params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");

    let mut base_uri = url.clone();
    base_uri.set_query(None);
    base_uri.set_fragment(None);

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_uri.as_str()),
        percent_encode(&normalized)
    )
}

/// HMAC-SHA1 over the base string, keyed by `consumer_secret&token_secret`.
pub fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key_material = format!("{}&{}", percent_encode(consumer_secret), percent_encode(token_secret));
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, key_material.as_bytes());
    STANDARD.encode(hmac::sign(&key, base.as_bytes()).as_ref())
}

/// Generate a random nonce (32 bytes, base64url).
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode an `application/x-www-form-urlencoded` token response.
pub fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.trim().as_bytes()).into_owned().collect()
}

/// RFC 3986 percent-encoding: everything except unreserved characters.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0xf) as usize]));
            }
        }
    }
    out
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
