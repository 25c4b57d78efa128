// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake expense provider for tests: OAuth 1.0a endpoints plus the
//! current-user, groups and expenses API, served on an ephemeral port.
//!
//! Shared by unit tests and `tests/http.rs`, so it only depends on
//! third-party crates.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

/// Verifier the fake provider accepts on the access-token step.
pub const GOOD_VERIFIER: &str = "good-verifier";
/// User id returned by `get_current_user`.
pub const USER_ID: u64 = 4242;

/// Request counters, one per endpoint.
#[derive(Debug, Default)]
pub struct Hits {
    pub request_token: AtomicUsize,
    pub access_token: AtomicUsize,
    pub current_user: AtomicUsize,
    pub groups: AtomicUsize,
    pub expenses: AtomicUsize,
}

impl Hits {
    pub fn groups(&self) -> usize {
        self.groups.load(Ordering::SeqCst)
    }

    pub fn expenses(&self) -> usize {
        self.expenses.load(Ordering::SeqCst)
    }
}

/// Knobs tests flip to provoke failures.
#[derive(Debug, Default, Clone)]
pub struct Behavior {
    /// Return 500 from `get_expenses` for this group id.
    pub fail_group: Option<u64>,
    /// Return 500 from `get_groups`.
    pub fail_groups: bool,
    /// Return 401 from the request-token endpoint.
    pub reject_request_token: bool,
    /// Delay `get_groups` so concurrent readers overlap.
    pub groups_delay: Option<Duration>,
}

pub struct FakeState {
    pub hits: Hits,
    pub behavior: parking_lot::Mutex<Behavior>,
    issued: AtomicUsize,
}

/// A running fake provider.
pub struct FakeProvider {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeProvider {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(FakeState {
            hits: Hits::default(),
            behavior: parking_lot::Mutex::new(Behavior::default()),
            issued: AtomicUsize::new(0),
        });
        let router = Router::new()
            .route("/oauth/request_token", post(request_token))
            .route("/oauth/access_token", post(access_token))
            .route("/api/get_current_user", get(current_user))
            .route("/api/get_groups", get(groups))
            .route("/api/get_expenses", get(expenses))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(Self { base_url: format!("http://{addr}"), state })
    }

    pub fn hits(&self) -> &Hits {
        &self.state.hits
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.state.behavior.lock() = behavior;
    }

    /// Service configuration JSON pointing every endpoint at this provider.
    pub fn config_json(&self, data_dir: &std::path::Path) -> serde_json::Value {
        json!({
            "AccessTokenURL": format!("{}/oauth/access_token", self.base_url),
            "AuthorizeURL": format!("{}/oauth/authorize", self.base_url),
            "RequestTokenURL": format!("{}/oauth/request_token", self.base_url),
            "ConsumerKey": "test-consumer",
            "ConsumerSecret": "test-consumer-secret",
            "CallbackURL": "http://localhost:9093/expenses",
            "DataPath": data_dir,
            "ShinyPort": "3838",
            "ApiBaseURL": format!("{}/api", self.base_url),
            "RequestTimeoutSecs": 5
        })
    }
}

fn has_param(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|h| h.starts_with("OAuth ") && h.contains(&format!("{name}=\"")))
}

async fn request_token(State(s): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    s.hits.request_token.fetch_add(1, Ordering::SeqCst);
    if s.behavior.lock().reject_request_token || !has_param(&headers, "oauth_callback") {
        return (StatusCode::UNAUTHORIZED, "invalid consumer").into_response();
    }
    let n = s.issued.fetch_add(1, Ordering::SeqCst) + 1;
    format!("oauth_token=req-{n}&oauth_token_secret=req-secret-{n}&oauth_callback_confirmed=true")
        .into_response()
}

async fn access_token(State(s): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    s.hits.access_token.fetch_add(1, Ordering::SeqCst);
    let header = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or_default();
    if !header.contains(&format!("oauth_verifier=\"{GOOD_VERIFIER}\"")) {
        return (StatusCode::UNAUTHORIZED, "invalid verifier").into_response();
    }
    "oauth_token=access-token&oauth_token_secret=access-secret".into_response()
}

async fn current_user(State(s): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    s.hits.current_user.fetch_add(1, Ordering::SeqCst);
    if !has_param(&headers, "oauth_token") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "user": { "id": USER_ID, "first_name": "Alice" } })).into_response()
}

async fn groups(State(s): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    s.hits.groups.fetch_add(1, Ordering::SeqCst);
    let behavior = s.behavior.lock().clone();
    if let Some(delay) = behavior.groups_delay {
        tokio::time::sleep(delay).await;
    }
    if behavior.fail_groups || !has_param(&headers, "oauth_token") {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({
        "groups": [
            { "id": 1, "name": "Trip, 2024" },
            { "id": 2, "name": "Flat" }
        ]
    }))
    .into_response()
}

async fn expenses(
    State(s): State<Arc<FakeState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    s.hits.expenses.fetch_add(1, Ordering::SeqCst);
    let group_id: u64 = q.get("group_id").and_then(|g| g.parse().ok()).unwrap_or_default();
    if q.get("limit").map(String::as_str) != Some("0") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if s.behavior.lock().fail_group == Some(group_id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let body = match group_id {
        1 => json!({
            "expenses": [{
                "date": "2024-05-01T18:00:00Z",
                "description": "Dinner, drinks",
                "category": { "name": "Dining out" },
                "cost": "1,200.00",
                "users": [
                    { "user": { "first_name": "Alice" }, "owed_share": "600.00" },
                    { "user": { "first_name": "Bob" }, "owed_share": "600.00" }
                ]
            }]
        }),
        2 => json!({
            "expenses": [{
                "date": "2024-05-03T09:00:00Z",
                "description": "Rent",
                "category": null,
                "cost": "900.0",
                "users": [
                    { "user": { "first_name": "Carol" } }
                ]
            }]
        }),
        _ => json!({ "expenses": [] }),
    };
    Json(body).into_response()
}
