// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for login and cached expense reads.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::credential::exchange::CallbackParams;
use crate::error::{ErrorCode, ServiceError};
use crate::state::AppState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub file: Option<String>,
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_owned())]).into_response()
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), session_count: s.sessions.len().await })
}

/// `GET /` — start a login and send the browser to the provider.
pub async fn index(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    match s.exchange.begin_authorization().await {
        Ok(url) => found(&url),
        Err(e) => {
            tracing::warn!(err = %e, "could not start authorization");
            e.into_response()
        }
    }
}

/// `GET /expenses` — provider callback. Completes the login, sets the
/// session cookie and forwards to the viewer.
pub async fn callback(
    State(s): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let session = match s.complete_login(&params).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(err = %e, "login failed");
            return e.into_response();
        }
    };

    let token = s.cookies.issue(&session.user_id, &session.session_id);
    let location = format!("{}?file={}", s.config.viewer_url(), session.user_id);
    let mut resp = found(&location);
    match s.cookies.set_cookie(&token).parse() {
        Ok(value) => {
            resp.headers_mut().insert(SET_COOKIE, value);
            resp
        }
        Err(_) => ServiceError::internal("unencodable session cookie").into_response(),
    }
}

/// `GET /getStoredJson` — the cookie holder's cached rows.
pub async fn stored_json(State(s): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    let session = match s.authenticate(&headers).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };
    match s.cache.read(&session.user_id, Some(&session.access)).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

/// `GET /getStoredJsonFile?file=<user>` — rows for a caller-named user, no
/// cookie required.
///
/// A fresh file is served as is. Refreshing needs that user's live session.
pub async fn stored_json_file(
    State(s): State<Arc<AppState>>,
    Query(q): Query<FileQuery>,
) -> impl IntoResponse {
    if !s.config.trusted_file_endpoint {
        return ErrorCode::NotFound.to_http_response("not found").into_response();
    }
    let Some(user_id) = q.file.filter(|f| !f.is_empty()) else {
        return ErrorCode::BadRequest.to_http_response("missing file parameter").into_response();
    };

    let session = s.sessions.get(&user_id).await;
    let token = session.as_ref().map(|session| &session.access);
    match s.cache.read(&user_id, token).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => e.into_response(),
    }
}
