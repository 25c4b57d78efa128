// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the remote expense API.

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::credential::oauth::{Extras, Signer};
use crate::credential::{Consumer, TokenPair};
use crate::error::ServiceError;
use crate::upstream::model::{
    CurrentUserResponse, Expense, ExpensesResponse, Group, GroupsResponse,
};

/// Signed client for one expense API base URL. Cheap to clone.
#[derive(Clone)]
pub struct ExpenseClient {
    base_url: String,
    consumer: Arc<Consumer>,
    client: Client,
}

impl ExpenseClient {
    pub fn new(base_url: impl Into<String>, consumer: Consumer, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, consumer: Arc::new(consumer), client }
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ServiceError::upstream_api(format!("invalid api url: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Signed GET decoded into `T`. Any transport, status or decode failure
    /// is an upstream API error.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: &TokenPair,
    ) -> Result<T, ServiceError> {
        let url = self.url(path, query)?;
        let header =
            Signer::new(&self.consumer, Some(token)).authorization_header("GET", &url, Extras::default());

        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(|e| ServiceError::upstream_api(format!("{path}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ServiceError::upstream_api(format!("{path} failed ({status}): {text}")));
        }
        resp.json()
            .await
            .map_err(|e| ServiceError::upstream_api(format!("{path}: unexpected payload: {e}")))
    }

    /// Canonical id of the user the token belongs to, as a decimal string.
    pub async fn current_user_id(&self, token: &TokenPair) -> Result<String, ServiceError> {
        let resp: CurrentUserResponse = self.get_json("/get_current_user", &[], token).await?;
        Ok(resp.user.id.to_string())
    }

    pub async fn groups(&self, token: &TokenPair) -> Result<Vec<Group>, ServiceError> {
        let resp: GroupsResponse = self.get_json("/get_groups", &[], token).await?;
        Ok(resp.groups)
    }

    /// All expenses of a group (`limit=0` disables paging).
    pub async fn expenses(
        &self,
        token: &TokenPair,
        group_id: u64,
    ) -> Result<Vec<Expense>, ServiceError> {
        let group_id = group_id.to_string();
        let query = [("group_id", group_id.as_str()), ("limit", "0")];
        let resp: ExpensesResponse = self.get_json("/get_expenses", &query, token).await?;
        Ok(resp.expenses)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
