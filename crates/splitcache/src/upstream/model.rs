// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed views of the expense API responses.
//!
//! Only the fields the cache needs are decoded. Free-text fields may be
//! absent or `null` upstream, so they are optional with accessor fallbacks.

use serde::Deserialize;

/// Share recorded for a participant whose `owed_share` is missing.
pub const DEFAULT_SHARE: &str = "0.0";

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUserResponse {
    pub user: CurrentUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupsResponse {
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

impl Group {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpensesResponse {
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Expense {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub cost: Option<String>,
    #[serde(default)]
    pub users: Vec<ExpenseShare>,
}

impl Expense {
    pub fn date(&self) -> &str {
        self.date.as_deref().unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn category(&self) -> &str {
        self.category.as_ref().and_then(|c| c.name.as_deref()).unwrap_or_default()
    }

    pub fn cost(&self) -> &str {
        self.cost.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub name: Option<String>,
}

/// One participant's slice of an expense.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseShare {
    #[serde(default)]
    pub user: Option<Participant>,
    #[serde(default)]
    pub owed_share: Option<String>,
}

impl ExpenseShare {
    pub fn first_name(&self) -> &str {
        self.user.as_ref().and_then(|u| u.first_name.as_deref()).unwrap_or_default()
    }

    pub fn owed_share(&self) -> &str {
        self.owed_share.as_deref().unwrap_or(DEFAULT_SHARE)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub first_name: Option<String>,
}
