// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache file row format.
//!
//! Comma-delimited with no quoting: every field has its commas removed
//! before writing, and each line ends with a trailing comma, matching the
//! header `Group,Date,Description,Category,Cost,User,Share,`.

use serde::{Deserialize, Serialize};

use crate::upstream::model::Expense;

pub const HEADER: &str = "Group,Date,Description,Category,Cost,User,Share,\n";

const FIELDS: usize = 7;

/// One (expense, participant) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseRow {
    pub group: String,
    pub date: String,
    pub description: String,
    pub category: String,
    pub cost: String,
    pub user: String,
    pub share: String,
}

impl ExpenseRow {
    /// Serialize as one line, trailing comma and newline included.
    pub fn to_line(&self) -> String {
        let fields = [
            &self.group,
            &self.date,
            &self.description,
            &self.category,
            &self.cost,
            &self.user,
            &self.share,
        ];
        let mut line = String::new();
        for field in fields {
            line.push_str(&sanitize(field));
            line.push(',');
        }
        line.push('\n');
        line
    }

    fn from_fields(fields: &[&str]) -> Self {
        Self {
            group: fields[0].to_owned(),
            date: fields[1].to_owned(),
            description: fields[2].to_owned(),
            category: fields[3].to_owned(),
            cost: fields[4].to_owned(),
            user: fields[5].to_owned(),
            share: fields[6].to_owned(),
        }
    }
}

/// Strip commas and fold line breaks so a field can't split a row.
pub fn sanitize(field: &str) -> String {
    field.chars().filter(|c| *c != ',').map(|c| if c == '\r' || c == '\n' { ' ' } else { c }).collect()
}

/// Expand an expense into one row per participant.
pub fn rows_for_expense(group: &str, expense: &Expense) -> Vec<ExpenseRow> {
    expense
        .users
        .iter()
        .map(|share| ExpenseRow {
            group: sanitize(group),
            date: sanitize(expense.date()),
            description: sanitize(expense.description()),
            category: sanitize(expense.category()),
            cost: sanitize(expense.cost()),
            user: sanitize(share.first_name()),
            share: sanitize(share.owed_share()),
        })
        .collect()
}

/// Parse a cache file's contents, skipping the header.
///
/// Lines with fewer than seven fields are logged and skipped.
pub fn parse(contents: &str) -> Vec<ExpenseRow> {
    let mut rows = Vec::new();
    for (n, line) in contents.lines().enumerate() {
        if n == 0 && line.starts_with("Group,") {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < FIELDS {
            tracing::warn!(line = n + 1, fields = fields.len(), "skipping malformed cache row");
            continue;
        }
        rows.push(ExpenseRow::from_fields(&fields));
    }
    rows
}

#[cfg(test)]
#[path = "rows_tests.rs"]
mod tests;
