// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full rewrite of a user's cache file from the expense API.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::SystemTime;

use crate::cache::rows::{rows_for_expense, ExpenseRow, HEADER};
use crate::credential::TokenPair;
use crate::error::ServiceError;
use crate::upstream::client::ExpenseClient;
use crate::upstream::model::Group;

/// Fetch all groups and their expenses and replace the file at `path`.
///
/// Groups are fetched first; if that fails the existing file is untouched.
/// Expenses are fetched one group at a time with no retry. The new contents
/// are written to a temp file on the blocking pool and renamed over `path`.
/// When a group fetch fails, the partial file (header plus the groups already
/// fetched) still replaces `path`, but with its mtime reset to the epoch so
/// the next read regenerates it.
///
/// Returns the number of rows written.
pub async fn regenerate(
    client: &ExpenseClient,
    token: &TokenPair,
    path: &Path,
) -> Result<usize, ServiceError> {
    let groups = client.groups(token).await?;
    let (rows, failure) = fetch_rows(client, token, &groups).await;

    let written = rows.len();
    let stale = failure.is_some();
    let tmp_path = temp_path(path);
    let dest = path.to_owned();
    tokio::task::spawn_blocking(move || write_file(&rows, &tmp_path, &dest, stale))
        .await
        .map_err(|e| ServiceError::internal(format!("cache write task failed: {e}")))??;

    match failure {
        Some(e) => Err(e),
        None => Ok(written),
    }
}

/// Rows for every group up to the first failed expense fetch.
async fn fetch_rows(
    client: &ExpenseClient,
    token: &TokenPair,
    groups: &[Group],
) -> (Vec<ExpenseRow>, Option<ServiceError>) {
    let mut rows = Vec::new();
    for group in groups {
        match client.expenses(token, group.id).await {
            Ok(expenses) => {
                for expense in &expenses {
                    rows.extend(rows_for_expense(group.name(), expense));
                }
            }
            Err(e) => {
                tracing::warn!(group = group.id, err = %e, "expense fetch failed, cache left partial");
                return (rows, Some(e));
            }
        }
    }
    (rows, None)
}

/// Write header and rows to `tmp_path`, then rename over `path`. A `stale`
/// file gets an epoch mtime. Blocking; the temp file is removed on error.
fn write_file(
    rows: &[ExpenseRow],
    tmp_path: &Path,
    path: &Path,
    stale: bool,
) -> Result<(), ServiceError> {
    let result = write_and_rename(rows, tmp_path, path, stale);
    if result.is_err() {
        let _ = std::fs::remove_file(tmp_path);
    }
    result
}

fn write_and_rename(
    rows: &[ExpenseRow],
    tmp_path: &Path,
    path: &Path,
    stale: bool,
) -> Result<(), ServiceError> {
    let mut out = BufWriter::new(File::create(tmp_path)?);
    out.write_all(HEADER.as_bytes())?;
    for row in rows {
        out.write_all(row.to_line().as_bytes())?;
    }

    let file = out.into_inner().map_err(|e| e.into_error())?;
    if stale {
        file.set_modified(SystemTime::UNIX_EPOCH)?;
    }
    file.sync_all()?;
    drop(file);
    std::fs::rename(tmp_path, path)?;
    Ok(())
}

/// Unique sibling temp path so concurrent writers never share a file.
fn temp_path(path: &Path) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    path.with_file_name(tmp_name)
}

#[cfg(test)]
#[path = "regenerate_tests.rs"]
mod tests;
