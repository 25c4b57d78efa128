// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `splitcache` binary.

use std::time::Duration;

use splitcache_specs::SplitcacheProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

fn no_redirect_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build()?)
}

// -- Startup ------------------------------------------------------------------

#[tokio::test]
async fn http_health() -> anyhow::Result<()> {
    let proc = SplitcacheProcess::start()?;
    proc.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/v1/health", proc.base_url())).await?.json().await?;

    assert_eq!(resp["status"], "running");
    assert_eq!(resp["session_count"], 0);
    Ok(())
}

#[tokio::test]
async fn creates_data_directory() -> anyhow::Result<()> {
    let proc = SplitcacheProcess::start()?;
    proc.wait_healthy(TIMEOUT).await?;
    assert!(proc.data_path().is_dir());
    Ok(())
}

#[tokio::test]
async fn missing_config_exits_nonzero() -> anyhow::Result<()> {
    let mut proc = SplitcacheProcess::build().no_config().spawn()?;
    let status = proc.wait_exit(TIMEOUT).await?;
    assert!(!status.success());
    Ok(())
}

#[tokio::test]
async fn unparsable_config_exits_nonzero() -> anyhow::Result<()> {
    let mut proc = SplitcacheProcess::build().raw_config("{ not json").spawn()?;
    let status = proc.wait_exit(TIMEOUT).await?;
    assert!(!status.success());
    Ok(())
}

#[tokio::test]
async fn incomplete_config_exits_nonzero() -> anyhow::Result<()> {
    let mut proc =
        SplitcacheProcess::build().raw_config(r#"{ "ConsumerKey": "k", "DataPath": "/tmp" }"#).spawn()?;
    let status = proc.wait_exit(TIMEOUT).await?;
    assert!(!status.success());
    Ok(())
}

// -- HTTP surface -------------------------------------------------------------

#[tokio::test]
async fn index_with_unreachable_provider_is_bad_gateway() -> anyhow::Result<()> {
    let proc = SplitcacheProcess::start()?;
    proc.wait_healthy(TIMEOUT).await?;

    let resp = no_redirect_client()?.get(format!("{}/", proc.base_url())).send().await?;
    assert_eq!(resp.status().as_u16(), 502);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"]["code"], "UPSTREAM_AUTH");
    Ok(())
}

#[tokio::test]
async fn stored_json_requires_cookie() -> anyhow::Result<()> {
    let proc = SplitcacheProcess::start()?;
    proc.wait_healthy(TIMEOUT).await?;

    let resp = reqwest::get(format!("{}/getStoredJson", proc.base_url())).await?;
    assert_eq!(resp.status().as_u16(), 401);
    Ok(())
}

#[tokio::test]
async fn stored_json_file_serves_fresh_cache() -> anyhow::Result<()> {
    let proc = SplitcacheProcess::start()?;
    proc.wait_healthy(TIMEOUT).await?;
    std::fs::write(
        proc.data_path().join("99.csv"),
        "Group,Date,Description,Category,Cost,User,Share,\nFlat,2024-05-03,Rent,,900.0,Carol,450.0,\n",
    )?;

    let rows: Vec<serde_json::Value> =
        reqwest::get(format!("{}/getStoredJsonFile?file=99", proc.base_url())).await?.json().await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["User"], "Carol");
    assert_eq!(rows[0]["Share"], "450.0");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn sigterm_shuts_down_gracefully() -> anyhow::Result<()> {
    let mut proc = SplitcacheProcess::start()?;
    proc.wait_healthy(TIMEOUT).await?;

    let sent = std::process::Command::new("kill").args(["-TERM", &proc.pid().to_string()]).status()?;
    assert!(sent.success());

    let status = proc.wait_exit(TIMEOUT).await?;
    assert!(status.success());
    Ok(())
}
