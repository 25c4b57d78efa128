// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `splitcache` binary as a subprocess with a generated
//! config file and exercises it over HTTP.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use std::time::Duration;

use splitcache::config::{ServiceConfig, DEFAULT_API_BASE_URL};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `splitcache` binary.
pub fn splitcache_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("splitcache")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A config whose provider endpoints point at a closed local port.
pub fn offline_config(data_path: &Path) -> anyhow::Result<ServiceConfig> {
    let dead = format!("http://127.0.0.1:{}", free_port()?);
    Ok(ServiceConfig {
        access_token_url: format!("{dead}/oauth/access_token"),
        authorize_url: format!("{dead}/oauth/authorize"),
        request_token_url: format!("{dead}/oauth/request_token"),
        consumer_key: "smoke-key".to_owned(),
        consumer_secret: "smoke-secret".to_owned(),
        callback_url: "http://127.0.0.1/expenses".to_owned(),
        data_path: data_path.to_owned(),
        shiny_port: "3838".to_owned(),
        api_base_url: DEFAULT_API_BASE_URL.to_owned(),
        viewer_url: None,
        cache_ttl_secs: 500,
        session_ttl_secs: 3600,
        pending_ttl_secs: 600,
        cookie_max_age_secs: 300,
        trusted_file_endpoint: true,
        request_timeout_secs: 2,
    })
}

/// A running `splitcache` process that is killed on drop.
pub struct SplitcacheProcess {
    child: Child,
    port: u16,
    dir: tempfile::TempDir,
}

/// Builder for the process's config file.
#[derive(Default)]
pub struct SplitcacheBuilder {
    raw_config: Option<String>,
    no_config: bool,
}

impl SplitcacheBuilder {
    /// Write `contents` verbatim as the config file.
    pub fn raw_config(mut self, contents: &str) -> Self {
        self.raw_config = Some(contents.to_owned());
        self
    }

    /// Point `--config` at a file that does not exist.
    pub fn no_config(mut self) -> Self {
        self.no_config = true;
        self
    }

    pub fn spawn(self) -> anyhow::Result<SplitcacheProcess> {
        ensure_crypto();
        let binary = splitcache_binary();
        anyhow::ensure!(binary.exists(), "splitcache binary not found at {}", binary.display());

        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("splitwiseconfig.json");
        if !self.no_config {
            let contents = match self.raw_config {
                Some(raw) => raw,
                None => serde_json::to_string_pretty(&offline_config(&dir.path().join("data"))?)?,
            };
            std::fs::write(&config_path, contents)?;
        }

        let port = free_port()?;
        let child = Command::new(&binary)
            .arg("--config")
            .arg(&config_path)
            .args(["--host", "127.0.0.1", "--port", &port.to_string()])
            .args(["--log-format", "text", "--log-level", "warn"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(SplitcacheProcess { child, port, dir })
    }
}

impl SplitcacheProcess {
    pub fn build() -> SplitcacheBuilder {
        SplitcacheBuilder::default()
    }

    /// Spawn with a valid offline config.
    pub fn start() -> anyhow::Result<Self> {
        Self::build().spawn()
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// The `DataPath` written into the default config.
    pub fn data_path(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Poll health until responsive.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        let client = reqwest::Client::new();
        let url = format!("{}/api/v1/health", self.base_url());
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("splitcache did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Wait for the process to exit within `timeout`.
    pub async fn wait_exit(
        &mut self,
        timeout: Duration,
    ) -> anyhow::Result<std::process::ExitStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("splitcache did not exit within {timeout:?}");
            }
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for SplitcacheProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
