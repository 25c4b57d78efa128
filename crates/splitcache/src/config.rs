// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Default base URL of the remote expense API.
pub const DEFAULT_API_BASE_URL: &str = "https://secure.splitwise.com/api/v3.0";

/// Serves a user's expense data from a per-user cache refreshed on a TTL.
#[derive(Debug, Clone, Parser)]
#[command(name = "splitcache", version, about)]
pub struct Config {
    /// Path to the service configuration JSON file.
    #[arg(long, default_value = "splitwiseconfig.json", env = "SPLITCACHE_CONFIG")]
    pub config: PathBuf,

    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "SPLITCACHE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9093, env = "SPLITCACHE_PORT")]
    pub port: u16,

    /// Log filter directive (e.g. `info`, `splitcache=debug`).
    #[arg(long, default_value = "info", env = "SPLITCACHE_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: `text` or `json`.
    #[arg(long, default_value = "text", env = "SPLITCACHE_LOG_FORMAT")]
    pub log_format: String,

    /// Append logs to this file instead of stderr.
    #[arg(long = "log-file", env = "SPLITCACHE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Service configuration loaded from the JSON file named by `--config`.
///
/// Key names follow the existing deployment files (`AccessTokenURL`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceConfig {
    #[serde(rename = "AccessTokenURL")]
    pub access_token_url: String,
    #[serde(rename = "AuthorizeURL")]
    pub authorize_url: String,
    #[serde(rename = "RequestTokenURL")]
    pub request_token_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    #[serde(rename = "CallbackURL")]
    pub callback_url: String,
    /// Directory holding one `<user>.csv` per user.
    pub data_path: PathBuf,
    /// Port of the downstream viewer that users land on after login.
    #[serde(default)]
    pub shiny_port: String,
    #[serde(rename = "ApiBaseURL", default = "default_api_base_url")]
    pub api_base_url: String,
    /// Overrides the `http://localhost:<ShinyPort>` viewer location.
    #[serde(rename = "ViewerURL", default, skip_serializing_if = "Option::is_none")]
    pub viewer_url: Option<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
    #[serde(default = "default_cookie_max_age_secs")]
    pub cookie_max_age_secs: u64,
    /// Serve `/getStoredJsonFile`, which trusts a caller-supplied user id.
    #[serde(default = "default_true")]
    pub trusted_file_endpoint: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_owned()
}

fn default_cache_ttl_secs() -> u64 {
    500
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_pending_ttl_secs() -> u64 {
    600
}

fn default_cookie_max_age_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

pub fn default_true() -> bool {
    true
}

impl ServiceConfig {
    /// Read and validate the configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("error reading config file {}: {e}", path.display())
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("error parsing config file {}: {e}", path.display())
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("AccessTokenURL", &self.access_token_url),
            ("AuthorizeURL", &self.authorize_url),
            ("RequestTokenURL", &self.request_token_url),
            ("ConsumerKey", &self.consumer_key),
            ("ConsumerSecret", &self.consumer_secret),
            ("CallbackURL", &self.callback_url),
            ("ApiBaseURL", &self.api_base_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("{name} must not be empty");
            }
        }
        if self.data_path.as_os_str().is_empty() {
            anyhow::bail!("DataPath must not be empty");
        }
        if self.viewer_url.is_none() && self.shiny_port.trim().is_empty() {
            anyhow::bail!("either ShinyPort or ViewerURL must be set");
        }
        Ok(())
    }

    /// Where the browser is sent after a completed login.
    pub fn viewer_url(&self) -> String {
        match self.viewer_url {
            Some(ref url) => url.trim_end_matches('/').to_owned(),
            None => format!("http://localhost:{}", self.shiny_port),
        }
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// How often expired sessions and pending exchanges are swept.
    pub fn sweep_interval(&self) -> Duration {
        self.session_ttl().min(self.pending_ttl()).clamp(Duration::from_secs(1), Duration::from_secs(60))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
