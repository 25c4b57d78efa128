// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use splitcache::config::Config;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = splitcache::init_tracing(&config) {
        eprintln!("fatal: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = splitcache::run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}
