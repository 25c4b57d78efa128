// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote expense service: signed HTTP client and typed payloads.

pub mod client;
pub mod model;
