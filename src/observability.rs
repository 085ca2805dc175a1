// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracing subscriber setup.
//!
//! `RUST_LOG` controls filtering (default `info,tower_http=debug`);
//! `LOG_FORMAT` picks human-readable or JSON lines. Initialization is
//! idempotent so tests and the binary can both call it.

use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "info,tower_http=debug";

static INIT: OnceLock<()> = OnceLock::new();

pub fn init_tracing(format: LogFormat) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);
        let _ = match format {
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
                .try_init(),
            LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        };
    });
}
