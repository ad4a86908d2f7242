// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::Context as _;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, prelude::*};

use crate::config::LogConfig;

/// Keeps the file writer flushing. Logs are lost once dropped.
#[derive(Default)]
pub struct Guards {
    file: Option<WorkerGuard>,
}

/// Installs the global subscriber: a console layer plus, when `log_dir` is
/// configured, an hourly rotated file layer.
pub fn setup_logger(config: &LogConfig) -> anyhow::Result<Guards> {
    let mut guards = Guards::default();
    let mut layers: Vec<Box<dyn tracing_subscriber::layer::Layer<Registry> + Send + Sync>> =
        // console logger
        vec![Box::new(
            tracing_subscriber::fmt::Layer::new().with_filter(get_env_filter(config)?),
        )];

    // file logger
    if let Some(log_dir) = &config.log_dir {
        let file_appender = tracing_appender::rolling::hourly(log_dir, "wdpost.log");
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        guards.file = Some(guard);
        layers.push(Box::new(
            tracing_subscriber::fmt::Layer::new()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(get_env_filter(config)?),
        ));
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("installing global tracing subscriber")?;
    Ok(guards)
}

/// Returns an [`EnvFilter`] according to the `RUST_LOG` environment variable,
/// or [`default_env_filter`].
fn get_env_filter(config: &LogConfig) -> anyhow::Result<EnvFilter> {
    use std::env::{
        self,
        VarError::{NotPresent, NotUnicode},
    };
    match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(s) => Ok(EnvFilter::new(s)),
        Err(NotPresent) => default_env_filter(config),
        Err(NotUnicode(_)) => Ok(EnvFilter::default()),
    }
}

fn default_env_filter(config: &LogConfig) -> anyhow::Result<EnvFilter> {
    let mut directives = vec!["info".to_owned()];
    if !config.filters.is_empty() {
        directives.push(config.to_filter_string());
    }
    EnvFilter::try_new(directives.join(",")).context("invalid log filters")
}
