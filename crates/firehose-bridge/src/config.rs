// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process configuration.
//!
//! Broker host and record directory are each taken from, in order: the
//! command-line argument, an environment variable, a fixed default.

use std::path::{Path, PathBuf};

/// Environment variable naming the broker host.
pub const HOST_ENV: &str = "RABBITMQ_HOST";

/// Environment variable naming the record directory.
pub const DIR_ENV: &str = "RABBITMQ_DIR";

/// Broker host used when nothing else is given.
pub const DEFAULT_HOST: &str = "localhost";

/// Record directory name, relative to the working directory.
pub const DEFAULT_DIR_NAME: &str = "firehose";

/// Resolved bridge settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Broker host name or `amqp://` URI.
    pub host: String,

    /// Directory holding record files.
    pub directory: PathBuf,
}

impl BridgeConfig {
    /// Resolve from arguments, the process environment and the working
    /// directory.
    pub fn resolve(host: Option<String>, directory: Option<PathBuf>) -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::resolve_with(
            host,
            directory,
            |key| std::env::var(key).ok(),
            &cwd,
        ))
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// Empty values are treated as unset.
    pub fn resolve_with<F>(host: Option<String>, directory: Option<PathBuf>, env: F, cwd: &Path) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = first_set(host, || env(HOST_ENV)).unwrap_or_else(|| DEFAULT_HOST.to_string());

        let directory = directory
            .filter(|d| !d.as_os_str().is_empty())
            .or_else(|| first_set(None, || env(DIR_ENV)).map(PathBuf::from))
            .unwrap_or_else(|| cwd.join(DEFAULT_DIR_NAME));

        Self { host, directory }
    }
}

fn first_set(arg: Option<String>, fallback: impl FnOnce() -> Option<String>) -> Option<String> {
    arg.filter(|v| !v.is_empty())
        .or_else(|| fallback().filter(|v| !v.is_empty()))
}
