// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration of the resource service.

use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use thiserror::Error;

/// Tuning knobs of the [`ResourceService`](crate::ResourceService).
///
/// Every field has a default, so a configuration file only needs to mention the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceServiceConfig {
    /// Priority given to queued loads that don't ask for one. Lower is served first.
    pub default_priority: i32,
    /// How long the loader thread blocks on an empty queue before re-checking
    /// for shutdown, in milliseconds.
    pub idle_wait_ms: u64,
    /// How long an immediate load waits for an import already running on another
    /// thread, in milliseconds.
    pub coalesce_timeout_ms: u64,
    /// How long shutdown waits for the loader thread to exit, in milliseconds.
    pub shutdown_timeout_ms: u64,
    /// Name given to the loader thread.
    pub worker_thread_name: String,
}

impl Default for ResourceServiceConfig {
    fn default() -> Self {
        Self {
            default_priority: 50,
            idle_wait_ms: 10,
            coalesce_timeout_ms: 2000,
            shutdown_timeout_ms: 2000,
            worker_thread_name: "vesta-resource-loader".to_string(),
        }
    }
}

impl ResourceServiceConfig {
    /// Parses a configuration from RON.
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    /// Reads and parses a RON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    pub(crate) fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub(crate) fn coalesce_timeout(&self) -> Duration {
        Duration::from_millis(self.coalesce_timeout_ms)
    }

    pub(crate) fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// An error raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The content is not valid RON for the configuration.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
}
