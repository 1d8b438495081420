// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection rules configuration.

use crate::connection::DependencyKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default fan-out limit per task
pub const DEFAULT_MAX_CONNECTIONS_PER_TASK: usize = 10;

/// Default time an error message stays visible
pub const DEFAULT_ERROR_DISPLAY_SECS: u64 = 5;

/// Options recognized by the connection store and controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Allow a task to depend on itself
    pub allow_self_connection: bool,
    /// Skip cycle detection
    pub allow_circular_dependencies: bool,
    /// Maximum outgoing connections per task
    pub max_connections_per_task: usize,
    /// Seconds before a surfaced error clears itself
    pub error_display_secs: u64,
    /// Kind used for connections drawn interactively
    pub default_kind: DependencyKind,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            allow_self_connection: false,
            allow_circular_dependencies: false,
            max_connections_per_task: DEFAULT_MAX_CONNECTIONS_PER_TASK,
            error_display_secs: DEFAULT_ERROR_DISPLAY_SECS,
            default_kind: DependencyKind::FinishToStart,
        }
    }
}

impl ConnectionConfig {
    /// Allow or forbid self connections
    pub fn with_self_connection(mut self, allow: bool) -> Self {
        self.allow_self_connection = allow;
        self
    }

    /// Allow or forbid circular dependencies
    pub fn with_circular_dependencies(mut self, allow: bool) -> Self {
        self.allow_circular_dependencies = allow;
        self
    }

    /// Set the fan-out limit
    pub fn with_max_connections_per_task(mut self, max: usize) -> Self {
        self.max_connections_per_task = max;
        self
    }

    /// How long surfaced errors stay visible
    pub fn error_display_duration(&self) -> Duration {
        Duration::from_secs(self.error_display_secs)
    }
}
