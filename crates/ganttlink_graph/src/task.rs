// SPDX-License-Identifier: MIT OR Apache-2.0
//! Work item identity as seen by the dependency graph.
//!
//! The graph never owns task data. It only needs enough of a task to check
//! that an id exists and to hand both endpoints to custom rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a work item, supplied by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a task ID from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A schedulable unit referenced by the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Task identifier
    pub id: TaskId,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Status bucket (e.g. "todo", "done"), if the host tracks one
    #[serde(default)]
    pub status: Option<String>,
}

impl WorkItem {
    /// Create a work item with a title and no status
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: None,
        }
    }

    /// Set the status bucket
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}
