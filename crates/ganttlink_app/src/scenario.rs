// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scenario files.
//!
//! A scenario describes a small schedule and a script of pointer gestures:
//! - Tasks with their timeline placement
//! - Connection rules
//! - Initial connections
//! - Gestures to replay

use crate::error::{AppError, Result};
use ganttlink_graph::{Connection, ConnectionConfig, DependencyKind, TaskId, WorkItem};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A task as placed on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Task identifier
    pub id: TaskId,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Status bucket
    #[serde(default)]
    pub status: Option<String>,
    /// Start time (time units)
    pub start: f32,
    /// Duration (time units)
    pub duration: f32,
    /// Timeline row
    #[serde(default)]
    pub row: usize,
}

impl ScheduledTask {
    /// Identity handed to the dependency graph
    pub fn work_item(&self) -> WorkItem {
        WorkItem {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status.clone(),
        }
    }
}

/// A scripted pointer or editing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gesture {
    /// Pointer pressed; starts a drag if over a task
    Press {
        /// Horizontal position
        x: f32,
        /// Vertical position
        y: f32,
    },
    /// Pointer moved
    Move {
        /// Horizontal position
        x: f32,
        /// Vertical position
        y: f32,
    },
    /// Pointer released; completes over a task, cancels elsewhere
    Release {
        /// Horizontal position
        x: f32,
        /// Vertical position
        y: f32,
    },
    /// Start a drag from a task's source connector
    Begin {
        /// Source task
        task: TaskId,
    },
    /// Finish a drag on a task's target connector
    Complete {
        /// Target task
        task: TaskId,
    },
    /// Escape / focus loss
    Cancel,
    /// Delete the connection between two tasks
    Delete {
        /// Predecessor
        from: TaskId,
        /// Successor
        to: TaskId,
    },
    /// Set or clear the lag of a connection
    SetLag {
        /// Predecessor
        from: TaskId,
        /// Successor
        to: TaskId,
        /// New lag
        lag: Option<i64>,
    },
    /// Change the kind of a connection
    SetKind {
        /// Predecessor
        from: TaskId,
        /// Successor
        to: TaskId,
        /// New kind
        kind: DependencyKind,
    },
}

/// A schedule plus the gestures to replay against it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    #[serde(default)]
    pub name: String,
    /// Connection rules
    #[serde(default)]
    pub config: ConnectionConfig,
    /// Tasks in a status bucket that may not be linked to each other
    #[serde(default)]
    pub locked_status: Option<String>,
    /// Tasks on the timeline
    #[serde(default)]
    pub tasks: Vec<ScheduledTask>,
    /// Connections present before replay
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Gestures to replay
    #[serde(default)]
    pub gestures: Vec<Gesture>,
}

impl Scenario {
    /// Parse a scenario from RON text
    pub fn from_ron(text: &str) -> std::result::Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Load a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario = Self::from_ron(&text).map_err(|source| AppError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            "Loaded scenario '{}': {} tasks, {} gestures",
            scenario.name,
            scenario.tasks.len(),
            scenario.gestures.len()
        );
        Ok(scenario)
    }

    /// Work items for the dependency graph
    pub fn work_items(&self) -> Vec<WorkItem> {
        self.tasks.iter().map(ScheduledTask::work_item).collect()
    }
}
