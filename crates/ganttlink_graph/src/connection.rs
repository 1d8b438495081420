// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dependency edge definitions.

use crate::geometry::ScreenPoint;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ordering constraint expressed by a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// Successor starts after predecessor finishes
    #[default]
    FinishToStart,
    /// Successor starts after predecessor starts
    StartToStart,
    /// Successor finishes after predecessor finishes
    FinishToFinish,
    /// Successor finishes after predecessor starts
    StartToFinish,
}

impl DependencyKind {
    /// Short label for connector badges
    pub fn label(&self) -> &'static str {
        match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::StartToFinish => "SF",
        }
    }

    /// Whether the predecessor side anchors at the task's finish edge
    pub fn from_finish(&self) -> bool {
        matches!(self, Self::FinishToStart | Self::FinishToFinish)
    }

    /// Whether the successor side anchors at the task's finish edge
    pub fn to_finish(&self) -> bool {
        matches!(self, Self::FinishToFinish | Self::StartToFinish)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FinishToStart => "finish-to-start",
            Self::StartToStart => "start-to-start",
            Self::FinishToFinish => "finish-to-finish",
            Self::StartToFinish => "start-to-finish",
        };
        f.write_str(name)
    }
}

/// Milliseconds since the UNIX epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(saturating_millis)
        .unwrap_or_default()
}

fn saturating_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// A dependency between two work items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Predecessor task
    pub from_id: TaskId,
    /// Successor task
    pub to_id: TaskId,
    /// Dependency kind
    #[serde(default)]
    pub kind: DependencyKind,
    /// Signed offset in time units
    #[serde(default)]
    pub lag: Option<i64>,
    /// Creation time (ms since epoch)
    #[serde(default)]
    pub created_at: u64,
    /// Last update time (ms since epoch)
    #[serde(default)]
    pub updated_at: u64,
    /// Source connector position captured at creation
    #[serde(default)]
    pub from_point: Option<ScreenPoint>,
    /// Target connector position captured at creation
    #[serde(default)]
    pub to_point: Option<ScreenPoint>,
}

impl Connection {
    /// Create a new connection stamped with the current time
    pub fn new(from_id: TaskId, to_id: TaskId, kind: DependencyKind) -> Self {
        let now = now_millis();
        Self {
            id: ConnectionId::new(),
            from_id,
            to_id,
            kind,
            lag: None,
            created_at: now,
            updated_at: now,
            from_point: None,
            to_point: None,
        }
    }

    /// Attach cached connector positions
    pub fn with_points(mut self, from_point: Option<ScreenPoint>, to_point: Option<ScreenPoint>) -> Self {
        self.from_point = from_point;
        self.to_point = to_point;
        self
    }

    /// Set the lag
    pub fn with_lag(mut self, lag: i64) -> Self {
        self.lag = Some(lag);
        self
    }

    /// Check if this connection involves a specific task
    pub fn involves_task(&self, task: &TaskId) -> bool {
        self.from_id == *task || self.to_id == *task
    }

    /// Check if this connection links `from` to `to` in that direction
    pub fn links(&self, from: &TaskId, to: &TaskId) -> bool {
        self.from_id == *from && self.to_id == *to
    }

    /// Apply a partial update. Does not touch `updated_at`.
    pub fn apply(&mut self, patch: &ConnectionPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(lag) = patch.lag {
            self.lag = lag;
        }
        if let Some(point) = &patch.from_point {
            self.from_point = Some(point.clone());
        }
        if let Some(point) = &patch.to_point {
            self.to_point = Some(point.clone());
        }
    }
}

/// Partial update of a connection's non-structural fields.
///
/// Endpoints are fixed for the lifetime of a connection; re-pointing an edge
/// is a delete followed by a create so that it passes validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPatch {
    /// New dependency kind
    #[serde(default)]
    pub kind: Option<DependencyKind>,
    /// New lag (`Some(None)` clears it)
    #[serde(default)]
    pub lag: Option<Option<i64>>,
    /// New cached source position
    #[serde(default)]
    pub from_point: Option<ScreenPoint>,
    /// New cached target position
    #[serde(default)]
    pub to_point: Option<ScreenPoint>,
}

impl ConnectionPatch {
    /// Patch that changes the kind
    pub fn kind(kind: DependencyKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Patch that sets or clears the lag
    pub fn lag(lag: Option<i64>) -> Self {
        Self {
            lag: Some(lag),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.lag.is_none() && self.from_point.is_none() && self.to_point.is_none()
    }
}
