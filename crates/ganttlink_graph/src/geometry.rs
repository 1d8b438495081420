// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connector geometry.
//!
//! The host surface knows where tasks are drawn; the graph only asks it for
//! connector positions through [`GeometryResolver`]. A resolver returning
//! `None` means the task is not currently laid out (scrolled away, collapsed)
//! and callers treat that as "ignore this gesture step".

use crate::connection::{Connection, DependencyKind};
use crate::task::TaskId;
use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A screen-space position, optionally tagged with the task it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
    /// Task whose connector this point is
    #[serde(default)]
    pub owner: Option<TaskId>,
}

impl ScreenPoint {
    /// Untagged point (e.g. the pointer)
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, owner: None }
    }

    /// Point on a task's connector
    pub fn owned(x: f32, y: f32, owner: TaskId) -> Self {
        Self {
            x,
            y,
            owner: Some(owner),
        }
    }

    /// Convert to an egui position
    pub fn pos(&self) -> Pos2 {
        Pos2::new(self.x, self.y)
    }
}

impl From<Pos2> for ScreenPoint {
    fn from(pos: Pos2) -> Self {
        Self::new(pos.x, pos.y)
    }
}

/// Which end of a connector is being asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorRole {
    /// Outgoing handle, where drags start
    Source,
    /// Incoming handle, where drags end
    Target,
}

/// Maps tasks to on-screen connector positions
pub trait GeometryResolver {
    /// Position of a task's connector, or `None` if it is not laid out
    fn resolve_connector_point(&self, task: &TaskId, role: ConnectorRole) -> Option<ScreenPoint>;

    /// Bounding box of a task's bar, if known
    fn task_bounds(&self, _task: &TaskId) -> Option<Rect> {
        None
    }
}

impl<R: GeometryResolver + ?Sized> GeometryResolver for &R {
    fn resolve_connector_point(&self, task: &TaskId, role: ConnectorRole) -> Option<ScreenPoint> {
        (**self).resolve_connector_point(task, role)
    }

    fn task_bounds(&self, task: &TaskId) -> Option<Rect> {
        (**self).task_bounds(task)
    }
}

/// Approximate connector position derived from a task's bounding box.
///
/// Finish-side anchors sit on the right edge, start-side anchors on the left.
pub fn fallback_anchor(bounds: Rect, kind: DependencyKind, role: ConnectorRole) -> Pos2 {
    let finish_side = match role {
        ConnectorRole::Source => kind.from_finish(),
        ConnectorRole::Target => kind.to_finish(),
    };
    if finish_side {
        bounds.right_center()
    } else {
        bounds.left_center()
    }
}

/// Endpoints for drawing an existing connection.
///
/// Cached points win. Otherwise the bounding boxes are used, then the live
/// connector points. `None` if either end cannot be placed.
pub fn resolve_endpoints<R: GeometryResolver + ?Sized>(
    connection: &Connection,
    resolver: &R,
) -> Option<(ScreenPoint, ScreenPoint)> {
    let from = match &connection.from_point {
        Some(point) => point.clone(),
        None => resolve_side(connection, &connection.from_id, ConnectorRole::Source, resolver)?,
    };
    let to = match &connection.to_point {
        Some(point) => point.clone(),
        None => resolve_side(connection, &connection.to_id, ConnectorRole::Target, resolver)?,
    };
    Some((from, to))
}

fn resolve_side<R: GeometryResolver + ?Sized>(
    connection: &Connection,
    task: &TaskId,
    role: ConnectorRole,
    resolver: &R,
) -> Option<ScreenPoint> {
    if let Some(bounds) = resolver.task_bounds(task) {
        let pos = fallback_anchor(bounds, connection.kind, role);
        return Some(ScreenPoint::owned(pos.x, pos.y, task.clone()));
    }
    resolver.resolve_connector_point(task, role)
}

/// Resolver backed by a table of task bounding boxes
#[derive(Debug, Clone, Default)]
pub struct BoundsResolver {
    bounds: HashMap<TaskId, Rect>,
}

impl BoundsResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) a task's bounding box
    pub fn set_bounds(&mut self, task: TaskId, rect: Rect) {
        self.bounds.insert(task, rect);
    }

    /// Forget a task, e.g. when it scrolls out of view
    pub fn remove(&mut self, task: &TaskId) -> Option<Rect> {
        self.bounds.remove(task)
    }

    /// Topmost task whose box contains `pos`
    pub fn hit_test(&self, pos: Pos2) -> Option<&TaskId> {
        self.bounds
            .iter()
            .filter(|(_, rect)| rect.contains(pos))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(id, _)| id)
    }

    /// Number of laid-out tasks
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Whether no task is laid out
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

impl GeometryResolver for BoundsResolver {
    fn resolve_connector_point(&self, task: &TaskId, role: ConnectorRole) -> Option<ScreenPoint> {
        let rect = self.bounds.get(task)?;
        let pos = match role {
            ConnectorRole::Source => rect.right_center(),
            ConnectorRole::Target => rect.left_center(),
        };
        Some(ScreenPoint::owned(pos.x, pos.y, task.clone()))
    }

    fn task_bounds(&self, task: &TaskId) -> Option<Rect> {
        self.bounds.get(task).copied()
    }
}
