// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drag-to-connect interaction.
//!
//! The host translates its pointer and keyboard events into four calls:
//! - [`ConnectionController::begin_from`] on press over a source connector
//! - [`ConnectionController::track_cursor`] on every pointer move
//! - [`ConnectionController::complete_at`] on release over a target connector
//! - [`ConnectionController::cancel`] on release over empty space, Escape, or
//!   focus loss
//!
//! Only one drag exists at a time for the whole graph.

use crate::connection::{Connection, ConnectionId, ConnectionPatch};
use crate::geometry::{resolve_endpoints, ConnectorRole, GeometryResolver, ScreenPoint};
use crate::status::ErrorDisplay;
use crate::store::{ConnectionError, ConnectionStore, ConnectionSummary};
use crate::task::TaskId;
use std::time::Instant;

/// An in-progress connection drag
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDrag {
    /// Task the drag started from
    pub source_id: TaskId,
    /// Source connector position
    pub source_point: ScreenPoint,
    /// Current pointer position
    pub cursor_point: ScreenPoint,
}

/// Interaction state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConnectMode {
    /// No drag in progress
    #[default]
    Idle,
    /// Dragging a new connection
    Connecting(ConnectionDrag),
}

/// Result of releasing over a target
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// Nothing happened: no drag in progress, or the target has no geometry
    Ignored,
    /// The connection was created and persisted
    Created(Connection),
    /// The drag was consumed but the connection refused or rolled back
    Rejected(ConnectionError),
}

/// Turns pointer gestures into graph mutations
pub struct ConnectionController<R> {
    store: ConnectionStore,
    resolver: R,
    mode: ConnectMode,
    errors: ErrorDisplay,
}

impl<R: GeometryResolver> ConnectionController<R> {
    /// Create an idle controller over a store
    pub fn new(store: ConnectionStore, resolver: R) -> Self {
        let errors = ErrorDisplay::new(store.config().error_display_duration());
        Self {
            store,
            resolver,
            mode: ConnectMode::Idle,
            errors,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    /// The geometry resolver
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Mutable access to the resolver, for relayout
    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Current interaction state
    pub fn mode(&self) -> &ConnectMode {
        &self.mode
    }

    /// The drag in progress, if any
    pub fn session(&self) -> Option<&ConnectionDrag> {
        match &self.mode {
            ConnectMode::Connecting(drag) => Some(drag),
            ConnectMode::Idle => None,
        }
    }

    /// Whether a drag is in progress
    pub fn is_connecting(&self) -> bool {
        matches!(self.mode, ConnectMode::Connecting(_))
    }

    /// Start a drag from a task's source connector.
    ///
    /// Ignored while another drag is in progress or when the task has no
    /// geometry. Returns whether a drag started.
    pub fn begin_from(&mut self, task: &TaskId, point: ScreenPoint) -> bool {
        if let ConnectMode::Connecting(drag) = &self.mode {
            tracing::debug!("Ignoring begin on {}: already connecting from {}", task, drag.source_id);
            return false;
        }

        let Some(source_point) = self.resolver.resolve_connector_point(task, ConnectorRole::Source) else {
            tracing::debug!("No source connector for {}; ignoring begin", task);
            return false;
        };

        self.mode = ConnectMode::Connecting(ConnectionDrag {
            source_id: task.clone(),
            source_point,
            cursor_point: point,
        });
        tracing::debug!("Connecting from {}", task);
        true
    }

    /// Follow the pointer while dragging
    pub fn track_cursor(&mut self, point: ScreenPoint) {
        if let ConnectMode::Connecting(drag) = &mut self.mode {
            drag.cursor_point = point;
        }
    }

    /// Finish the drag on a task's target connector.
    ///
    /// The drag is consumed before anything is awaited, whatever the result.
    /// Refusals and rollbacks are also raised on the error display.
    pub async fn complete_at(&mut self, target: &TaskId, point: ScreenPoint) -> CompletionOutcome {
        if !self.is_connecting() {
            tracing::debug!("Ignoring release on {}: not connecting", target);
            return CompletionOutcome::Ignored;
        }

        let Some(target_point) = self.resolver.resolve_connector_point(target, ConnectorRole::Target) else {
            tracing::debug!("No target connector for {}; ignoring release at {:?}", target, point.pos());
            return CompletionOutcome::Ignored;
        };

        let ConnectMode::Connecting(drag) = std::mem::take(&mut self.mode) else {
            return CompletionOutcome::Ignored;
        };

        let kind = self.store.config().default_kind;
        let result = self
            .store
            .create_connection_with_points(&drag.source_id, target, kind, Some(drag.source_point), Some(target_point))
            .await;

        match result {
            Ok(connection) => CompletionOutcome::Created(connection),
            Err(err) => {
                tracing::warn!("Connection {} -> {} refused: {}", drag.source_id, target, err);
                self.errors.raise(err.to_string(), Instant::now());
                CompletionOutcome::Rejected(err)
            }
        }
    }

    /// Pointer released: complete over a task, cancel over empty space
    pub async fn release(&mut self, target: Option<&TaskId>, point: ScreenPoint) -> CompletionOutcome {
        match target {
            Some(task) => self.complete_at(task, point).await,
            None => {
                self.cancel();
                CompletionOutcome::Ignored
            }
        }
    }

    /// Abandon the drag. Returns whether one was in progress.
    pub fn cancel(&mut self) -> bool {
        match std::mem::take(&mut self.mode) {
            ConnectMode::Connecting(drag) => {
                tracing::debug!("Cancelled connection from {}", drag.source_id);
                true
            }
            ConnectMode::Idle => false,
        }
    }

    /// Delete a connection, surfacing failures on the error display
    pub async fn delete_connection(&mut self, id: ConnectionId) -> Result<(), ConnectionError> {
        let result = self.store.delete_connection(id).await;
        if let Err(err) = &result {
            self.errors.raise(err.to_string(), Instant::now());
        }
        result
    }

    /// Update a connection, surfacing failures on the error display
    pub async fn update_connection(
        &mut self,
        id: ConnectionId,
        patch: ConnectionPatch,
    ) -> Result<Connection, ConnectionError> {
        let result = self.store.update_connection(id, patch).await;
        if let Err(err) = &result {
            self.errors.raise(err.to_string(), Instant::now());
        }
        result
    }

    /// Error message still visible at `now`
    pub fn current_error(&self, now: Instant) -> Option<&str> {
        self.errors.current(now)
    }

    /// Dismiss the error message
    pub fn dismiss_error(&mut self) {
        self.errors.dismiss();
    }

    /// Drop the error message once it has expired
    pub fn clear_expired(&mut self, now: Instant) {
        self.errors.clear_expired(now);
    }

    /// Live connections
    pub fn connections(&self) -> Vec<Connection> {
        self.store.connections()
    }

    /// Counts for badges
    pub fn summary(&self) -> ConnectionSummary {
        self.store.summary()
    }

    /// Where to draw an existing connection
    pub fn connection_endpoints(&self, id: ConnectionId) -> Option<(ScreenPoint, ScreenPoint)> {
        let connection = self.store.connection(id)?;
        resolve_endpoints(&connection, &self.resolver)
    }
}

impl<R> std::fmt::Debug for ConnectionController<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionController")
            .field("store", &self.store)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::connection::DependencyKind;
    use crate::geometry::BoundsResolver;
    use crate::testing::{store_with, Call, RecordingAdapter};
    use crate::validation::ValidationError;
    use egui::{Pos2, Rect, Vec2};
    use std::sync::Arc;
    use std::time::Duration;

    fn id(s: &str) -> TaskId {
        TaskId::from(s)
    }

    /// Bars for t1..t4 stacked in rows 20px apart
    fn layout() -> BoundsResolver {
        let mut resolver = BoundsResolver::new();
        for (row, task) in ["t1", "t2", "t3", "t4"].into_iter().enumerate() {
            let top = row as f32 * 20.0;
            resolver.set_bounds(
                id(task),
                Rect::from_min_size(Pos2::new(100.0 * row as f32, top), Vec2::new(80.0, 16.0)),
            );
        }
        resolver
    }

    fn controller(config: ConnectionConfig) -> (ConnectionController<BoundsResolver>, Arc<RecordingAdapter>) {
        let adapter = Arc::new(RecordingAdapter::new());
        let store = store_with(config, adapter.clone());
        (ConnectionController::new(store, layout()), adapter)
    }

    fn at(x: f32, y: f32) -> ScreenPoint {
        ScreenPoint::new(x, y)
    }

    #[tokio::test]
    async fn test_drag_creates_finish_to_start() {
        let (mut ctl, adapter) = controller(ConnectionConfig::default());

        assert!(ctl.begin_from(&id("t1"), at(80.0, 8.0)));
        let drag = ctl.session().unwrap();
        assert_eq!(drag.source_id, id("t1"));
        assert_eq!(drag.source_point, ScreenPoint::owned(80.0, 8.0, id("t1")));

        let outcome = ctl.complete_at(&id("t2"), at(101.0, 28.0)).await;
        let CompletionOutcome::Created(connection) = outcome else {
            panic!("expected a connection, got {outcome:?}");
        };
        assert_eq!(connection.from_id, id("t1"));
        assert_eq!(connection.to_id, id("t2"));
        assert_eq!(connection.kind, DependencyKind::FinishToStart);
        assert_eq!(connection.to_point, Some(ScreenPoint::owned(100.0, 28.0, id("t2"))));

        assert_eq!(adapter.calls(), vec![Call::Create(connection)]);
        assert_eq!(*ctl.mode(), ConnectMode::Idle);
        assert_eq!(ctl.current_error(Instant::now()), None);
    }

    #[tokio::test]
    async fn test_reverse_drag_is_circular() {
        let (mut ctl, adapter) = controller(ConnectionConfig::default());
        ctl.store().replace_all([Connection::new(id("t1"), id("t2"), DependencyKind::FinishToStart)]);
        let before = ctl.connections();

        ctl.begin_from(&id("t2"), at(180.0, 28.0));
        let outcome = ctl.complete_at(&id("t1"), at(0.0, 8.0)).await;

        assert!(matches!(
            outcome,
            CompletionOutcome::Rejected(ConnectionError::Validation(ValidationError::CircularDependency { .. }))
        ));
        assert_eq!(ctl.connections(), before);
        assert!(adapter.calls().is_empty());
        assert!(!ctl.is_connecting());
        assert!(ctl.current_error(Instant::now()).unwrap().contains("circular"));
    }

    #[tokio::test]
    async fn test_fan_out_limit_via_drag() {
        let (mut ctl, _adapter) = controller(ConnectionConfig::default().with_max_connections_per_task(2));
        ctl.store().replace_all([
            Connection::new(id("t1"), id("t2"), DependencyKind::FinishToStart),
            Connection::new(id("t1"), id("t3"), DependencyKind::FinishToStart),
        ]);

        ctl.begin_from(&id("t1"), at(80.0, 8.0));
        let outcome = ctl.complete_at(&id("t4"), at(300.0, 68.0)).await;

        assert!(matches!(
            outcome,
            CompletionOutcome::Rejected(ConnectionError::Validation(ValidationError::MaxConnectionsExceeded { .. }))
        ));
        assert_eq!(ctl.summary().total, 2);
    }

    #[tokio::test]
    async fn test_cancel_after_moves() {
        let (mut ctl, adapter) = controller(ConnectionConfig::default());

        ctl.begin_from(&id("t1"), at(80.0, 8.0));
        for x in [120.0, 160.0, 200.0] {
            ctl.track_cursor(at(x, 30.0));
        }
        assert_eq!(ctl.session().unwrap().cursor_point, at(200.0, 30.0));

        assert!(ctl.cancel());
        assert_eq!(*ctl.mode(), ConnectMode::Idle);
        assert_eq!(ctl.summary().total, 0);
        assert!(adapter.calls().is_empty());
        assert!(!ctl.cancel());
    }

    #[tokio::test]
    async fn test_first_gesture_wins() {
        let (mut ctl, _adapter) = controller(ConnectionConfig::default());

        assert!(ctl.begin_from(&id("t1"), at(80.0, 8.0)));
        assert!(!ctl.begin_from(&id("t2"), at(180.0, 28.0)));
        assert_eq!(ctl.session().unwrap().source_id, id("t1"));
    }

    #[tokio::test]
    async fn test_missing_geometry_is_ignored() {
        let (mut ctl, adapter) = controller(ConnectionConfig::default());
        ctl.resolver_mut().remove(&id("t3"));

        // Begin on an off-screen task does nothing
        assert!(!ctl.begin_from(&id("t3"), at(0.0, 0.0)));
        assert!(!ctl.is_connecting());

        // Release over an off-screen task keeps the drag alive
        ctl.begin_from(&id("t1"), at(80.0, 8.0));
        assert_eq!(ctl.complete_at(&id("t3"), at(0.0, 0.0)).await, CompletionOutcome::Ignored);
        assert!(ctl.is_connecting());
        assert!(adapter.calls().is_empty());
        assert_eq!(ctl.current_error(Instant::now()), None);
    }

    #[tokio::test]
    async fn test_release_while_idle_is_noop() {
        let (mut ctl, adapter) = controller(ConnectionConfig::default());
        assert_eq!(ctl.complete_at(&id("t2"), at(100.0, 28.0)).await, CompletionOutcome::Ignored);
        assert!(!ctl.is_connecting());
        assert!(adapter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_release_over_empty_space_cancels() {
        let (mut ctl, _adapter) = controller(ConnectionConfig::default());
        ctl.begin_from(&id("t1"), at(80.0, 8.0));
        assert_eq!(ctl.release(None, at(500.0, 500.0)).await, CompletionOutcome::Ignored);
        assert!(!ctl.is_connecting());

        ctl.begin_from(&id("t1"), at(80.0, 8.0));
        let outcome = ctl.release(Some(&id("t2")), at(100.0, 28.0)).await;
        assert!(matches!(outcome, CompletionOutcome::Created(_)));
    }

    #[tokio::test]
    async fn test_persistence_failure_surfaces_and_clears() {
        let (mut ctl, adapter) = controller(ConnectionConfig::default());
        adapter.fail_next("server unavailable");

        ctl.begin_from(&id("t1"), at(80.0, 8.0));
        let outcome = ctl.complete_at(&id("t2"), at(100.0, 28.0)).await;

        assert!(matches!(outcome, CompletionOutcome::Rejected(ref err) if err.is_rollback()));
        assert_eq!(ctl.summary().total, 0);
        assert_eq!(adapter.calls().len(), 1);
        assert!(!ctl.is_connecting());

        let now = Instant::now();
        assert_eq!(ctl.current_error(now), Some("Persistence failed: server unavailable"));
        assert_eq!(ctl.current_error(now + Duration::from_secs(6)), None);

        ctl.dismiss_error();
        assert_eq!(ctl.current_error(now), None);

        // The next gesture starts cleanly
        ctl.begin_from(&id("t1"), at(80.0, 8.0));
        assert!(matches!(
            ctl.complete_at(&id("t2"), at(100.0, 28.0)).await,
            CompletionOutcome::Created(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_failure_surfaces() {
        let (mut ctl, adapter) = controller(ConnectionConfig::default());
        ctl.begin_from(&id("t1"), at(80.0, 8.0));
        let CompletionOutcome::Created(connection) = ctl.complete_at(&id("t2"), at(100.0, 28.0)).await else {
            panic!("expected a connection");
        };

        adapter.fail_next("locked");
        assert!(ctl.delete_connection(connection.id).await.is_err());
        assert_eq!(ctl.summary().total, 1);
        assert_eq!(ctl.current_error(Instant::now()), Some("Persistence failed: locked"));
    }

    #[tokio::test]
    async fn test_endpoints_fall_back_to_bounds() {
        let (ctl, _adapter) = controller(ConnectionConfig::default());
        let loaded = Connection::new(id("t1"), id("t2"), DependencyKind::StartToStart);
        let loaded_id = loaded.id;
        ctl.store().replace_all([loaded]);

        let (from, to) = ctl.connection_endpoints(loaded_id).unwrap();
        // Start-to-start anchors on the left edges
        assert_eq!((from.x, from.y), (0.0, 8.0));
        assert_eq!((to.x, to.y), (100.0, 28.0));
    }
}
