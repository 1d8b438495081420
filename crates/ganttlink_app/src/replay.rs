// SPDX-License-Identifier: MIT OR Apache-2.0
//! Gesture replay.
//!
//! Feeds scripted gestures through a [`ConnectionController`] the same way
//! an interactive surface would: presses and releases are hit-tested against
//! the laid-out bars, moves only update the drag.

use crate::scenario::Gesture;
use egui::Pos2;
use ganttlink_graph::{
    BoundsResolver, CompletionOutcome, ConnectionController, ConnectionError, ConnectionPatch, ConnectorRole,
    DependencyKind, GeometryResolver, ScreenPoint, TaskId,
};
use std::fmt;
use std::time::Instant;

/// What a single gesture did
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    /// A drag started
    Started(TaskId),
    /// The gesture had no effect
    Ignored(String),
    /// A connection was created
    Created {
        /// Predecessor
        from: TaskId,
        /// Successor
        to: TaskId,
        /// Dependency kind
        kind: DependencyKind,
    },
    /// A change was refused or rolled back
    Rejected(String),
    /// The drag was abandoned
    Cancelled,
    /// A connection was deleted
    Deleted {
        /// Predecessor
        from: TaskId,
        /// Successor
        to: TaskId,
    },
    /// A connection was updated
    Updated {
        /// Predecessor
        from: TaskId,
        /// Successor
        to: TaskId,
    },
    /// The pointer moved during a drag
    Tracked,
}

impl fmt::Display for ReplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started(task) => write!(f, "connecting from {task}"),
            Self::Ignored(reason) => write!(f, "ignored: {reason}"),
            Self::Created { from, to, kind } => write!(f, "created {from} -> {to} ({})", kind.label()),
            Self::Rejected(message) => write!(f, "rejected: {message}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Deleted { from, to } => write!(f, "deleted {from} -> {to}"),
            Self::Updated { from, to } => write!(f, "updated {from} -> {to}"),
            Self::Tracked => write!(f, "tracking"),
        }
    }
}

/// Replay every gesture in order, collecting what each one did
pub async fn replay(
    controller: &mut ConnectionController<BoundsResolver>,
    gestures: &[Gesture],
) -> Vec<ReplayEvent> {
    let mut events = Vec::with_capacity(gestures.len());
    for gesture in gestures {
        let event = apply(controller, gesture).await;
        tracing::debug!("{:?} -> {}", gesture, event);
        events.push(event);
    }
    events
}

async fn apply(controller: &mut ConnectionController<BoundsResolver>, gesture: &Gesture) -> ReplayEvent {
    match gesture {
        Gesture::Press { x, y } => {
            let pos = Pos2::new(*x, *y);
            match controller.resolver().hit_test(pos).cloned() {
                Some(task) => begin(controller, &task, ScreenPoint::from(pos)),
                None => ReplayEvent::Ignored("press over empty space".to_string()),
            }
        }
        Gesture::Begin { task } => {
            let point = controller
                .resolver()
                .resolve_connector_point(task, ConnectorRole::Source)
                .unwrap_or_else(|| ScreenPoint::new(0.0, 0.0));
            begin(controller, task, point)
        }
        Gesture::Move { x, y } => {
            if controller.is_connecting() {
                controller.track_cursor(ScreenPoint::new(*x, *y));
                ReplayEvent::Tracked
            } else {
                ReplayEvent::Ignored("move while idle".to_string())
            }
        }
        Gesture::Release { x, y } => {
            let pos = Pos2::new(*x, *y);
            let target = controller.resolver().hit_test(pos).cloned();
            if target.is_none() && controller.is_connecting() {
                controller.cancel();
                return ReplayEvent::Cancelled;
            }
            let outcome = controller.release(target.as_ref(), ScreenPoint::from(pos)).await;
            completion(controller, outcome)
        }
        Gesture::Complete { task } => {
            let point = controller
                .resolver()
                .resolve_connector_point(task, ConnectorRole::Target)
                .unwrap_or_else(|| ScreenPoint::new(0.0, 0.0));
            let outcome = controller.complete_at(task, point).await;
            completion(controller, outcome)
        }
        Gesture::Cancel => {
            if controller.cancel() {
                ReplayEvent::Cancelled
            } else {
                ReplayEvent::Ignored("nothing to cancel".to_string())
            }
        }
        Gesture::Delete { from, to } => {
            let Some(connection) = controller.store().find(from, to) else {
                return ReplayEvent::Ignored(format!("no connection {from} -> {to}"));
            };
            match controller.delete_connection(connection.id).await {
                Ok(()) => ReplayEvent::Deleted {
                    from: from.clone(),
                    to: to.clone(),
                },
                Err(err) => rejected(&err),
            }
        }
        Gesture::SetLag { from, to, lag } => update(controller, from, to, ConnectionPatch::lag(*lag)).await,
        Gesture::SetKind { from, to, kind } => update(controller, from, to, ConnectionPatch::kind(*kind)).await,
    }
}

fn begin(controller: &mut ConnectionController<BoundsResolver>, task: &TaskId, point: ScreenPoint) -> ReplayEvent {
    if controller.begin_from(task, point) {
        ReplayEvent::Started(task.clone())
    } else if let Some(drag) = controller.session() {
        ReplayEvent::Ignored(format!("already connecting from {}", drag.source_id))
    } else {
        match controller.store().task(task) {
            Some(item) => ReplayEvent::Ignored(format!("'{}' is not on screen", item.title)),
            None => ReplayEvent::Ignored(format!("unknown task {task}")),
        }
    }
}

fn completion(controller: &ConnectionController<BoundsResolver>, outcome: CompletionOutcome) -> ReplayEvent {
    match outcome {
        CompletionOutcome::Created(connection) => ReplayEvent::Created {
            from: connection.from_id,
            to: connection.to_id,
            kind: connection.kind,
        },
        CompletionOutcome::Rejected(err) => {
            // The controller already raised the message; prefer what it shows
            let message = controller
                .current_error(Instant::now())
                .map_or_else(|| err.to_string(), str::to_string);
            ReplayEvent::Rejected(message)
        }
        CompletionOutcome::Ignored => ReplayEvent::Ignored("release had no effect".to_string()),
    }
}

async fn update(
    controller: &mut ConnectionController<BoundsResolver>,
    from: &TaskId,
    to: &TaskId,
    patch: ConnectionPatch,
) -> ReplayEvent {
    let Some(connection) = controller.store().find(from, to) else {
        return ReplayEvent::Ignored(format!("no connection {from} -> {to}"));
    };
    match controller.update_connection(connection.id, patch).await {
        Ok(_) => ReplayEvent::Updated {
            from: from.clone(),
            to: to.clone(),
        },
        Err(err) => rejected(&err),
    }
}

fn rejected(err: &ConnectionError) -> ReplayEvent {
    ReplayEvent::Rejected(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TimelineLayout;
    use crate::persistence::RejectingAdapter;
    use crate::scenario::{Scenario, ScheduledTask};
    use ganttlink_graph::{ConnectionConfig, ConnectionStore};
    use std::sync::Arc;

    fn scenario() -> Scenario {
        let tasks = ["t1", "t2", "t3", "t4"]
            .into_iter()
            .enumerate()
            .map(|(row, id)| ScheduledTask {
                id: id.into(),
                title: id.to_uppercase(),
                status: None,
                start: row as f32 * 2.0,
                duration: 2.0,
                row,
            })
            .collect();
        Scenario {
            name: "test".to_string(),
            tasks,
            ..Scenario::default()
        }
    }

    fn controller(scenario: &Scenario, store: ConnectionStore) -> ConnectionController<BoundsResolver> {
        store.set_tasks(scenario.work_items());
        store.replace_all(scenario.connections.clone());
        ConnectionController::new(store, TimelineLayout::default().resolver(&scenario.tasks))
    }

    #[tokio::test]
    async fn test_pointer_drag_creates_connection() {
        let scenario = scenario();
        let mut ctl = controller(&scenario, ConnectionStore::new(ConnectionConfig::default()));

        // t1 spans x 200..280 on row 0; t2 spans x 280..360 on row 1
        let events = replay(
            &mut ctl,
            &[
                Gesture::Press { x: 270.0, y: 46.0 },
                Gesture::Move { x: 300.0, y: 60.0 },
                Gesture::Release { x: 300.0, y: 74.0 },
            ],
        )
        .await;

        assert_eq!(events[0], ReplayEvent::Started("t1".into()));
        assert_eq!(events[1], ReplayEvent::Tracked);
        assert_eq!(
            events[2],
            ReplayEvent::Created {
                from: "t1".into(),
                to: "t2".into(),
                kind: DependencyKind::FinishToStart,
            }
        );
        assert_eq!(events[2].to_string(), "created t1 -> t2 (FS)");
        assert_eq!(ctl.store().connection_count(), 1);
    }

    #[tokio::test]
    async fn test_begin_off_screen_names_task() {
        let mut scenario = scenario();
        scenario.tasks[3].start = -10.0;
        let mut ctl = controller(&scenario, ConnectionStore::new(ConnectionConfig::default()));

        let events = replay(
            &mut ctl,
            &[Gesture::Begin { task: "t4".into() }, Gesture::Begin { task: "zz".into() }],
        )
        .await;

        assert_eq!(events[0], ReplayEvent::Ignored("'T4' is not on screen".to_string()));
        assert_eq!(events[1], ReplayEvent::Ignored("unknown task zz".to_string()));
    }

    #[tokio::test]
    async fn test_release_over_empty_space_cancels() {
        let scenario = scenario();
        let mut ctl = controller(&scenario, ConnectionStore::new(ConnectionConfig::default()));

        let events = replay(
            &mut ctl,
            &[
                Gesture::Begin { task: "t1".into() },
                Gesture::Release { x: 10.0, y: 10.0 },
                Gesture::Cancel,
            ],
        )
        .await;

        assert_eq!(events[1], ReplayEvent::Cancelled);
        assert!(matches!(events[2], ReplayEvent::Ignored(_)));
        assert_eq!(ctl.store().connection_count(), 0);
    }

    #[tokio::test]
    async fn test_rejections_are_reported() {
        let scenario = scenario();
        let store = ConnectionStore::new(ConnectionConfig::default())
            .with_adapter(Arc::new(RejectingAdapter::new("read-only")));
        let mut ctl = controller(&scenario, store);

        let events = replay(
            &mut ctl,
            &[
                Gesture::Begin { task: "t1".into() },
                Gesture::Complete { task: "t1".into() },
                Gesture::Begin { task: "t1".into() },
                Gesture::Complete { task: "t2".into() },
                Gesture::Delete {
                    from: "t1".into(),
                    to: "t2".into(),
                },
            ],
        )
        .await;

        assert_eq!(events[1], ReplayEvent::Rejected("A task cannot depend on itself".to_string()));
        assert_eq!(events[3], ReplayEvent::Rejected("Persistence failed: read-only".to_string()));
        assert!(matches!(events[4], ReplayEvent::Ignored(_)));
    }

    #[tokio::test]
    async fn test_edit_gestures() {
        let scenario = scenario();
        let mut ctl = controller(&scenario, ConnectionStore::new(ConnectionConfig::default()));

        let events = replay(
            &mut ctl,
            &[
                Gesture::Begin { task: "t2".into() },
                Gesture::Complete { task: "t3".into() },
                Gesture::SetLag {
                    from: "t2".into(),
                    to: "t3".into(),
                    lag: Some(4),
                },
                Gesture::Delete {
                    from: "t2".into(),
                    to: "t3".into(),
                },
            ],
        )
        .await;

        assert!(matches!(events[2], ReplayEvent::Updated { .. }));
        assert!(matches!(events[3], ReplayEvent::Deleted { .. }));
        assert_eq!(ctl.store().connection_count(), 0);
    }
}
