// SPDX-License-Identifier: MIT OR Apache-2.0
//! The authoritative dependency edge set.
//!
//! [`ConnectionStore`] is a cheap handle around shared state, so a renderer
//! can keep reading while a mutation is waiting on its persistence adapter.
//! Every mutation is applied in memory first and rolled back if the adapter
//! fails. The lock is never held across an `.await`.

use crate::adapter::{NoopAdapter, PersistenceAdapter, PersistenceError};
use crate::config::ConnectionConfig;
use crate::connection::{now_millis, Connection, ConnectionId, ConnectionPatch, DependencyKind};
use crate::geometry::ScreenPoint;
use crate::task::{TaskId, WorkItem};
use crate::validation::{self, AllowAll, ConnectionRule, ValidationError};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// Error from a store mutation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// The connection was refused before anything changed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The adapter failed and the in-memory change was rolled back
    #[error("{source}")]
    Persistence {
        /// Connection whose change was rolled back
        id: ConnectionId,
        /// Adapter error
        source: PersistenceError,
    },

    /// No connection with this ID
    #[error("Connection not found: {0}")]
    NotFound(ConnectionId),

    /// Another mutation on this connection has not settled yet
    #[error("Connection {0} has a change in flight")]
    MutationPending(ConnectionId),
}

impl ConnectionError {
    /// Whether the graph was changed and then restored
    pub fn is_rollback(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

/// Connections touching one task, split by direction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionsFor {
    /// Connections where the task is the successor
    pub incoming: Vec<Connection>,
    /// Connections where the task is the predecessor
    pub outgoing: Vec<Connection>,
}

/// Per-task connection counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskConnectionCount {
    /// Number of predecessors
    pub incoming: usize,
    /// Number of successors
    pub outgoing: usize,
}

/// Counts for lightweight UI badges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSummary {
    /// Total connections, optimistic ones included
    pub total: usize,
    /// Connections with a persistence call in flight
    pub pending: usize,
    /// Counts per task that has at least one connection
    pub per_task: IndexMap<TaskId, TaskConnectionCount>,
}

#[derive(Debug, Default)]
struct StoreState {
    tasks: IndexMap<TaskId, WorkItem>,
    connections: IndexMap<ConnectionId, Connection>,
    pending: HashSet<ConnectionId>,
    /// Edges removed by a delete that is still awaiting the adapter
    pending_deletes: IndexMap<ConnectionId, Connection>,
    /// Bumped by `replace_all`; rollbacks from older generations are dropped
    generation: u64,
    /// Bumped on every in-memory change
    revision: u64,
}

impl StoreState {
    /// Pending deletes still count, so a failed delete can always be reinstated
    fn validate(&self, config: &ConnectionConfig, from: &TaskId, to: &TaskId) -> Result<(), ValidationError> {
        let edges = self.connections.values().chain(self.pending_deletes.values());
        validation::validate_structure(&self.tasks, edges, config, from, to)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Shared handle to the dependency graph
#[derive(Clone)]
pub struct ConnectionStore {
    state: Arc<RwLock<StoreState>>,
    config: Arc<ConnectionConfig>,
    adapter: Arc<dyn PersistenceAdapter>,
    rule: Arc<dyn ConnectionRule>,
}

impl ConnectionStore {
    /// Create an empty, local-only store
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            config: Arc::new(config),
            adapter: Arc::new(NoopAdapter),
            rule: Arc::new(AllowAll),
        }
    }

    /// Use a persistence adapter
    pub fn with_adapter(mut self, adapter: Arc<dyn PersistenceAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Use a custom validation rule
    pub fn with_rule(mut self, rule: Arc<dyn ConnectionRule>) -> Self {
        self.rule = rule;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    // --- Tasks ---

    /// Replace the set of known tasks
    pub fn set_tasks(&self, tasks: impl IntoIterator<Item = WorkItem>) {
        let mut state = self.state.write();
        state.tasks = tasks.into_iter().map(|task| (task.id.clone(), task)).collect();
        state.touch();
        tracing::debug!("Loaded {} tasks", state.tasks.len());
    }

    /// Get a task by ID
    pub fn task(&self, id: &TaskId) -> Option<WorkItem> {
        self.state.read().tasks.get(id).cloned()
    }

    /// All known tasks
    pub fn tasks(&self) -> Vec<WorkItem> {
        self.state.read().tasks.values().cloned().collect()
    }

    // --- Queries ---

    /// Snapshot of all connections, in insertion order
    pub fn connections(&self) -> Vec<Connection> {
        self.state.read().connections.values().cloned().collect()
    }

    /// Get a connection by ID
    pub fn connection(&self, id: ConnectionId) -> Option<Connection> {
        self.state.read().connections.get(&id).cloned()
    }

    /// Find the connection linking `from` to `to`
    pub fn find(&self, from: &TaskId, to: &TaskId) -> Option<Connection> {
        self.state
            .read()
            .connections
            .values()
            .find(|c| c.links(from, to))
            .cloned()
    }

    /// Number of connections, optimistic ones included
    pub fn connection_count(&self) -> usize {
        self.state.read().connections.len()
    }

    /// Whether a mutation on this connection is awaiting persistence
    pub fn is_pending(&self, id: ConnectionId) -> bool {
        self.state.read().pending.contains(&id)
    }

    /// Monotonic counter bumped on every in-memory change
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Incoming and outgoing connections of a task
    pub fn connections_for(&self, task: &TaskId) -> ConnectionsFor {
        let state = self.state.read();
        let mut result = ConnectionsFor::default();
        for connection in state.connections.values().filter(|c| c.involves_task(task)) {
            if connection.to_id == *task {
                result.incoming.push(connection.clone());
            }
            if connection.from_id == *task {
                result.outgoing.push(connection.clone());
            }
        }
        result
    }

    /// Connection counts for badges
    pub fn summary(&self) -> ConnectionSummary {
        let state = self.state.read();
        let mut per_task: IndexMap<TaskId, TaskConnectionCount> = IndexMap::new();
        for connection in state.connections.values() {
            per_task.entry(connection.from_id.clone()).or_default().outgoing += 1;
            per_task.entry(connection.to_id.clone()).or_default().incoming += 1;
        }
        ConnectionSummary {
            total: state.connections.len(),
            pending: state.pending.len(),
            per_task,
        }
    }

    /// Check a prospective connection without creating it.
    ///
    /// Runs only the structural checks; the custom rule is consulted by
    /// [`Self::create_connection`].
    pub fn can_connect(&self, from: &TaskId, to: &TaskId) -> Result<(), ValidationError> {
        self.state.read().validate(&self.config, from, to)
    }

    // --- Mutations ---

    /// Replace every connection, e.g. after the host reloads its data.
    ///
    /// The loaded set is trusted. Duplicated pairs keep their first
    /// occurrence. Rollbacks of mutations started before the reload are
    /// discarded.
    pub fn replace_all(&self, connections: impl IntoIterator<Item = Connection>) {
        let mut map: IndexMap<ConnectionId, Connection> = IndexMap::new();
        let mut seen: HashSet<(TaskId, TaskId)> = HashSet::new();
        for connection in connections {
            if !seen.insert((connection.from_id.clone(), connection.to_id.clone())) {
                tracing::warn!(
                    "Dropping duplicate connection {} -> {} on load",
                    connection.from_id,
                    connection.to_id
                );
                continue;
            }
            map.insert(connection.id, connection);
        }

        if validation::has_cycle(map.values().map(|c| (&c.from_id, &c.to_id))) {
            tracing::warn!("Loaded connections contain a dependency cycle");
        }

        let mut state = self.state.write();
        state.connections = map;
        state.pending_deletes.clear();
        state.generation += 1;
        state.touch();
        tracing::debug!("Replaced connection set ({} connections)", state.connections.len());
    }

    /// Create a connection of the given kind
    pub async fn create_connection(
        &self,
        from: &TaskId,
        to: &TaskId,
        kind: DependencyKind,
    ) -> Result<Connection, ConnectionError> {
        self.create_connection_with_points(from, to, kind, None, None).await
    }

    /// Create a connection, caching the connector positions it was drawn at.
    ///
    /// The new edge is visible as soon as validation passes. If the adapter
    /// then fails the edge is removed again and the adapter error returned.
    pub async fn create_connection_with_points(
        &self,
        from: &TaskId,
        to: &TaskId,
        kind: DependencyKind,
        from_point: Option<ScreenPoint>,
        to_point: Option<ScreenPoint>,
    ) -> Result<Connection, ConnectionError> {
        let (from_item, to_item) = {
            let state = self.state.read();
            state.validate(&self.config, from, to)?;
            match (state.tasks.get(from), state.tasks.get(to)) {
                (Some(f), Some(t)) => (f.clone(), t.clone()),
                (None, _) => return Err(ValidationError::TaskNotFound(from.clone()).into()),
                (_, None) => return Err(ValidationError::TaskNotFound(to.clone()).into()),
            }
        };

        if let Err(message) = self.rule.validate(&from_item, &to_item).await {
            tracing::debug!("Custom rule rejected {} -> {}: {}", from, to, message);
            return Err(ValidationError::CustomRuleRejected(message).into());
        }

        let connection = Connection::new(from.clone(), to.clone(), kind).with_points(from_point, to_point);
        let id = connection.id;

        let generation = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            // The graph may have changed while the rule was awaited
            state.validate(&self.config, from, to)?;
            state.connections.insert(id, connection.clone());
            state.pending.insert(id);
            state.touch();
            state.generation
        };

        let result = self.adapter.on_create(&connection).await;

        let mut guard = self.state.write();
        let state = &mut *guard;
        state.pending.remove(&id);
        match result {
            Ok(()) => {
                tracing::info!("Created {} connection {} -> {}", kind, from, to);
                Ok(connection)
            }
            Err(source) => {
                if state.generation == generation && state.connections.shift_remove(&id).is_some() {
                    state.touch();
                }
                tracing::warn!("Rolled back connection {} -> {}: {}", from, to, source);
                Err(ConnectionError::Persistence { id, source })
            }
        }
    }

    /// Delete a connection; it is reinstated if the adapter fails.
    ///
    /// Until the adapter settles the removed edge still counts for
    /// validation, so nothing created meanwhile can conflict with it.
    pub async fn delete_connection(&self, id: ConnectionId) -> Result<(), ConnectionError> {
        let (index, removed, generation) = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            if state.pending.contains(&id) {
                return Err(ConnectionError::MutationPending(id));
            }
            let Some((index, _, removed)) = state.connections.shift_remove_full(&id) else {
                return Err(ConnectionError::NotFound(id));
            };
            state.pending.insert(id);
            state.pending_deletes.insert(id, removed.clone());
            state.touch();
            (index, removed, state.generation)
        };

        let result = self.adapter.on_delete(id).await;

        let mut guard = self.state.write();
        let state = &mut *guard;
        state.pending.remove(&id);
        state.pending_deletes.shift_remove(&id);
        match result {
            Ok(()) => {
                tracing::info!("Deleted connection {} -> {}", removed.from_id, removed.to_id);
                Ok(())
            }
            Err(source) => {
                if state.generation == generation {
                    let index = index.min(state.connections.len());
                    state.connections.shift_insert(index, id, removed.clone());
                    state.touch();
                }
                tracing::warn!(
                    "Rolled back delete of {} -> {}: {}",
                    removed.from_id,
                    removed.to_id,
                    source
                );
                Err(ConnectionError::Persistence { id, source })
            }
        }
    }

    /// Update a connection's kind, lag or cached points.
    ///
    /// Bumps `updated_at`. The previous version is restored if the adapter
    /// fails.
    pub async fn update_connection(
        &self,
        id: ConnectionId,
        patch: ConnectionPatch,
    ) -> Result<Connection, ConnectionError> {
        let (previous, updated, generation) = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            if state.pending.contains(&id) {
                return Err(ConnectionError::MutationPending(id));
            }
            let connection = state.connections.get_mut(&id).ok_or(ConnectionError::NotFound(id))?;
            let previous = connection.clone();
            connection.apply(&patch);
            connection.updated_at = now_millis().max(previous.updated_at);
            let updated = connection.clone();
            state.pending.insert(id);
            state.touch();
            (previous, updated, state.generation)
        };

        let result = self.adapter.on_update(id, &patch).await;

        let mut guard = self.state.write();
        let state = &mut *guard;
        state.pending.remove(&id);
        match result {
            Ok(()) => {
                tracing::debug!("Updated connection {}", id);
                Ok(updated)
            }
            Err(source) => {
                if state.generation == generation {
                    if let Some(connection) = state.connections.get_mut(&id) {
                        *connection = previous;
                        state.touch();
                    }
                }
                tracing::warn!("Rolled back update of connection {}: {}", id, source);
                Err(ConnectionError::Persistence { id, source })
            }
        }
    }
}

impl Default for ConnectionStore {
    fn default() -> Self {
        Self::new(ConnectionConfig::default())
    }
}

impl std::fmt::Debug for ConnectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ConnectionStore")
            .field("tasks", &state.tasks.len())
            .field("connections", &state.connections.len())
            .field("pending", &state.pending.len())
            .field("config", &self.config)
            .finish()
    }
}
