// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection validation and cycle detection.
//!
//! Structural checks run in a fixed order and stop at the first failure:
//! unknown task, self connection, duplicate, fan-out limit, cycle. A custom
//! [`ConnectionRule`] runs last and may reject with its own message.

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::task::{TaskId, WorkItem};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Reason a prospective connection was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// One of the endpoints is not a known task
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Source and target are the same task
    #[error("A task cannot depend on itself")]
    SelfConnectionDisallowed,

    /// The same ordered pair is already connected
    #[error("Duplicate connection: {from} -> {to}")]
    DuplicateConnection {
        /// Predecessor
        from: TaskId,
        /// Successor
        to: TaskId,
    },

    /// Source already has the maximum number of outgoing connections
    #[error("Maximum connections exceeded for {task} (limit {max})")]
    MaxConnectionsExceeded {
        /// Task at its limit
        task: TaskId,
        /// Configured limit
        max: usize,
    },

    /// The connection would close a dependency loop
    #[error("Would create circular dependency: {from} -> {to}")]
    CircularDependency {
        /// Predecessor
        from: TaskId,
        /// Successor
        to: TaskId,
    },

    /// A custom rule refused the connection
    #[error("{0}")]
    CustomRuleRejected(String),
}

/// Domain-specific veto over new connections
#[async_trait]
pub trait ConnectionRule: Send + Sync {
    /// `Err(message)` rejects the connection with that message
    async fn validate(&self, from: &WorkItem, to: &WorkItem) -> Result<(), String>;
}

/// Rule that accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl ConnectionRule for AllowAll {
    async fn validate(&self, _from: &WorkItem, _to: &WorkItem) -> Result<(), String> {
        Ok(())
    }
}

/// Rule backed by a synchronous closure
pub struct FnRule<F>(pub F);

#[async_trait]
impl<F> ConnectionRule for FnRule<F>
where
    F: Fn(&WorkItem, &WorkItem) -> Result<(), String> + Send + Sync,
{
    async fn validate(&self, from: &WorkItem, to: &WorkItem) -> Result<(), String> {
        (self.0)(from, to)
    }
}

/// Run the structural checks for a prospective `from -> to` edge.
///
/// `edges` must include optimistic connections that are still waiting on
/// persistence.
pub fn validate_structure<'a, I>(
    tasks: &IndexMap<TaskId, WorkItem>,
    edges: I,
    config: &ConnectionConfig,
    from: &TaskId,
    to: &TaskId,
) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a Connection>,
{
    for id in [from, to] {
        if !tasks.contains_key(id) {
            return Err(ValidationError::TaskNotFound(id.clone()));
        }
    }

    if !config.allow_self_connection && from == to {
        return Err(ValidationError::SelfConnectionDisallowed);
    }

    let pairs: Vec<(&TaskId, &TaskId)> = edges.into_iter().map(|c| (&c.from_id, &c.to_id)).collect();

    if pairs.iter().any(|(f, t)| *f == from && *t == to) {
        return Err(ValidationError::DuplicateConnection {
            from: from.clone(),
            to: to.clone(),
        });
    }

    let out_degree = pairs.iter().filter(|(f, _)| *f == from).count();
    if out_degree >= config.max_connections_per_task {
        return Err(ValidationError::MaxConnectionsExceeded {
            task: from.clone(),
            max: config.max_connections_per_task,
        });
    }

    if !config.allow_circular_dependencies
        && has_cycle(pairs.iter().copied().chain(std::iter::once((from, to))))
    {
        return Err(ValidationError::CircularDependency {
            from: from.clone(),
            to: to.clone(),
        });
    }

    Ok(())
}

/// Whether the directed graph formed by `edges` contains a cycle.
///
/// Self edges are ignored; whether they are permitted is a separate setting.
/// Every node is visited once and every edge followed once.
pub fn has_cycle<'a, I>(edges: I) -> bool
where
    I: IntoIterator<Item = (&'a TaskId, &'a TaskId)>,
{
    let mut adjacency: IndexMap<&TaskId, Vec<&TaskId>> = IndexMap::new();
    for (from, to) in edges {
        if from == to {
            continue;
        }
        adjacency.entry(from).or_default().push(to);
        adjacency.entry(to).or_default();
    }

    let mut visited = HashSet::new();
    let mut on_stack = HashSet::new();

    adjacency
        .keys()
        .any(|node| !visited.contains(node) && visit(*node, &adjacency, &mut visited, &mut on_stack))
}

/// Depth-first visit; returns true on reaching a node already on the stack.
///
/// Recursion depth equals the longest dependency chain, which stays small
/// for interactively drawn schedules.
fn visit<'a>(
    node: &'a TaskId,
    adjacency: &IndexMap<&'a TaskId, Vec<&'a TaskId>>,
    visited: &mut HashSet<&'a TaskId>,
    on_stack: &mut HashSet<&'a TaskId>,
) -> bool {
    if on_stack.contains(node) {
        return true;
    }
    if visited.contains(node) {
        return false;
    }

    on_stack.insert(node);
    if let Some(successors) = adjacency.get(node) {
        for next in successors {
            if visit(*next, adjacency, visited, on_stack) {
                return true;
            }
        }
    }
    on_stack.remove(node);
    visited.insert(node);

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::DependencyKind;
    use proptest::prelude::*;

    fn tasks(ids: &[&str]) -> IndexMap<TaskId, WorkItem> {
        ids.iter()
            .map(|id| (TaskId::from(*id), WorkItem::new(*id, id.to_uppercase())))
            .collect()
    }

    fn edge(from: &str, to: &str) -> Connection {
        Connection::new(from.into(), to.into(), DependencyKind::FinishToStart)
    }

    fn check(edges: &[Connection], config: &ConnectionConfig, from: &str, to: &str) -> Result<(), ValidationError> {
        let tasks = tasks(&["a", "b", "c", "d", "e"]);
        validate_structure(&tasks, edges, config, &from.into(), &to.into())
    }

    #[test]
    fn test_unknown_task() {
        let config = ConnectionConfig::default();
        assert_eq!(
            check(&[], &config, "a", "zzz"),
            Err(ValidationError::TaskNotFound("zzz".into()))
        );
        assert_eq!(
            check(&[], &config, "zzz", "a"),
            Err(ValidationError::TaskNotFound("zzz".into()))
        );
    }

    #[test]
    fn test_self_connection_gating() {
        let config = ConnectionConfig::default();
        assert_eq!(check(&[], &config, "a", "a"), Err(ValidationError::SelfConnectionDisallowed));

        let config = config.with_self_connection(true);
        assert_eq!(check(&[], &config, "a", "a"), Ok(()));
    }

    #[test]
    fn test_duplicate_checked_before_limit() {
        let config = ConnectionConfig::default().with_max_connections_per_task(1);
        let edges = [edge("a", "b")];
        assert!(matches!(
            check(&edges, &config, "a", "b"),
            Err(ValidationError::DuplicateConnection { .. })
        ));
        assert!(matches!(
            check(&edges, &config, "a", "c"),
            Err(ValidationError::MaxConnectionsExceeded { max: 1, .. })
        ));
        // Reverse direction is a different pair; it fails on the cycle instead
        assert!(matches!(
            check(&edges, &ConnectionConfig::default(), "b", "a"),
            Err(ValidationError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_transitive_cycle() {
        let config = ConnectionConfig::default();
        let edges = [edge("a", "b"), edge("b", "c"), edge("c", "d")];
        assert!(matches!(
            check(&edges, &config, "d", "a"),
            Err(ValidationError::CircularDependency { .. })
        ));
        assert_eq!(check(&edges, &config, "a", "d"), Ok(()));
        assert_eq!(check(&edges, &config, "e", "a"), Ok(()));

        let config = config.with_circular_dependencies(true);
        assert_eq!(check(&edges, &config, "d", "a"), Ok(()));
    }

    #[test]
    fn test_cycle_elsewhere_in_graph() {
        // A loop among unrelated nodes is reported even though the new edge
        // does not touch it.
        let edges = [edge("c", "d"), edge("d", "c")];
        assert!(matches!(
            check(&edges, &ConnectionConfig::default(), "a", "b"),
            Err(ValidationError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_long_chain() {
        let ids: Vec<TaskId> = (0..2_000).map(|i| TaskId::from(format!("t{i}"))).collect();
        let mut edges: Vec<(&TaskId, &TaskId)> = ids.windows(2).map(|w| (&w[0], &w[1])).collect();
        assert!(!has_cycle(edges.iter().copied()));

        edges.push((&ids[ids.len() - 1], &ids[0]));
        assert!(has_cycle(edges));
    }

    #[test]
    fn test_has_cycle_ignores_self_edges() {
        let a = TaskId::from("a");
        let b = TaskId::from("b");
        assert!(!has_cycle([(&a, &a)]));
        assert!(!has_cycle([(&a, &b), (&a, &a)]));
        assert!(has_cycle([(&a, &b), (&b, &a)]));
    }

    #[tokio::test]
    async fn test_fn_rule() {
        let rule = FnRule(|from: &WorkItem, to: &WorkItem| {
            if from.status.as_deref() == Some("done") && to.status.as_deref() == Some("done") {
                Err("Completed tasks cannot be linked".to_string())
            } else {
                Ok(())
            }
        });
        let done_a = WorkItem::new("a", "A").with_status("done");
        let done_b = WorkItem::new("b", "B").with_status("done");
        let open_c = WorkItem::new("c", "C");

        assert!(rule.validate(&done_a, &done_b).await.is_err());
        assert!(rule.validate(&done_a, &open_c).await.is_ok());
        assert!(AllowAll.validate(&done_a, &done_b).await.is_ok());
    }

    proptest! {
        #[test]
        fn prop_accepted_edges_stay_acyclic(attempts in prop::collection::vec((0usize..6, 0usize..6), 0..40)) {
            let names = ["t0", "t1", "t2", "t3", "t4", "t5"];
            let tasks = tasks(&names);
            let config = ConnectionConfig::default().with_max_connections_per_task(6);
            let mut accepted: Vec<Connection> = Vec::new();

            for (from, to) in attempts {
                let (from, to) = (TaskId::from(names[from]), TaskId::from(names[to]));
                if validate_structure(&tasks, &accepted, &config, &from, &to).is_ok() {
                    accepted.push(Connection::new(from, to, DependencyKind::FinishToStart));
                }
            }

            prop_assert!(!has_cycle(accepted.iter().map(|c| (&c.from_id, &c.to_id))));
        }
    }
}
