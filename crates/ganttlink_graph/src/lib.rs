// SPDX-License-Identifier: MIT OR Apache-2.0
//! Task dependency graph for Gantt surfaces.
//!
//! This crate owns the dependency edges between scheduled tasks and the
//! drag-to-connect interaction that creates them:
//! - Connection store with optimistic mutations and rollback
//! - Validation (unknown tasks, self links, duplicates, fan-out, cycles)
//! - Pluggable persistence adapter and custom rules
//! - Connector geometry resolution
//! - Interactive connection state machine
//!
//! ## Architecture
//!
//! The host surface owns layout and rendering. It feeds pointer gestures
//! into a [`ConnectionController`], supplies connector positions through a
//! [`GeometryResolver`], and reads the live edge set, the in-progress drag,
//! and the current error back out for drawing.

pub mod adapter;
pub mod config;
pub mod connection;
pub mod geometry;
pub mod interaction;
pub mod status;
pub mod store;
pub mod task;
pub mod validation;

#[cfg(test)]
mod testing;

pub use adapter::{NoopAdapter, PersistenceAdapter, PersistenceError};
pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionId, ConnectionPatch, DependencyKind};
pub use geometry::{BoundsResolver, ConnectorRole, GeometryResolver, ScreenPoint};
pub use interaction::{CompletionOutcome, ConnectMode, ConnectionController, ConnectionDrag};
pub use status::ErrorDisplay;
pub use store::{ConnectionError, ConnectionStore, ConnectionSummary, ConnectionsFor, TaskConnectionCount};
pub use task::{TaskId, WorkItem};
pub use validation::{AllowAll, ConnectionRule, FnRule, ValidationError};
