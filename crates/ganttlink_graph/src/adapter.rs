// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistence boundary for connection mutations.
//!
//! The store applies every change in memory first and then awaits exactly
//! one adapter callback. Any error returned here rolls the in-memory change
//! back. Adapters are never retried.

use crate::connection::{Connection, ConnectionId, ConnectionPatch};
use async_trait::async_trait;

/// Failure reported by a persistence adapter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Persistence failed: {message}")]
pub struct PersistenceError {
    /// Human-readable reason
    pub message: String,
}

impl PersistenceError {
    /// Create an error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Callbacks invoked after an optimistic mutation.
///
/// All methods default to succeeding without doing anything.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// A connection was created
    async fn on_create(&self, _connection: &Connection) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// A connection was deleted
    async fn on_delete(&self, _id: ConnectionId) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// A connection was updated
    async fn on_update(&self, _id: ConnectionId, _patch: &ConnectionPatch) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Local-only graph; nothing is persisted
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAdapter;

#[async_trait]
impl PersistenceAdapter for NoopAdapter {}
