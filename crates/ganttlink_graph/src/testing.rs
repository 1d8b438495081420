// SPDX-License-Identifier: MIT OR Apache-2.0
//! Adapters and fixtures shared by unit tests.

use crate::adapter::{PersistenceAdapter, PersistenceError};
use crate::config::ConnectionConfig;
use crate::connection::{Connection, ConnectionId, ConnectionPatch};
use crate::store::ConnectionStore;
use crate::task::WorkItem;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

/// Store preloaded with tasks `a`..`e` and `t1`..`t4`
pub fn store_with(config: ConnectionConfig, adapter: Arc<dyn PersistenceAdapter>) -> ConnectionStore {
    let store = ConnectionStore::new(config).with_adapter(adapter);
    store.set_tasks(
        ["a", "b", "c", "d", "e", "t1", "t2", "t3", "t4"]
            .into_iter()
            .map(|id| WorkItem::new(id, id.to_uppercase())),
    );
    store
}

/// An adapter invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(Connection),
    Delete(ConnectionId),
    Update(ConnectionId, ConnectionPatch),
}

/// Records every call; can be told to fail the next one
#[derive(Default)]
pub struct RecordingAdapter {
    calls: Mutex<Vec<Call>>,
    fail_next: Mutex<Option<String>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn record(&self, call: Call) -> Result<(), PersistenceError> {
        self.calls.lock().push(call);
        match self.fail_next.lock().take() {
            Some(message) => Err(PersistenceError::new(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PersistenceAdapter for RecordingAdapter {
    async fn on_create(&self, connection: &Connection) -> Result<(), PersistenceError> {
        self.record(Call::Create(connection.clone()))
    }

    async fn on_delete(&self, id: ConnectionId) -> Result<(), PersistenceError> {
        self.record(Call::Delete(id))
    }

    async fn on_update(&self, id: ConnectionId, patch: &ConnectionPatch) -> Result<(), PersistenceError> {
        self.record(Call::Update(id, patch.clone()))
    }
}

/// Blocks every call until the gate is notified
pub struct GatedAdapter {
    gate: Arc<Notify>,
    fail: bool,
}

impl GatedAdapter {
    pub fn failing(gate: Arc<Notify>) -> Self {
        Self { gate, fail: true }
    }

    pub fn succeeding(gate: Arc<Notify>) -> Self {
        Self { gate, fail: false }
    }

    async fn settle(&self) -> Result<(), PersistenceError> {
        self.gate.notified().await;
        if self.fail {
            Err(PersistenceError::new("rejected"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceAdapter for GatedAdapter {
    async fn on_create(&self, _connection: &Connection) -> Result<(), PersistenceError> {
        self.settle().await
    }

    async fn on_delete(&self, _id: ConnectionId) -> Result<(), PersistenceError> {
        self.settle().await
    }

    async fn on_update(&self, _id: ConnectionId, _patch: &ConnectionPatch) -> Result<(), PersistenceError> {
        self.settle().await
    }
}
