// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistence adapters used by the host.
//!
//! [`RonFileAdapter`] mirrors the connection set into a RON file, rewriting
//! it after every change. [`RejectingAdapter`] fails everything, which shows
//! the store's rollback path.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use ganttlink_graph::{Connection, ConnectionId, ConnectionPatch, PersistenceAdapter, PersistenceError};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Stores connections in a RON file
#[derive(Debug)]
pub struct RonFileAdapter {
    path: PathBuf,
    persisted: Mutex<Vec<Connection>>,
}

impl RonFileAdapter {
    /// Open a connection file, returning the adapter and the stored connections.
    ///
    /// A missing file is treated as an empty set.
    pub async fn open(path: impl Into<PathBuf>) -> Result<(Self, Vec<Connection>)> {
        let path = path.into();
        let connections = match tokio::fs::read_to_string(&path).await {
            Ok(text) => ron::from_str::<Vec<Connection>>(&text).map_err(|source| AppError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(AppError::Io { path, source }),
        };

        tracing::info!("Opened connection file {:?} ({} connections)", path, connections.len());
        let adapter = Self {
            path,
            persisted: Mutex::new(connections.clone()),
        };
        Ok((adapter, connections))
    }

    /// File backing this adapter
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored set, e.g. after seeding from a scenario
    pub async fn overwrite(&self, connections: Vec<Connection>) -> std::result::Result<(), PersistenceError> {
        let mut persisted = self.persisted.lock().await;
        self.write(&connections).await?;
        *persisted = connections;
        Ok(())
    }

    async fn write(&self, connections: &[Connection]) -> std::result::Result<(), PersistenceError> {
        let text = ron::ser::to_string_pretty(connections, ron::ser::PrettyConfig::default())
            .map_err(|err| PersistenceError::new(err.to_string()))?;
        tokio::fs::write(&self.path, text).await?;
        Ok(())
    }

    /// Apply `change` to a copy of the stored set and commit it once written
    async fn commit<F>(&self, change: F) -> std::result::Result<(), PersistenceError>
    where
        F: FnOnce(&mut Vec<Connection>) -> std::result::Result<(), PersistenceError> + Send,
    {
        let mut persisted = self.persisted.lock().await;
        let mut next = persisted.clone();
        change(&mut next)?;
        self.write(&next).await?;
        *persisted = next;
        Ok(())
    }
}

#[async_trait]
impl PersistenceAdapter for RonFileAdapter {
    async fn on_create(&self, connection: &Connection) -> std::result::Result<(), PersistenceError> {
        let connection = connection.clone();
        self.commit(move |set| {
            set.push(connection);
            Ok(())
        })
        .await
    }

    async fn on_delete(&self, id: ConnectionId) -> std::result::Result<(), PersistenceError> {
        self.commit(move |set| {
            let before = set.len();
            set.retain(|c| c.id != id);
            if set.len() == before {
                return Err(PersistenceError::new(format!("Connection {id} is not stored")));
            }
            Ok(())
        })
        .await
    }

    async fn on_update(&self, id: ConnectionId, patch: &ConnectionPatch) -> std::result::Result<(), PersistenceError> {
        let patch = patch.clone();
        self.commit(move |set| {
            let connection = set
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| PersistenceError::new(format!("Connection {id} is not stored")))?;
            connection.apply(&patch);
            connection.updated_at = ganttlink_graph::connection::now_millis();
            Ok(())
        })
        .await
    }
}

/// Fails every call with the same message
#[derive(Debug, Clone)]
pub struct RejectingAdapter {
    message: String,
}

impl RejectingAdapter {
    /// Create an adapter that always fails with `message`
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn reject(&self) -> std::result::Result<(), PersistenceError> {
        tracing::debug!("Rejecting persistence call: {}", self.message);
        Err(PersistenceError::new(self.message.clone()))
    }
}

#[async_trait]
impl PersistenceAdapter for RejectingAdapter {
    async fn on_create(&self, _connection: &Connection) -> std::result::Result<(), PersistenceError> {
        self.reject()
    }

    async fn on_delete(&self, _id: ConnectionId) -> std::result::Result<(), PersistenceError> {
        self.reject()
    }

    async fn on_update(&self, _id: ConnectionId, _patch: &ConnectionPatch) -> std::result::Result<(), PersistenceError> {
        self.reject()
    }
}
