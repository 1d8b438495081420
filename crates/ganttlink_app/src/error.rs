// SPDX-License-Identifier: MIT OR Apache-2.0
//! Application errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the host before or after replay
#[derive(Debug, Error)]
pub enum AppError {
    /// Reading or writing a file failed
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A RON file could not be parsed
    #[error("Invalid RON in {}: {source}", path.display())]
    Parse {
        /// File involved
        path: PathBuf,
        /// Parser error
        source: ron::error::SpannedError,
    },

    /// Seeding the connection file failed
    #[error(transparent)]
    Persistence(#[from] ganttlink_graph::PersistenceError),

    /// Output could not be encoded
    #[error("Failed to encode output: {0}")]
    Encode(String),
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;

impl From<ron::Error> for AppError {
    fn from(err: ron::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
