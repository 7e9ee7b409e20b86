//! # World Error Types
//!
//! Errors surfaced by the world engine.
//!
//! Only construction can fail from the caller's point of view. Once a
//! `World` is running, persistence errors are logged and degrade to
//! "not found" or "write skipped".

use std::path::PathBuf;

use strata_core::ChunkCoord;
use thiserror::Error;

/// Errors that can occur in the world engine.
#[derive(Error, Debug)]
pub enum WorldError {
    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A stored chunk could not be decoded.
    #[error("corrupt chunk ({}, {}): {reason}", coord.x, coord.z)]
    CorruptChunk {
        /// The chunk whose file is bad.
        coord: ChunkCoord,
        /// What was wrong with it.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The chunk loader thread could not be started.
    #[error("failed to spawn chunk loader: {0}")]
    LoaderSpawn(#[source] std::io::Error),

    /// The chunk loader thread is gone.
    #[error("chunk loader disconnected")]
    LoaderDisconnected,
}

impl WorldError {
    /// Wraps an I/O error with the path it happened on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
