use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening or reading a tile archive
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// Archive file does not exist
    #[error("Archive not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// File is not a valid archive, or lacks required tables or metadata
    #[error("Corrupt archive {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Storage-level failure while reading an otherwise valid archive
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ArchiveError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ArchiveError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while serving a tile request
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Zoom level is beyond what the tile grid can address
    #[error("Invalid zoom level: {z} (max {max})")]
    InvalidZoom { z: u32, max: u8 },

    /// Column or row lies outside the 2^z x 2^z grid
    #[error("Tile coordinate {z}/{x}/{y} is outside the grid (valid range: 0-{max})")]
    InvalidCoordinate { z: u8, x: u32, y: u32, max: u32 },

    /// Path segment is not a tile coordinate at all
    #[error("Malformed tile path segment: {segment}")]
    MalformedPath { segment: String },

    /// Failure reported by the archive
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
