//! Tile archive access.
//!
//! The [`TileArchive`] trait is the seam between the request-handling layer
//! and storage. The server is generic over it, so tests can inject in-memory
//! fixtures while production uses [`MbtilesArchive`].
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! └────────────────────┬────────────────────┘
//!                      │ get_tile / metadata
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           TileArchive Trait             │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            MbtilesArchive               │
//! │   (read-only SQLite, r2d2 pool)         │
//! └─────────────────────────────────────────┘
//! ```

mod mbtiles;
mod metadata;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ArchiveError;
use crate::tile::TileCoord;

pub use mbtiles::{MbtilesArchive, MbtilesOptions, TileStats, DEFAULT_POOL_SIZE};
pub use metadata::{parse_bounds, parse_center, MetadataDocument, MetadataMap};

/// Read-only access to a tiled archive.
///
/// Implementations must allow concurrent `get_tile` calls on a shared
/// reference; the archive is never mutated after it is opened.
#[async_trait]
pub trait TileArchive: Send + Sync + 'static {
    /// Look up the blob stored at `coord`.
    ///
    /// Returns `Ok(None)` when the archive has no tile there. That is the
    /// normal "nothing at this location" case, not an error.
    async fn get_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, ArchiveError>;

    /// Archive-level metadata, loaded once when the archive was opened.
    fn metadata(&self) -> &MetadataMap;

    /// Human-readable identifier for logs (usually the file path).
    fn identifier(&self) -> &str;
}
