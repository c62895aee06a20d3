//! Tile Service for resolving tile requests against an archive.
//!
//! The TileService is the main entry point for tile requests. It orchestrates:
//! - Coordinate validation
//! - Cache lookups (when a cache is configured)
//! - Blob lookup via the archive
//! - Content-Encoding selection (archive hint + per-blob verification)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Validate coordinate   3. Read blob from archive     │    │
//! │  │  2. Check cache           4. Verify encoding & return   │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌───────────┐      ┌──────────────┐    ┌──────────────────┐  │
//! │    │ TileCache │      │ TileArchive  │    │ encoding::verify │  │
//! │    └───────────┘      └──────────────┘    └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::archive::{MetadataDocument, TileArchive};
use crate::error::TileError;

use super::cache::TileCache;
use super::coord::TileCoord;
use super::encoding::{self, TileEncoding};
use super::format::TileFormat;

// =============================================================================
// Tile Response
// =============================================================================

/// A tile found in the archive, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct TileResponse {
    /// The blob exactly as stored
    pub data: Bytes,

    /// Encoding that matches `data`
    pub encoding: TileEncoding,

    /// Payload format declared by the archive
    pub format: TileFormat,

    /// Whether the blob came from the tile cache
    pub cache_hit: bool,
}

impl TileResponse {
    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service for looking up tiles and deciding how to frame them.
///
/// Everything derived from metadata (format, encoding hint, metadata document)
/// is computed once at construction. The archive is immutable, so none of it
/// is ever invalidated.
///
/// # Example
///
/// ```ignore
/// use mbtiles_server::archive::MbtilesArchive;
/// use mbtiles_server::tile::TileService;
///
/// let archive = MbtilesArchive::open("berlin.mbtiles")?;
/// let service = TileService::new(archive);
///
/// if let Some(tile) = service.get_tile(14, 8803, 5376).await? {
///     println!("{} bytes, Content-Encoding: {}", tile.data.len(), tile.encoding);
/// }
/// ```
pub struct TileService<A: TileArchive> {
    archive: Arc<A>,
    format: TileFormat,
    default_encoding: TileEncoding,
    encoding_hint: TileEncoding,
    metadata_document: MetadataDocument,
    cache: Option<TileCache>,
}

impl<A: TileArchive> TileService<A> {
    /// Create a service with the gzip default and no tile cache.
    pub fn new(archive: A) -> Self {
        Self::with_shared_archive(Arc::new(archive))
    }

    /// Create a service over an archive that is shared with other components.
    pub fn with_shared_archive(archive: Arc<A>) -> Self {
        let metadata = archive.metadata();
        let format = metadata
            .get("format")
            .map(TileFormat::from_metadata)
            .unwrap_or(TileFormat::Unknown);
        let default_encoding = TileEncoding::default();
        let encoding_hint = encoding::resolve(metadata, default_encoding);
        let metadata_document = MetadataDocument::from_metadata(metadata);

        debug!(
            archive = archive.identifier(),
            format = format.name(),
            encoding = %encoding_hint,
            "Classified tile archive"
        );

        Self {
            archive,
            format,
            default_encoding,
            encoding_hint,
            metadata_document,
            cache: None,
        }
    }

    /// Set the encoding assumed when the generator options carry no marker.
    pub fn with_default_encoding(mut self, default: TileEncoding) -> Self {
        self.default_encoding = default;
        self.encoding_hint = encoding::resolve(self.archive.metadata(), default);
        self
    }

    /// Enable the blob cache with the given capacity in bytes.
    ///
    /// A capacity of zero disables caching.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = (capacity > 0).then(|| TileCache::with_capacity(capacity));
        self
    }

    /// Get a tile by raw request coordinates.
    ///
    /// Returns `Ok(None)` when the coordinate is valid but holds no tile.
    ///
    /// # Errors
    ///
    /// - [`TileError::InvalidZoom`] / [`TileError::InvalidCoordinate`] when the
    ///   coordinate lies outside the grid; the archive is not queried
    /// - [`TileError::Archive`] when the read fails
    pub async fn get_tile(&self, z: u32, x: u32, y: u32) -> Result<Option<TileResponse>, TileError> {
        let coord = TileCoord::new(z, x, y)?;
        self.get_tile_at(coord).await
    }

    /// Get a tile by validated coordinate.
    pub async fn get_tile_at(&self, coord: TileCoord) -> Result<Option<TileResponse>, TileError> {
        if let Some(cache) = &self.cache {
            if let Some(data) = cache.get(&coord).await {
                trace!(coord = %coord, "Tile cache hit");
                return Ok(Some(self.frame(coord, data, true)));
            }
        }

        let Some(data) = self.archive.get_tile(coord).await? else {
            debug!(coord = %coord, "Tile not present in archive");
            return Ok(None);
        };

        if let Some(cache) = &self.cache {
            cache.put(coord, data.clone()).await;
        }

        Ok(Some(self.frame(coord, data, false)))
    }

    fn frame(&self, coord: TileCoord, data: Bytes, cache_hit: bool) -> TileResponse {
        let encoding = encoding::verify(self.encoding_hint, &data);
        if encoding != self.encoding_hint {
            debug!(
                coord = %coord,
                hint = %self.encoding_hint,
                "Blob lacks gzip magic, serving as identity"
            );
        }

        TileResponse {
            data,
            encoding,
            format: self.format,
            cache_hit,
        }
    }

    /// Encoding classification computed from the archive metadata.
    pub fn encoding_hint(&self) -> TileEncoding {
        self.encoding_hint
    }

    /// Encoding assumed when metadata carries no marker.
    pub fn default_encoding(&self) -> TileEncoding {
        self.default_encoding
    }

    /// Payload format declared by the archive.
    pub fn format(&self) -> TileFormat {
        self.format
    }

    /// Structured metadata for the `/metadata` endpoint.
    pub fn metadata_document(&self) -> &MetadataDocument {
        &self.metadata_document
    }

    /// Get a reference to the underlying archive.
    pub fn archive(&self) -> &Arc<A> {
        &self.archive
    }

    /// Get tile cache statistics as `(current_size, capacity, entry_count)`.
    ///
    /// Returns `None` when caching is disabled.
    pub async fn cache_stats(&self) -> Option<(usize, usize, usize)> {
        let cache = self.cache.as_ref()?;
        Some((cache.size().await, cache.capacity(), cache.len().await))
    }
}

// =============================================================================
// Tests
// =============================================================================
