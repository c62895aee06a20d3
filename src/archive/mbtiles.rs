//! MBTiles (SQLite) archive access.
//!
//! An MBTiles file holds two tables:
//!
//! - `metadata(name TEXT, value TEXT)` with archive-level key/value pairs
//! - `tiles(zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB)`
//!
//! Rows are stored in TMS order (row 0 at the south), so lookups flip the
//! requested XYZ row before querying.
//!
//! Connections are opened read-only and pooled with `r2d2`. Every lookup runs
//! on tokio's blocking pool with its own pooled connection, so concurrent
//! requests read in parallel without blocking the async executor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use r2d2::Pool;
use r2d2_sqlite::rusqlite::types::ValueRef;
use r2d2_sqlite::rusqlite::{Connection, OpenFlags, OptionalExtension};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, trace};

use crate::error::ArchiveError;
use crate::tile::TileCoord;

use super::metadata::MetadataMap;
use super::TileArchive;

/// Default number of pooled read-only connections.
pub const DEFAULT_POOL_SIZE: u32 = 8;

const TILE_QUERY: &str =
    "SELECT tile_data FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3";

const METADATA_QUERY: &str = "SELECT name, value FROM metadata";

/// How long to wait for a pooled connection before giving up.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Options
// =============================================================================

/// Options for opening an MBTiles archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbtilesOptions {
    /// Maximum number of pooled SQLite connections
    pub pool_size: u32,

    /// Retry a missed lookup with the unflipped (XYZ) row
    pub xyz_fallback: bool,
}

impl Default for MbtilesOptions {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            xyz_fallback: false,
        }
    }
}

impl MbtilesOptions {
    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_xyz_fallback(mut self, enabled: bool) -> Self {
        self.xyz_fallback = enabled;
        self
    }
}

// =============================================================================
// Archive Statistics
// =============================================================================

/// Summary of the `tiles` table, used by the `check` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileStats {
    pub tile_count: u64,

    /// `(min, max)` zoom level, or `None` for an empty archive
    pub zoom_range: Option<(u8, u8)>,
}

// =============================================================================
// MbtilesArchive
// =============================================================================

/// A read-only handle to an MBTiles file.
///
/// Metadata is loaded once at open and never reloaded.
pub struct MbtilesArchive {
    path: PathBuf,
    identifier: String,
    pool: Pool<SqliteConnectionManager>,
    metadata: MetadataMap,
    xyz_fallback: bool,
}

impl MbtilesArchive {
    /// Open an archive with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        Self::open_with(path, MbtilesOptions::default())
    }

    /// Open an archive and validate its structure.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::NotFound`] if `path` does not exist
    /// - [`ArchiveError::Corrupt`] if the file is not a SQLite database, lacks
    ///   the `tiles` or `metadata` tables, or has no `format` entry
    pub fn open_with(path: impl AsRef<Path>, options: MbtilesOptions) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening MBTiles archive");

        if !path.exists() {
            return Err(ArchiveError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ArchiveError::corrupt(path, "not a regular file"));
        }

        let manager = SqliteConnectionManager::file(path).with_flags(
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        );
        let pool = Pool::builder()
            .max_size(options.pool_size.max(1))
            .min_idle(Some(1))
            .connection_timeout(CONNECTION_TIMEOUT)
            .build(manager)
            .map_err(|e| ArchiveError::corrupt(path, format!("cannot open database: {}", e)))?;

        let conn = pool
            .get()
            .map_err(|e| ArchiveError::corrupt(path, format!("cannot open database: {}", e)))?;

        validate_schema(&conn, path)?;
        let metadata = load_metadata(&conn, path)?;

        if !metadata.contains_key("format") {
            return Err(ArchiveError::corrupt(
                path,
                "metadata has no 'format' entry",
            ));
        }

        debug!(
            path = %path.display(),
            entries = metadata.len(),
            "Loaded MBTiles metadata"
        );

        Ok(Self {
            path: path.to_path_buf(),
            identifier: path.display().to_string(),
            pool,
            metadata,
            xyz_fallback: options.xyz_fallback,
        })
    }

    /// Path the archive was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count tiles and find the zoom range.
    pub async fn tile_stats(&self) -> Result<TileStats, ArchiveError> {
        let pool = self.pool.clone();

        run_blocking(move || {
            let conn = pool.get().map_err(storage_error)?;
            let (count, min_zoom, max_zoom) = conn
                .query_row(
                    "SELECT COUNT(*), MIN(zoom_level), MAX(zoom_level) FROM tiles",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, Option<i64>>(1)?,
                            row.get::<_, Option<i64>>(2)?,
                        ))
                    },
                )
                .map_err(storage_error)?;

            let zoom_range = match (min_zoom, max_zoom) {
                (Some(min), Some(max)) => Some((clamp_zoom(min), clamp_zoom(max))),
                _ => None,
            };

            Ok(TileStats {
                tile_count: count.max(0) as u64,
                zoom_range,
            })
        })
        .await
    }
}

#[async_trait]
impl TileArchive for MbtilesArchive {
    async fn get_tile(&self, coord: TileCoord) -> Result<Option<Bytes>, ArchiveError> {
        let pool = self.pool.clone();
        let xyz_fallback = self.xyz_fallback;

        run_blocking(move || {
            let conn = pool.get().map_err(storage_error)?;
            let row = coord.tms_row();

            trace!(coord = %coord, tms_row = row, "Querying tile");
            let tile = query_tile(&conn, coord, row)?;

            if tile.is_none() && xyz_fallback && row != coord.y() {
                trace!(coord = %coord, "TMS row missed, retrying with XYZ row");
                return query_tile(&conn, coord, coord.y());
            }

            Ok(tile)
        })
        .await
    }

    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl std::fmt::Debug for MbtilesArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MbtilesArchive")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("xyz_fallback", &self.xyz_fallback)
            .finish()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Check that `tiles` and `metadata` exist and the tile query compiles.
fn validate_schema(conn: &Connection, path: &Path) -> Result<(), ArchiveError> {
    let corrupt = |e: r2d2_sqlite::rusqlite::Error| ArchiveError::corrupt(path, e.to_string());

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name IN ('tiles', 'metadata')",
        )
        .map_err(corrupt)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(corrupt)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(corrupt)?;

    for required in ["tiles", "metadata"] {
        if !names.iter().any(|n| n == required) {
            return Err(ArchiveError::corrupt(
                path,
                format!("missing '{}' table", required),
            ));
        }
    }

    conn.prepare(TILE_QUERY)
        .map_err(|e| ArchiveError::corrupt(path, format!("unusable 'tiles' table: {}", e)))?;

    Ok(())
}

/// Read the whole `metadata` table.
///
/// Values may be stored with any SQLite type. Numbers are rendered as text,
/// rows with a NULL value are skipped, and a non-text name is malformed.
fn load_metadata(conn: &Connection, path: &Path) -> Result<MetadataMap, ArchiveError> {
    let malformed =
        |e: r2d2_sqlite::rusqlite::Error| ArchiveError::corrupt(path, format!("malformed metadata: {}", e));

    let mut stmt = conn.prepare(METADATA_QUERY).map_err(malformed)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, metadata_value(row.get_ref(1)?)))
        })
        .map_err(malformed)?;

    let mut metadata = MetadataMap::new();
    for row in rows {
        match row.map_err(malformed)? {
            (name, Some(value)) => metadata.insert(name, value),
            (name, None) => debug!(name = %name, "Skipping metadata entry with NULL value"),
        }
    }

    Ok(metadata)
}

fn metadata_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(n) => Some(n.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Look up one tile row.
///
/// `tile_data` stored as BLOB or TEXT is returned byte for byte. NULL,
/// numeric and zero-length values count as no tile.
fn query_tile(conn: &Connection, coord: TileCoord, row: u32) -> Result<Option<Bytes>, ArchiveError> {
    let mut stmt = conn.prepare_cached(TILE_QUERY).map_err(storage_error)?;

    let data = stmt
        .query_row([u32::from(coord.z()), coord.x(), row], |r| {
            Ok(match r.get_ref(0)? {
                ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Some(Bytes::copy_from_slice(bytes)),
                ValueRef::Null | ValueRef::Integer(_) | ValueRef::Real(_) => None,
            })
        })
        .optional()
        .map_err(storage_error)?;

    Ok(data.flatten().filter(|tile| !tile.is_empty()))
}

/// Run a blocking SQLite operation off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T, ArchiveError>
where
    F: FnOnce() -> Result<T, ArchiveError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ArchiveError::Storage(format!("read task failed: {}", e)))?
}

fn storage_error(e: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Storage(e.to_string())
}

fn clamp_zoom(z: i64) -> u8 {
    z.clamp(0, u8::MAX as i64) as u8
}

// =============================================================================
// Tests
// =============================================================================
