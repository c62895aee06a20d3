//! # MBTiles Server
//!
//! A tile server for MBTiles archives.
//!
//! This library opens an MBTiles file (a SQLite database of map tiles) and
//! serves its tiles and metadata over HTTP. Tile blobs are sent exactly as
//! stored; the server only decides which `Content-Encoding` and
//! `Content-Type` describe them.
//!
//! ## Features
//!
//! - **Read-only archive access**: pooled SQLite connections, XYZ to TMS row flip
//! - **Encoding classification**: generator-option markers plus per-blob gzip detection
//! - **Metadata endpoint**: typed bounds, center, zoom range and vector layer schema
//! - **Optional tile cache**: size-bounded LRU of raw blobs
//! - **Built-in web viewer**: MapLibre GL page for vector and raster archives
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`archive`] - Archive trait, MBTiles reader and metadata parsing
//! - [`tile`] - Coordinates, encoding classification, cache and tile service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use mbtiles_server::{create_router, MbtilesArchive, RouterConfig, TileService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let archive = MbtilesArchive::open("berlin.mbtiles")?;
//!     let router = create_router(TileService::new(archive), RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8765").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod error;
pub mod server;
pub mod tile;

// Re-export commonly used types
pub use archive::{MbtilesArchive, MbtilesOptions, MetadataDocument, MetadataMap, TileArchive};
pub use config::{CheckConfig, Cli, Command, ServeConfig};
pub use error::{ArchiveError, TileError};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use tile::{TileCache, TileCoord, TileEncoding, TileFormat, TileResponse, TileService};
