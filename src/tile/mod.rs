//! Tile service layer.
//!
//! This module turns raw request coordinates into framed tile responses.
//!
//! # Architecture
//!
//! The tile service sits between the HTTP layer and the archive:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileCache   │  │ Encoding check  │  │
//! │  │  (raw blobs, │  │ (archive hint + │  │
//! │  │   optional)  │  │  gzip magic)    │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TileArchive                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: Main entry point for tile requests
//! - [`TileCoord`]: Validated XYZ coordinate with TMS row conversion
//! - [`TileEncoding`]: Content-Encoding of a stored blob
//! - [`TileFormat`]: Payload format declared by the archive
//! - [`TileCache`]: LRU cache for raw blobs with size-based eviction
//!
//! # Example
//!
//! ```
//! use mbtiles_server::tile::{TileCache, TileCoord};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = TileCache::with_capacity(16 * 1024 * 1024);
//!     let coord = TileCoord::new(14, 8803, 5376).unwrap();
//!
//!     assert_eq!(coord.tms_row(), 11007);
//!
//!     if cache.get(&coord).await.is_none() {
//!         cache.put(coord, Bytes::from_static(b"tile")).await;
//!     }
//!     assert!(cache.contains(&coord).await);
//! }
//! ```

mod cache;
mod coord;
pub mod encoding;
mod format;
mod service;

pub use cache::TileCache;
pub use coord::{TileCoord, MAX_ZOOM};
pub use encoding::TileEncoding;
pub use format::TileFormat;
pub use service::{TileResponse, TileService};
