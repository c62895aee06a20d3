//! HTTP server layer.
//!
//! This module provides the HTTP API for serving tiles from an archive.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                  GET /tiles/{z}/{x}/{y}[.ext]                   │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │   viewer    │  │        routes           │  │
//! │  │ (requests)  │  │ (MapLibre)  │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;
mod viewer;

pub use handlers::{
    health_handler, metadata_handler, tile_handler, viewer_handler, AppState, ErrorResponse,
    HealthResponse, TilePathParams, TILE_CACHE_HIT_HEADER,
};
pub use routes::{create_router, RouterConfig};
pub use viewer::generate_viewer_html;
