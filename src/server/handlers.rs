//! HTTP request handlers for the tile API.
//!
//! This module contains the Axum handlers for serving tiles, archive metadata,
//! the viewer page, and health checks.
//!
//! # Endpoints
//!
//! - `GET /tiles/{z}/{x}/{y}` - Serve a tile (y may carry an extension)
//! - `GET /metadata` - Archive metadata
//! - `GET /health` - Health check endpoint
//! - `GET /` - Map viewer

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::archive::{MetadataDocument, TileArchive};
use crate::error::{ArchiveError, TileError};
use crate::tile::TileService;

/// Header reporting whether the tile was served from the blob cache
pub const TILE_CACHE_HIT_HEADER: HeaderName = HeaderName::from_static("x-tile-cache-hit");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<A: TileArchive> {
    /// The tile service for processing tile requests
    pub tile_service: Arc<TileService<A>>,

    /// Cache-Control max-age in seconds for tile responses
    pub cache_max_age: u32,
}

impl<A: TileArchive> AppState<A> {
    /// Create a new application state with the default one hour max-age.
    pub fn new(tile_service: TileService<A>) -> Self {
        Self::with_cache_max_age(tile_service, 3600)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(tile_service: TileService<A>, cache_max_age: u32) -> Self {
        Self {
            tile_service: Arc::new(tile_service),
            cache_max_age,
        }
    }
}

impl<A: TileArchive> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from `/tiles/{z}/{x}/{filename}` where filename is `{y}` or
/// `{y}.{ext}`. Segments are kept as strings so malformed input produces the
/// JSON error body instead of a plain-text extractor rejection.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub z: String,
    pub x: String,
    pub filename: String,
}

impl TilePathParams {
    /// Parse `(z, x, y)`, stripping any extension from the y segment.
    pub fn coordinates(&self) -> Result<(u32, u32, u32), TileError> {
        let y = match self.filename.split_once('.') {
            Some((stem, _ext)) => stem,
            None => &self.filename,
        };
        Ok((
            parse_segment(&self.z)?,
            parse_segment(&self.x)?,
            parse_segment(y)?,
        ))
    }
}

fn parse_segment(segment: &str) -> Result<u32, TileError> {
    segment.parse().map_err(|_| TileError::MalformedPath {
        segment: segment.to_string(),
    })
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "invalid_coordinate", "storage_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert TileError to HTTP response.
///
/// Client errors are logged at WARN and carry their detail in the body.
/// Server errors are logged at ERROR with full detail, but the body only
/// carries a generic message.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            TileError::InvalidZoom { .. } | TileError::InvalidCoordinate { .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_coordinate",
                self.to_string(),
            ),

            TileError::MalformedPath { .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                self.to_string(),
            ),

            TileError::Archive(ArchiveError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "Failed to read tile from archive".to_string(),
            ),

            TileError::Archive(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "archive_error",
                "Tile archive is unavailable".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{z}/{x}/{y}`
///
/// The y segment may carry an extension (`0.pbf`, `0.png`), which is ignored.
///
/// # Response
///
/// - `200 OK`: the stored blob, byte for byte
/// - `400 Bad Request`: malformed or out-of-grid coordinate
/// - `404 Not Found`: no tile at this coordinate (empty body)
/// - `500 Internal Server Error`: archive read failure
///
/// # Headers
///
/// - `Content-Type`: from the archive's `format` metadata
/// - `Content-Encoding: gzip|identity`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Tile-Cache-Hit: true|false`
pub async fn tile_handler<A: TileArchive>(
    State(state): State<AppState<A>>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, TileError> {
    let (z, x, y) = params.coordinates()?;

    let Some(tile) = state.tile_service.get_tile(z, x, y).await? else {
        debug!(z, x, y, "No tile at coordinate");
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let headers = [
        (header::CONTENT_TYPE, tile.content_type().to_string()),
        (header::CONTENT_ENCODING, tile.encoding.header_value().to_string()),
        (
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        ),
        (TILE_CACHE_HIT_HEADER, tile.cache_hit.to_string()),
    ];

    Ok((StatusCode::OK, headers, tile.data).into_response())
}

/// Handle metadata requests.
///
/// # Endpoint
///
/// `GET /metadata`
///
/// # Response
///
/// `200 OK` with the archive's metadata document. Typed fields that failed
/// to parse are omitted rather than failing the request.
pub async fn metadata_handler<A: TileArchive>(
    State(state): State<AppState<A>>,
) -> Json<MetadataDocument> {
    Json(state.tile_service.metadata_document().clone())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Serve the MapLibre viewer page.
///
/// # Endpoint
///
/// `GET /`
pub async fn viewer_handler<A: TileArchive>(State(state): State<AppState<A>>) -> Html<String> {
    let service = &state.tile_service;
    Html(super::viewer::generate_viewer_html(
        service.metadata_document(),
        service.format(),
    ))
}

// =============================================================================
// Tests
// =============================================================================
