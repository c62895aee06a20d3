//! Tile payload formats and their MIME types.

/// Payload format declared by the archive's `format` metadata entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    /// Mapbox Vector Tile (protobuf)
    Pbf,
    Png,
    Jpeg,
    Webp,
    /// Anything else; served as opaque bytes
    Unknown,
}

impl TileFormat {
    /// Parse the MBTiles `format` value.
    ///
    /// Matching is case-insensitive and accepts the common aliases
    /// (`mvt` for `pbf`, `jpeg` for `jpg`).
    pub fn from_metadata(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pbf" | "mvt" => TileFormat::Pbf,
            "png" => TileFormat::Png,
            "jpg" | "jpeg" => TileFormat::Jpeg,
            "webp" => TileFormat::Webp,
            _ => TileFormat::Unknown,
        }
    }

    /// MIME type for the `Content-Type` header.
    pub fn mime_type(&self) -> &'static str {
        match self {
            TileFormat::Pbf => "application/x-protobuf",
            TileFormat::Png => "image/png",
            TileFormat::Jpeg => "image/jpeg",
            TileFormat::Webp => "image/webp",
            TileFormat::Unknown => "application/octet-stream",
        }
    }

    /// Whether the archive holds vector tiles.
    pub fn is_vector(&self) -> bool {
        matches!(self, TileFormat::Pbf)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TileFormat::Pbf => "pbf",
            TileFormat::Png => "png",
            TileFormat::Jpeg => "jpg",
            TileFormat::Webp => "webp",
            TileFormat::Unknown => "unknown",
        }
    }
}
