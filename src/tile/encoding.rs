//! Content-Encoding resolution for stored tile blobs.
//!
//! MBTiles does not record tile compression as a structured field. Archives
//! built by tippecanoe record the command line in `generator_options`, and
//! the `-pC` flag there means tiles were written without gzip. Anything else
//! follows the tool default, which is gzip for vector tiles.
//!
//! Resolution happens in two explicit stages:
//!
//! 1. [`resolve`] classifies the archive once from its metadata.
//! 2. [`verify`] checks each blob's leading bytes and downgrades a `gzip`
//!    hint to `identity` when the gzip magic is missing, so a misclassified
//!    archive never produces a body that clients fail to decompress.

use std::fmt;
use std::str::FromStr;

use crate::archive::MetadataMap;

/// Leading bytes of every gzip member (RFC 1952).
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Metadata keys that may carry the generator command line.
pub const GENERATOR_OPTION_KEYS: [&str; 2] = ["generator_options", "generator_opts"];

/// Long form of tippecanoe's `-pC`.
const NO_TILE_COMPRESSION_FLAG: &str = "--no-tile-compression";

/// Transport encoding of a tile blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TileEncoding {
    #[default]
    Gzip,
    Identity,
}

impl TileEncoding {
    /// Value for the `Content-Encoding` header.
    pub fn header_value(&self) -> &'static str {
        match self {
            TileEncoding::Gzip => "gzip",
            TileEncoding::Identity => "identity",
        }
    }
}

impl fmt::Display for TileEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_value())
    }
}

impl FromStr for TileEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gzip" => Ok(TileEncoding::Gzip),
            "identity" | "none" => Ok(TileEncoding::Identity),
            other => Err(format!(
                "unknown encoding '{}' (expected 'gzip' or 'identity')",
                other
            )),
        }
    }
}

/// Classify an archive's tile encoding from its metadata.
///
/// Returns [`TileEncoding::Identity`] when the generator options carry the
/// uncompressed-output flag, and `default` otherwise. `default` covers both
/// missing and unrecognised generator strings.
pub fn resolve(metadata: &MetadataMap, default: TileEncoding) -> TileEncoding {
    let marked = GENERATOR_OPTION_KEYS
        .iter()
        .filter_map(|key| metadata.get(key))
        .any(has_uncompressed_marker);

    if marked {
        TileEncoding::Identity
    } else {
        default
    }
}

/// Check a blob against the archive hint.
///
/// A `gzip` hint only survives when the blob starts with [`GZIP_MAGIC`].
/// An `identity` hint is never upgraded.
pub fn verify(hint: TileEncoding, blob: &[u8]) -> TileEncoding {
    match hint {
        TileEncoding::Gzip if is_gzip(blob) => TileEncoding::Gzip,
        _ => TileEncoding::Identity,
    }
}

/// Whether `blob` begins with the gzip magic bytes.
pub fn is_gzip(blob: &[u8]) -> bool {
    blob.starts_with(&GZIP_MAGIC)
}

/// Scan a free-text generator string for the uncompressed-output flag.
///
/// Recognised forms: `-pC`, combined short flags such as `-pkC`, `-p C`
/// split over two tokens, and `--no-tile-compression`. Options may be
/// separated by whitespace, `;` or `,`.
pub fn has_uncompressed_marker(options: &str) -> bool {
    let mut tokens = options
        .split(|c: char| c.is_whitespace() || c == ';' || c == ',')
        .map(|t| t.trim_matches(|c| c == '"' || c == '\''))
        .filter(|t| !t.is_empty())
        .peekable();

    while let Some(token) = tokens.next() {
        if token == NO_TILE_COMPRESSION_FLAG {
            return true;
        }

        if token == "-p" {
            if let Some(next) = tokens.peek() {
                if is_option_letters(next) && next.contains('C') {
                    return true;
                }
            }
            continue;
        }

        if let Some(letters) = token.strip_prefix("-p") {
            if is_option_letters(letters) && letters.contains('C') {
                return true;
            }
        }
    }

    false
}

fn is_option_letters(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

// =============================================================================
// Tests
// =============================================================================
