//! Tile coordinates in XYZ addressing.
//!
//! Requests address tiles the way web maps do: row 0 is the northernmost row.
//! MBTiles stores rows in TMS order (row 0 is the southernmost row), so the
//! archive layer converts with [`TileCoord::tms_row`] before querying.

use std::fmt;

use crate::error::TileError;

/// Highest zoom level accepted. `2^30` still fits comfortably in a `u32`.
pub const MAX_ZOOM: u8 = 30;

/// A validated `(z, x, y)` tile coordinate.
///
/// Construction through [`TileCoord::new`] guarantees `x < 2^z` and `y < 2^z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    z: u8,
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Create a coordinate, rejecting anything outside the `2^z x 2^z` grid.
    pub fn new(z: u32, x: u32, y: u32) -> Result<Self, TileError> {
        if z > MAX_ZOOM as u32 {
            return Err(TileError::InvalidZoom { z, max: MAX_ZOOM });
        }
        let z = z as u8;
        let size = 1u32 << z;

        if x >= size || y >= size {
            return Err(TileError::InvalidCoordinate {
                z,
                x,
                y,
                max: size - 1,
            });
        }

        Ok(Self { z, x, y })
    }

    pub fn z(&self) -> u8 {
        self.z
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    /// Row index in TMS order, as stored in the MBTiles `tiles` table.
    pub fn tms_row(&self) -> u32 {
        (1u32 << self.z) - 1 - self.y
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

// =============================================================================
// Tests
// =============================================================================
