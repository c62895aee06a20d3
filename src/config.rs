//! Configuration management for the tile server.
//!
//! This module provides the command-line interface:
//! - `serve <ARCHIVE>` starts the HTTP server
//! - `check <ARCHIVE>` opens an archive and reports what the server would serve
//!
//! Every `serve` option can also be set via an environment variable with the
//! `MBTILES_` prefix.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use mbtiles_server::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Check(config) => println!("Checking {}", config.archive.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `MBTILES_HOST` - Server bind address (default: 127.0.0.1)
//! - `MBTILES_PORT` - Server port (default: 8765)
//! - `MBTILES_DEFAULT_ENCODING` - Encoding assumed without a generator marker (default: gzip)
//! - `MBTILES_XYZ_FALLBACK` - Retry lookups with the unflipped row (default: false)
//! - `MBTILES_CACHE_TILES` - Tile cache size, e.g. `64MB` (default: 0, disabled)
//! - `MBTILES_POOL_SIZE` - SQLite connection pool size (default: 8)
//! - `MBTILES_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `MBTILES_CORS_ORIGINS` - Allowed CORS origins, comma-separated
//! - `MBTILES_STATIC_DIR` - Directory served under `/static`

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::archive::DEFAULT_POOL_SIZE;
use crate::tile::TileEncoding;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8765;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// MBTiles Server - serve tiles from an MBTiles archive over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "mbtiles-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve tiles, metadata and the map viewer from an archive.
    Serve(ServeConfig),

    /// Open an archive and print its metadata and tile classification.
    Check(CheckConfig),
}

/// Options for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Path to the `.mbtiles` archive.
    #[arg(env = "MBTILES_ARCHIVE")]
    pub archive: PathBuf,

    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MBTILES_HOST")]
    pub host: String,

    /// Port to listen on (0 picks an ephemeral port).
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MBTILES_PORT")]
    pub port: u16,

    // =========================================================================
    // Archive Configuration
    // =========================================================================
    /// Content-Encoding assumed when the archive's generator options carry
    /// no compression marker (gzip or identity).
    #[arg(long, default_value = "gzip", env = "MBTILES_DEFAULT_ENCODING")]
    pub default_encoding: TileEncoding,

    /// Retry a missing tile using the request row as-is (archives written in
    /// XYZ order instead of TMS).
    #[arg(long, default_value_t = false, env = "MBTILES_XYZ_FALLBACK")]
    pub xyz_fallback: bool,

    /// Number of pooled read-only SQLite connections.
    #[arg(long, default_value_t = DEFAULT_POOL_SIZE, env = "MBTILES_POOL_SIZE")]
    pub pool_size: u32,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// In-memory tile cache size (e.g. `64MB`, `512KB`, `1048576`). 0 disables it.
    #[arg(long, default_value = "0", value_parser = parse_size, env = "MBTILES_CACHE_TILES")]
    pub cache_tiles: usize,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "MBTILES_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // HTTP Surface
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "MBTILES_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Directory of static files served under `/static`.
    #[arg(long, env = "MBTILES_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Do not serve the map viewer at `/`.
    #[arg(long, default_value_t = false)]
    pub no_viewer: bool,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_size == 0 {
            return Err("pool_size must be greater than 0".to_string());
        }

        if let Some(dir) = &self.static_dir {
            if !dir.is_dir() {
                return Err(format!(
                    "static_dir '{}' is not a directory",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Options for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Path to the `.mbtiles` archive.
    pub archive: PathBuf,

    /// Content-Encoding assumed without a compression marker.
    #[arg(long, default_value = "gzip")]
    pub default_encoding: TileEncoding,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Parse a byte size such as `1048576`, `512KB`, `64MB` or `1GB`.
///
/// Units are binary (1KB = 1024 bytes) and case-insensitive.
pub fn parse_size(raw: &str) -> Result<usize, String> {
    let trimmed = raw.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, multiplier) = [("GB", 1usize << 30), ("MB", 1 << 20), ("KB", 1 << 10), ("B", 1)]
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|d| (d.trim(), *mult)))
        .unwrap_or((upper.as_str(), 1));

    let value: usize = digits
        .parse()
        .map_err(|_| format!("invalid size '{}'", trimmed))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("size '{}' is too large", trimmed))
}

// =============================================================================
// Tests
// =============================================================================
