//! MBTiles Server - serve tiles from an MBTiles archive over HTTP.
//!
//! This binary parses the command line, opens the archive and starts the
//! HTTP server.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mbtiles_server::{
    archive::{MbtilesArchive, MbtilesOptions, TileArchive},
    config::{CheckConfig, Cli, Command, ServeConfig},
    server::{create_router, RouterConfig},
    tile::{encoding, TileEncoding, TileFormat, TileService},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("mbtiles-server v{}", env!("CARGO_PKG_VERSION"));

    let options = MbtilesOptions::default()
        .with_pool_size(config.pool_size)
        .with_xyz_fallback(config.xyz_fallback);

    let archive = match MbtilesArchive::open_with(&config.archive, options) {
        Ok(archive) => archive,
        Err(e) => {
            error!("Failed to open archive: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tile_service = TileService::new(archive)
        .with_default_encoding(config.default_encoding)
        .with_cache_capacity(config.cache_tiles);

    info!("Configuration:");
    info!("  Archive: {}", config.archive.display());
    info!("  Format: {}", tile_service.format().name());
    info!("  Content-Encoding: {}", tile_service.encoding_hint());
    if config.xyz_fallback {
        info!("  XYZ row fallback: enabled");
    }
    if config.cache_tiles > 0 {
        info!("  Tile cache: {} KB", config.cache_tiles / 1024);
    } else {
        info!("  Tile cache: disabled");
    }
    if tile_service.format() == TileFormat::Unknown {
        warn!("  Unrecognized tile format, serving as application/octet-stream");
    }

    let router_config = build_router_config(&config);
    let router = create_router(tile_service, router_config);

    let addr = config.bind_address();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let local_addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or(addr);

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", local_addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", local_addr);
    info!("    curl http://{}/metadata", local_addr);
    info!("    curl http://{}/tiles/0/0/0", local_addr);
    if !config.no_viewer {
        info!("");
        info!("  View the map in your browser:");
        info!("    open http://{}/", local_addr);
    }
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "mbtiles_server=debug,tower_http=debug"
    } else {
        "mbtiles_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing)
        .with_viewer(!config.no_viewer);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    if let Some(ref dir) = config.static_dir {
        router_config = router_config.with_static_dir(dir.clone());
    }

    router_config
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("MBTiles Archive Check");
    println!("═════════════════════");
    println!();

    let archive = match MbtilesArchive::open(&config.archive) {
        Ok(archive) => {
            println!("✓ Archive: {}", config.archive.display());
            archive
        }
        Err(e) => {
            println!("✗ Archive: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let metadata = archive.metadata();
    let format = metadata
        .get("format")
        .map(TileFormat::from_metadata)
        .unwrap_or(TileFormat::Unknown);
    let encoding = encoding::resolve(metadata, config.default_encoding);

    println!("✓ Format: {} ({})", format.name(), format.mime_type());
    println!("✓ Content-Encoding: {}", encoding);
    if encoding == TileEncoding::Identity && config.default_encoding == TileEncoding::Gzip {
        println!("  (generator options mark tiles as uncompressed)");
    }
    println!();

    println!("Metadata:");
    println!("─────────");
    for (key, value) in metadata.iter() {
        if key == "json" {
            println!("  {:<18} <{} bytes>", key, value.len());
        } else {
            println!("  {:<18} {}", key, value);
        }
    }
    println!();

    match archive.tile_stats().await {
        Ok(stats) => {
            println!("Tiles: {}", stats.tile_count);
            if let Some((min, max)) = stats.zoom_range {
                println!("Zoom levels: {}-{}", min, max);
            }
        }
        Err(e) => {
            println!("✗ Failed to read tile statistics: {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!();
    println!("═════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
