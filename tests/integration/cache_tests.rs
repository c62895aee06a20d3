//! Tile cache behavior through the HTTP layer.

use std::sync::atomic::Ordering;

use axum::http::StatusCode;

use mbtiles_server::tile::TileService;
use mbtiles_server::{create_router, RouterConfig};

use super::test_utils::{body_bytes, get, gzip_blob, header, raw_blob, MockArchive};

#[tokio::test]
async fn test_second_request_hits_cache() {
    let tile = gzip_blob(b"cached");
    let archive = MockArchive::new("pbf").with_tile(4, 3, 2, &tile);
    let lookups = archive.lookup_counter();
    let service = TileService::new(archive).with_cache_capacity(1024 * 1024);
    let router = create_router(service, RouterConfig::new());

    let first = get(&router, "/tiles/4/3/2").await;
    assert_eq!(header(&first, "x-tile-cache-hit"), Some("false"));
    let first_body = body_bytes(first).await;

    let second = get(&router, "/tiles/4/3/2.pbf").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&second, "x-tile-cache-hit"), Some("true"));
    assert_eq!(header(&second, "content-encoding"), Some("gzip"));
    assert_eq!(body_bytes(second).await, first_body);

    assert_eq!(lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cached_tile_keeps_verified_encoding() {
    let archive = MockArchive::new("pbf").with_tile(0, 0, 0, &raw_blob(b"plain"));
    let service = TileService::new(archive).with_cache_capacity(1024);
    let router = create_router(service, RouterConfig::new());

    get(&router, "/tiles/0/0/0").await;
    let cached = get(&router, "/tiles/0/0/0").await;

    assert_eq!(header(&cached, "x-tile-cache-hit"), Some("true"));
    assert_eq!(header(&cached, "content-encoding"), Some("identity"));
}

#[tokio::test]
async fn test_absent_tiles_not_cached() {
    let archive = MockArchive::new("pbf");
    let lookups = archive.lookup_counter();
    let service = TileService::new(archive).with_cache_capacity(1024);
    let router = create_router(service, RouterConfig::new());

    for _ in 0..3 {
        assert_eq!(get(&router, "/tiles/2/2/2").await.status(), StatusCode::NOT_FOUND);
    }
    assert_eq!(lookups.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_cache_disabled_reads_archive_each_time() {
    let archive = MockArchive::new("pbf").with_tile(1, 1, 1, &gzip_blob(b"x"));
    let lookups = archive.lookup_counter();
    let router = create_router(TileService::new(archive), RouterConfig::new());

    for _ in 0..3 {
        let response = get(&router, "/tiles/1/1/1").await;
        assert_eq!(header(&response, "x-tile-cache-hit"), Some("false"));
    }
    assert_eq!(lookups.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_small_cache_evicts() {
    let archive = MockArchive::new("pbf")
        .with_tile(1, 0, 0, &vec![0xAA; 600])
        .with_tile(1, 1, 0, &vec![0xBB; 600]);
    let lookups = archive.lookup_counter();
    let service = TileService::new(archive).with_cache_capacity(1000);
    let router = create_router(service, RouterConfig::new());

    get(&router, "/tiles/1/0/0").await;
    get(&router, "/tiles/1/1/0").await;
    // First tile was evicted to make room for the second
    let again = get(&router, "/tiles/1/0/0").await;

    assert_eq!(header(&again, "x-tile-cache-hit"), Some("false"));
    assert_eq!(lookups.load(Ordering::SeqCst), 3);
}
