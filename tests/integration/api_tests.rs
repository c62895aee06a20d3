//! API integration tests for tile retrieval and error handling.
//!
//! Tests verify:
//! - Content-Encoding and Content-Type for vector and raster archives
//! - Row conversion against real SQLite archives
//! - Error cases (invalid coordinates, absent tiles, storage failures)
//! - Health, viewer and static routes

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use axum::Router;

use mbtiles_server::archive::{MbtilesArchive, MbtilesOptions};
use mbtiles_server::error::ArchiveError;
use mbtiles_server::tile::{TileEncoding, TileService};
use mbtiles_server::{create_router, RouterConfig};

use super::test_utils::{
    body_bytes, body_json, gzip_blob, get, header, png_blob, raw_blob, MbtilesFixture, MockArchive,
};

fn router_for(archive: MbtilesArchive) -> Router {
    create_router(TileService::new(archive), RouterConfig::new())
}

// =============================================================================
// Content Negotiation
// =============================================================================

#[tokio::test]
async fn test_uncompressed_archive_serves_identity() {
    let tile = raw_blob(b"roads");
    let fixture = MbtilesFixture::new("pbf")
        .with_metadata("generator_options", "tippecanoe -o out.mbtiles -zg -pC")
        .with_tile(0, 0, 0, &tile)
        .write();
    let router = router_for(fixture.open());

    let response = get(&router, "/tiles/0/0/0").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-encoding"), Some("identity"));
    assert_eq!(
        header(&response, "content-type"),
        Some("application/x-protobuf")
    );
    assert_eq!(body_bytes(response).await.as_ref(), tile.as_slice());
}

#[tokio::test]
async fn test_compressed_archive_serves_gzip() {
    let tile = gzip_blob(b"compressed roads");
    let fixture = MbtilesFixture::new("pbf")
        .with_metadata("generator_options", "tippecanoe -o out.mbtiles -zg")
        .with_tile(14, 8803, 5376, &tile)
        .write();
    let router = router_for(fixture.open());

    let response = get(&router, "/tiles/14/8803/5376").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-encoding"), Some("gzip"));
    assert_eq!(
        header(&response, "content-type"),
        Some("application/x-protobuf")
    );
    assert_eq!(
        header(&response, "cache-control"),
        Some("public, max-age=3600")
    );
    assert_eq!(header(&response, "x-tile-cache-hit"), Some("false"));
    // Blob is passed through untouched, gzip header included
    assert_eq!(body_bytes(response).await.as_ref(), tile.as_slice());
}

#[tokio::test]
async fn test_gzip_hint_downgraded_for_plain_blob() {
    let fixture = MbtilesFixture::new("pbf")
        .with_tile(1, 0, 0, &gzip_blob(b"a"))
        .with_tile(1, 1, 0, &raw_blob(b"b"))
        .write();
    let router = router_for(fixture.open());

    let gz = get(&router, "/tiles/1/0/0").await;
    let raw = get(&router, "/tiles/1/1/0").await;

    assert_eq!(header(&gz, "content-encoding"), Some("gzip"));
    assert_eq!(header(&raw, "content-encoding"), Some("identity"));
}

#[tokio::test]
async fn test_default_encoding_identity() {
    let tile = gzip_blob(b"x");
    let fixture = MbtilesFixture::new("pbf").with_tile(0, 0, 0, &tile).write();
    let service = TileService::new(fixture.open()).with_default_encoding(TileEncoding::Identity);
    let router = create_router(service, RouterConfig::new());

    let response = get(&router, "/tiles/0/0/0").await;
    assert_eq!(header(&response, "content-encoding"), Some("identity"));
}

#[tokio::test]
async fn test_raster_archive() {
    let tile = png_blob();
    let fixture = MbtilesFixture::new("png").with_tile(2, 1, 3, &tile).write();
    let router = router_for(fixture.open());

    let response = get(&router, "/tiles/2/1/3.png").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), Some("image/png"));
    assert_eq!(header(&response, "content-encoding"), Some("identity"));
    assert_eq!(body_bytes(response).await.as_ref(), tile.as_slice());
}

#[tokio::test]
async fn test_unknown_format_is_octet_stream() {
    let fixture = MbtilesFixture::new("geojson")
        .with_tile(0, 0, 0, b"{}")
        .write();
    let router = router_for(fixture.open());

    let response = get(&router, "/tiles/0/0/0").await;
    assert_eq!(
        header(&response, "content-type"),
        Some("application/octet-stream")
    );
}

// =============================================================================
// Path Handling
// =============================================================================

#[tokio::test]
async fn test_extension_is_stripped() {
    let tile = gzip_blob(b"ext");
    let fixture = MbtilesFixture::new("pbf").with_tile(3, 4, 5, &tile).write();
    let router = router_for(fixture.open());

    for uri in ["/tiles/3/4/5", "/tiles/3/4/5.pbf", "/tiles/3/4/5.mvt"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::OK, "uri {}", uri);
        assert_eq!(body_bytes(response).await.as_ref(), tile.as_slice());
    }
}

#[tokio::test]
async fn test_rows_are_flipped() {
    // z=2: XYZ row 0 lives at TMS row 3
    let fixture = MbtilesFixture::new("pbf")
        .with_raw_row(2, 1, 3, b"top")
        .with_raw_row(2, 1, 0, b"bottom")
        .write();
    let router = router_for(fixture.open());

    assert_eq!(body_bytes(get(&router, "/tiles/2/1/0").await).await.as_ref(), b"top");
    assert_eq!(body_bytes(get(&router, "/tiles/2/1/3").await).await.as_ref(), b"bottom");
}

#[tokio::test]
async fn test_xyz_fallback() {
    // Stored in XYZ order by mistake: row 1 at z=3 is TMS row 6
    let fixture = MbtilesFixture::new("pbf").with_raw_row(3, 2, 1, b"xyz").write();

    let strict = router_for(fixture.open());
    assert_eq!(get(&strict, "/tiles/3/2/1").await.status(), StatusCode::NOT_FOUND);

    let lenient = router_for(fixture.open_with(MbtilesOptions::default().with_xyz_fallback(true)));
    let response = get(&lenient, "/tiles/3/2/1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), b"xyz");
}

// =============================================================================
// Error Handling
// =============================================================================

#[tokio::test]
async fn test_out_of_grid_coordinate() {
    let archive = MockArchive::new("pbf");
    let lookups = archive.lookup_counter();
    let router = create_router(TileService::new(archive), RouterConfig::new());

    let response = get(&router, "/tiles/5/999999/0").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_coordinate");
    assert_eq!(json["status"], 400);
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zoom_too_large() {
    let archive = MockArchive::new("pbf");
    let lookups = archive.lookup_counter();
    let router = create_router(TileService::new(archive), RouterConfig::new());

    let response = get(&router, "/tiles/31/0/0").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_coordinate");
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_segments() {
    let router = create_router(TileService::new(MockArchive::new("pbf")), RouterConfig::new());

    for uri in ["/tiles/a/0/0", "/tiles/0/-1/0", "/tiles/0/0/zero.pbf"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri {}", uri);
        assert_eq!(body_json(response).await["error"], "invalid_request");
    }
}

#[tokio::test]
async fn test_absent_tile_is_empty_404() {
    let fixture = MbtilesFixture::new("pbf").with_tile(0, 0, 0, b"only").write();
    let router = router_for(fixture.open());

    let response = get(&router, "/tiles/10/3/4").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_empty_blob_is_absent() {
    let fixture = MbtilesFixture::new("pbf").with_tile(1, 0, 0, b"").write();
    let router = router_for(fixture.open());

    let response = get(&router, "/tiles/1/0/0").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_text_tile_data_served_as_stored() {
    let fixture = MbtilesFixture::new("pbf").write();
    fixture.execute(r#"INSERT INTO tiles VALUES (0, 0, 0, '{"a":1}');"#);
    let router = router_for(fixture.open());

    let response = get(&router, "/tiles/0/0/0").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-encoding"), Some("identity"));
    assert_eq!(body_bytes(response).await.as_ref(), br#"{"a":1}"#);
}

#[tokio::test]
async fn test_numeric_metadata_values() {
    let fixture = MbtilesFixture::empty().write();
    fixture.execute(
        "DROP TABLE metadata;
         CREATE TABLE metadata (name, value);
         INSERT INTO metadata VALUES ('format', 'pbf');
         INSERT INTO metadata VALUES ('minzoom', 0);
         INSERT INTO metadata VALUES ('maxzoom', 14);",
    );
    let router = router_for(fixture.open());

    let json = body_json(get(&router, "/metadata").await).await;

    assert_eq!(json["format"], "pbf");
    assert_eq!(json["minzoom"], 0);
    assert_eq!(json["maxzoom"], 14);
}

#[tokio::test]
async fn test_storage_failure_is_generic_500() {
    let archive = MockArchive::new("pbf").failing("disk I/O error at /secret/path.mbtiles");
    let lookups = archive.lookup_counter();
    let router = create_router(TileService::new(archive), RouterConfig::new());

    let response = get(&router, "/tiles/0/0/0").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_bytes(response).await;
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("storage_error"));
    assert!(!text.contains("/secret/path"));
    // Never retried
    assert_eq!(lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_open_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = MbtilesArchive::open(dir.path().join("missing.mbtiles"));
    assert!(matches!(missing, Err(ArchiveError::NotFound { .. })));

    let no_format = MbtilesFixture::empty().with_metadata("name", "x").write();
    let result = MbtilesArchive::open(&no_format.path);
    assert!(matches!(result, Err(ArchiveError::Corrupt { .. })));
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_repeated_requests_identical() {
    let tile = gzip_blob(b"same every time");
    let fixture = MbtilesFixture::new("pbf").with_tile(6, 10, 20, &tile).write();
    let router = router_for(fixture.open());

    let first = get(&router, "/tiles/6/10/20").await;
    let first_encoding = header(&first, "content-encoding").map(str::to_string);
    let first_body = body_bytes(first).await;

    for _ in 0..5 {
        let response = get(&router, "/tiles/6/10/20").await;
        assert_eq!(
            header(&response, "content-encoding").map(str::to_string),
            first_encoding
        );
        assert_eq!(body_bytes(response).await, first_body);
    }
}

#[tokio::test]
async fn test_concurrent_requests() {
    let mut fixture = MbtilesFixture::new("pbf");
    for x in 0..8 {
        fixture = fixture.with_tile(3, x, 2, &gzip_blob(&[x as u8]));
    }
    let fixture = fixture.write();
    let router = router_for(fixture.open());

    let handles: Vec<_> = (0..8u32)
        .map(|x| {
            let router = router.clone();
            tokio::spawn(async move {
                let response = get(&router, &format!("/tiles/3/{}/2", x)).await;
                (x, response.status(), body_bytes(response).await)
            })
        })
        .collect();

    for handle in handles {
        let (x, status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), gzip_blob(&[x as u8]).as_slice());
    }
}

// =============================================================================
// Other Routes
// =============================================================================

#[tokio::test]
async fn test_health() {
    let router = create_router(TileService::new(MockArchive::new("pbf")), RouterConfig::new());

    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_viewer_route() {
    let archive = MockArchive::new("pbf").with_metadata("name", "Fixture Map");

    let router = create_router(TileService::new(archive), RouterConfig::new());
    let response = get(&router, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header(&response, "content-type")
        .unwrap()
        .starts_with("text/html"));
    let body = body_bytes(response).await;
    assert!(String::from_utf8_lossy(&body).contains("Fixture Map"));

    let router = create_router(
        TileService::new(MockArchive::new("pbf")),
        RouterConfig::new().with_viewer(false),
    );
    assert_eq!(get(&router, "/").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("style.json"), r#"{"version":8}"#).unwrap();

    let router = create_router(
        TileService::new(MockArchive::new("pbf")),
        RouterConfig::new().with_static_dir(dir.path()),
    );

    let response = get(&router, "/static/style.json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), br#"{"version":8}"#);

    assert_eq!(
        get(&router, "/static/missing.json").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_cors_any_origin() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let router = create_router(TileService::new(MockArchive::new("pbf")), RouterConfig::new());

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://maps.example.com")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_custom_cache_max_age() {
    let archive = MockArchive::new("pbf").with_tile(0, 0, 0, &gzip_blob(b"x"));
    let router = create_router(
        TileService::new(archive),
        RouterConfig::new().with_cache_max_age(60),
    );

    let response = get(&router, "/tiles/0/0/0").await;
    assert_eq!(header(&response, "cache-control"), Some("public, max-age=60"));
}
