//! Viewer module - generates the map page served at `/` using MapLibre GL.
//!
//! The page fetches `/metadata` at load time. Vector archives get one
//! generated style layer per entry in `vector_layers`; raster archives are
//! shown as a single raster source.

use crate::archive::MetadataDocument;
use crate::tile::TileFormat;

const MAPLIBRE_VERSION: &str = "4.7.1";

/// Escape HTML special characters to prevent XSS attacks.
fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Generate the viewer page for an archive.
///
/// # Arguments
///
/// * `metadata` - Metadata document, used for the title and info panel
/// * `format` - Tile format, decides between a vector and a raster source
pub fn generate_viewer_html(metadata: &MetadataDocument, format: TileFormat) -> String {
    let name = metadata
        .fields
        .get("name")
        .map(String::as_str)
        .unwrap_or("Tiles");

    let zoom_range = match (metadata.minzoom, metadata.maxzoom) {
        (Some(min), Some(max)) => format!("{}-{}", min, max),
        _ => "unknown".to_string(),
    };

    let layer_count = metadata
        .vector_layers
        .as_ref()
        .and_then(|layers| layers.as_array())
        .map(|layers| layers.len())
        .unwrap_or(0);

    // Escape user-controlled values to prevent XSS
    let escaped_name = html_escape(name);
    let escaped_format = html_escape(format.name());

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Tile Viewer - {escaped_name}</title>
    <script src="https://unpkg.com/maplibre-gl@{maplibre_version}/dist/maplibre-gl.js"></script>
    <link href="https://unpkg.com/maplibre-gl@{maplibre_version}/dist/maplibre-gl.css" rel="stylesheet">
    <style>
        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}
        body {{
            background: #0f0f0f;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif;
            overflow: hidden;
        }}
        #map {{
            width: 100vw;
            height: 100vh;
        }}
        .info-panel {{
            position: absolute;
            top: 16px;
            left: 16px;
            background: rgba(0, 0, 0, 0.85);
            color: #fff;
            padding: 16px 20px;
            border-radius: 8px;
            font-size: 13px;
            line-height: 1.5;
            border: 1px solid rgba(255, 255, 255, 0.1);
            max-width: 320px;
            z-index: 1000;
        }}
        .info-panel h2 {{
            font-size: 14px;
            font-weight: 600;
            margin-bottom: 8px;
            word-break: break-all;
        }}
        .info-panel .meta {{
            color: rgba(255, 255, 255, 0.7);
            font-size: 12px;
        }}
        .info-panel .meta span {{
            color: rgba(255, 255, 255, 0.9);
        }}
        .info-panel .format-badge {{
            display: inline-block;
            background: rgba(99, 102, 241, 0.2);
            color: #818cf8;
            padding: 2px 8px;
            border-radius: 4px;
            font-size: 11px;
            font-weight: 500;
            margin-top: 8px;
        }}
        .error-banner {{
            position: absolute;
            top: 0;
            left: 0;
            right: 0;
            background: rgba(220, 38, 38, 0.95);
            color: white;
            padding: 12px 20px;
            font-size: 14px;
            z-index: 1001;
            display: none;
        }}
        .error-banner.visible {{
            display: block;
        }}
    </style>
</head>
<body>
    <div id="error-banner" class="error-banner"></div>

    <div id="map"></div>

    <div class="info-panel">
        <h2>{escaped_name}</h2>
        <div class="meta">
            Zoom: <span>{zoom_range}</span><br>
            Layers: <span>{layer_count}</span>
        </div>
        <div class="format-badge">{escaped_format}</div>
    </div>

    <script>
        const isVector = {is_vector};
        const tilesUrl = window.location.origin + "/tiles/{{z}}/{{x}}/{{y}}";
        const palette = ["#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6", "#bcf60c"];

        function showError(message) {{
            const banner = document.getElementById("error-banner");
            banner.textContent = message;
            banner.classList.add("visible");
        }}

        function vectorStyle(meta, source) {{
            const layers = [{{ id: "background", type: "background", paint: {{ "background-color": "#111" }} }}];
            (meta.vector_layers || []).forEach(function(layer, i) {{
                const color = palette[i % palette.length];
                layers.push({{
                    id: layer.id + "-fill", type: "fill", source: "tiles", "source-layer": layer.id,
                    filter: ["==", ["geometry-type"], "Polygon"],
                    paint: {{ "fill-color": color, "fill-opacity": 0.3 }}
                }});
                layers.push({{
                    id: layer.id + "-line", type: "line", source: "tiles", "source-layer": layer.id,
                    filter: ["==", ["geometry-type"], "LineString"],
                    paint: {{ "line-color": color, "line-width": 1 }}
                }});
                layers.push({{
                    id: layer.id + "-point", type: "circle", source: "tiles", "source-layer": layer.id,
                    filter: ["==", ["geometry-type"], "Point"],
                    paint: {{ "circle-color": color, "circle-radius": 3 }}
                }});
            }});
            return {{ version: 8, sources: {{ tiles: source }}, layers: layers }};
        }}

        function rasterStyle(source) {{
            return {{
                version: 8,
                sources: {{ tiles: source }},
                layers: [{{ id: "raster", type: "raster", source: "tiles" }}]
            }};
        }}

        fetch("/metadata")
            .then(function(response) {{
                if (!response.ok) throw new Error("metadata request failed: " + response.status);
                return response.json();
            }})
            .then(function(meta) {{
                const source = {{
                    type: isVector ? "vector" : "raster",
                    tiles: [tilesUrl],
                    minzoom: meta.minzoom ?? 0,
                    maxzoom: meta.maxzoom ?? 22
                }};
                if (meta.bounds) source.bounds = meta.bounds;
                if (!isVector) source.tileSize = 256;

                const center = meta.center || [0, 0, meta.minzoom ?? 0];
                const map = new maplibregl.Map({{
                    container: "map",
                    style: isVector ? vectorStyle(meta, source) : rasterStyle(source),
                    center: [center[0], center[1]],
                    zoom: center.length > 2 ? center[2] : (meta.minzoom ?? 0)
                }});
                map.addControl(new maplibregl.NavigationControl());
                if (meta.bounds) {{
                    map.fitBounds([[meta.bounds[0], meta.bounds[1]], [meta.bounds[2], meta.bounds[3]]], {{ animate: false }});
                }}
                map.on("error", function(event) {{
                    showError("Failed to load tiles: " + (event.error && event.error.message || "unknown error"));
                }});
            }})
            .catch(function(err) {{
                showError(err.message);
            }});
    </script>
</body>
</html>"##,
        escaped_name = escaped_name,
        escaped_format = escaped_format,
        maplibre_version = MAPLIBRE_VERSION,
        zoom_range = zoom_range,
        layer_count = layer_count,
        is_vector = format.is_vector(),
    )
}
