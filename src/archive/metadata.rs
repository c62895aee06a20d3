//! Archive metadata and the document served by `/metadata`.
//!
//! [`MetadataMap`] holds the raw `metadata` table exactly as stored.
//! [`MetadataDocument`] is the client-facing view: string entries pass
//! through, while `bounds`, `center`, `minzoom`, `maxzoom` and the embedded
//! `json` layer schema are parsed into typed fields. A typed field that fails
//! to parse is dropped from the document and logged; it never fails the
//! whole response.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Keys that are parsed into typed fields instead of passed through.
const PROMOTED_KEYS: [&str; 7] = [
    "bounds",
    "center",
    "minzoom",
    "maxzoom",
    "json",
    "vector_layers",
    "tilestats",
];

// =============================================================================
// MetadataMap
// =============================================================================

/// Raw key/value pairs from an archive's `metadata` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataMap {
    entries: BTreeMap<String, String>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or replace an entry. Later duplicates win, as in SQLite scans.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetadataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MetadataMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

// =============================================================================
// MetadataDocument
// =============================================================================

/// Structured metadata returned by the `/metadata` endpoint.
///
/// ```json
/// {
///   "format": "pbf",
///   "name": "Berlin",
///   "bounds": [13.08, 52.33, 13.76, 52.67],
///   "center": [13.4, 52.5, 10.0],
///   "minzoom": 0,
///   "maxzoom": 14,
///   "vector_layers": [{ "id": "streets", "fields": {} }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataDocument {
    /// Every metadata entry that is not promoted to a typed field
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,

    /// `[west, south, east, north]` in WGS84 degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f64; 4]>,

    /// `[lon, lat]` or `[lon, lat, zoom]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,

    /// Vector layer schema parsed from the `json` entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_layers: Option<Value>,

    /// Optional tilestats block from the `json` entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tilestats: Option<Value>,
}

impl MetadataDocument {
    /// Build the document from raw metadata.
    pub fn from_metadata(metadata: &MetadataMap) -> Self {
        let fields = metadata
            .iter()
            .filter(|(key, _)| !PROMOTED_KEYS.contains(key))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let bounds = metadata.get("bounds").and_then(|raw| {
            let parsed = parse_bounds(raw);
            if parsed.is_none() {
                warn!(value = raw, "Ignoring malformed 'bounds' metadata");
            }
            parsed
        });

        let center = metadata.get("center").and_then(|raw| {
            let parsed = parse_center(raw);
            if parsed.is_none() {
                warn!(value = raw, "Ignoring malformed 'center' metadata");
            }
            parsed
        });

        let minzoom = metadata.get("minzoom").and_then(|raw| parse_zoom("minzoom", raw));
        let maxzoom = metadata.get("maxzoom").and_then(|raw| parse_zoom("maxzoom", raw));

        let (vector_layers, tilestats) = match metadata.get("json") {
            Some(raw) => match parse_layer_schema(raw) {
                Ok(schema) => schema,
                Err(reason) => {
                    warn!(reason = %reason, "Omitting vector layer schema from metadata");
                    (None, None)
                }
            },
            None => (None, None),
        };

        Self {
            fields,
            bounds,
            center,
            minzoom,
            maxzoom,
            vector_layers,
            tilestats,
        }
    }
}

fn parse_numbers(raw: &str) -> Option<Vec<f64>> {
    raw.split(',')
        .map(|part| part.trim().parse::<f64>().ok().filter(|n| n.is_finite()))
        .collect()
}

/// Parse `"west,south,east,north"`.
pub fn parse_bounds(raw: &str) -> Option<[f64; 4]> {
    match parse_numbers(raw)?.as_slice() {
        &[west, south, east, north] => Some([west, south, east, north]),
        _ => None,
    }
}

/// Parse `"lon,lat"` or `"lon,lat,zoom"`.
pub fn parse_center(raw: &str) -> Option<Vec<f64>> {
    let numbers = parse_numbers(raw)?;
    matches!(numbers.len(), 2 | 3).then_some(numbers)
}

fn parse_zoom(key: &str, raw: &str) -> Option<u8> {
    let parsed = raw.trim().parse::<u8>().ok();
    if parsed.is_none() {
        warn!(key, value = raw, "Ignoring malformed zoom metadata");
    }
    parsed
}

/// Parse the MBTiles `json` entry into `(vector_layers, tilestats)`.
///
/// The entry must be a JSON object whose `vector_layers` (when present) is an
/// array.
fn parse_layer_schema(raw: &str) -> Result<(Option<Value>, Option<Value>), String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))?;

    let Value::Object(mut object) = value else {
        return Err("expected a JSON object".to_string());
    };

    let vector_layers = match object.remove("vector_layers") {
        Some(layers @ Value::Array(_)) => Some(layers),
        Some(_) => return Err("'vector_layers' is not an array".to_string()),
        None => None,
    };

    Ok((vector_layers, object.remove("tilestats")))
}

// =============================================================================
// Tests
// =============================================================================
