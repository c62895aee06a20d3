//! Optional in-memory cache of raw tile blobs.
//!
//! Blobs are cached exactly as stored in the archive, keyed by coordinate.
//! The cache tracks the total size of cached blobs in bytes and evicts
//! least-recently-used entries when the capacity is exceeded.

use std::num::NonZeroUsize;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;

use super::coord::TileCoord;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// LRU cache for tile blobs with size-based capacity.
///
/// The cache is thread-safe and can be shared across async tasks.
pub struct TileCache {
    cache: RwLock<LruCache<TileCoord, Bytes>>,

    /// Maximum total size in bytes
    max_size: usize,

    /// Current total size in bytes
    current_size: RwLock<usize>,
}

impl TileCache {
    /// Create a new tile cache with the specified capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a new tile cache with specified capacity and maximum entries.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: NonZeroUsize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(max_entries)),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// Get a blob, marking it as recently used.
    pub async fn get(&self, key: &TileCoord) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    /// Check if a blob is cached without updating LRU order.
    pub async fn contains(&self, key: &TileCoord) -> bool {
        let cache = self.cache.read().await;
        cache.contains(key)
    }

    /// Store a blob, evicting LRU entries until the cache fits its capacity.
    ///
    /// Blobs larger than the whole capacity are not cached.
    pub async fn put(&self, key: TileCoord, data: Bytes) {
        let data_size = data.len();
        if data_size > self.max_size {
            return;
        }

        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;

        if let Some(old_data) = cache.peek(&key) {
            *current_size = current_size.saturating_sub(old_data.len());
        }

        // push() reports entries dropped by the entry-count bound
        if let Some((evicted_key, evicted_data)) = cache.push(key, data) {
            if evicted_key != key {
                *current_size = current_size.saturating_sub(evicted_data.len());
            }
        }
        *current_size += data_size;

        while *current_size > self.max_size {
            match cache.pop_lru() {
                Some((_, evicted_data)) => {
                    *current_size = current_size.saturating_sub(evicted_data.len());
                }
                None => break,
            }
        }
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        *current_size = 0;
    }

    /// Get the current number of cached tiles.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Get the current total size of cached blobs in bytes.
    pub async fn size(&self) -> usize {
        *self.current_size.read().await
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

// =============================================================================
// Tests
// =============================================================================
