//! In-memory LRU cache of parsed metadata documents.
//!
//! A single descriptor build looks the same `metadata.xml` up several times
//! (footprint, angles, quality indicators), and mask documents are read again
//! when tiles are re-imported. Documents are parsed once and shared as `Arc`.

use crate::io::xml_tree::XmlDocument;
use crate::types::{TileError, TileResult};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Number of documents kept when no capacity is given
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Cached value; `None` records a document that failed to parse
type CachedDocument = Option<Arc<XmlDocument>>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// Every miss is one read of the file from disk
    pub misses: u64,
    pub evictions: u64,
    pub parse_failures: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct CacheState {
    entries: LruCache<PathBuf, CachedDocument>,
    stats: CacheStats,
}

/// Thread-safe, bounded cache of parsed XML documents keyed by file path
pub struct MetadataCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl MetadataCache {
    /// Create a cache holding at most `capacity` documents (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let size = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(size),
                stats: CacheStats::default(),
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic while holding the lock leaves the LRU structurally valid
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Parsed document for `path`, reading and parsing it on a miss.
    ///
    /// Malformed XML is logged and yields `Ok(None)`; that outcome is cached
    /// like a successful parse. An unreadable file is an error and is not cached.
    pub fn get(&self, path: &Path) -> TileResult<Option<Arc<XmlDocument>>> {
        {
            let mut state = self.lock();
            if let Some(cached) = state.entries.get(path) {
                let cached = cached.clone();
                state.stats.hits += 1;
                log::debug!("Metadata cache hit: {}", path.display());
                return Ok(cached);
            }
        }

        // Read and parse outside the lock
        log::debug!("Metadata cache miss, reading {}", path.display());
        let content = std::fs::read(path)?;
        let parsed = match XmlDocument::parse_bytes(path, &content) {
            Ok(document) => Some(Arc::new(document)),
            Err(e) => {
                log::warn!("Exception while parsing {}: {}", path.display(), e);
                None
            }
        };

        let mut state = self.lock();
        state.stats.misses += 1;
        if parsed.is_none() {
            state.stats.parse_failures += 1;
        }
        if let Some((evicted, _)) = state.entries.push(path.to_path_buf(), parsed.clone()) {
            if evicted.as_path() != path {
                state.stats.evictions += 1;
                log::debug!("Evicted {} from metadata cache", evicted.display());
            }
        }
        Ok(parsed)
    }

    /// Like [`get`](Self::get), but a malformed document is an error
    pub fn require(&self, path: &Path) -> TileResult<Arc<XmlDocument>> {
        self.get(path)?
            .ok_or_else(|| TileError::ParseFailure(path.to_path_buf()))
    }

    /// Whether `path` is cached; does not touch recency
    pub fn contains(&self, path: &Path) -> bool {
        self.lock().entries.contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        log::debug!("Metadata cache cleared");
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
