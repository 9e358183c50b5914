// cache.rs
use crate::types::Bitmap;
use fxhash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

struct CacheEntry {
    bitmap: Bitmap,
    last_used: AtomicU64,
}

/// In-memory url -> bitmap store shared between the coordinating thread (reads) and the fetch
/// workers (writes). Holds at most one entry per url.
///
/// Unbounded unless a capacity is given, in which case inserting past the capacity evicts the
/// least recently used entry.
pub struct ImageCache {
    entries: RwLock<FxHashMap<String, CacheEntry>>,
    capacity: Option<usize>,
    clock: AtomicU64,
}

impl ImageCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            capacity: capacity.map(|c| c.max(1)),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, url: &str) -> Option<Bitmap> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(url).map(|entry| {
            entry.last_used.store(self.tick(), Ordering::Relaxed);
            entry.bitmap.clone()
        })
    }

    pub fn contains(&self, url: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(url)
    }

    /// Stores `bitmap` under `url`, replacing any previous entry for the same url.
    pub fn insert(&self, url: String, bitmap: Bitmap) {
        let stamp = self.tick();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(capacity) = self.capacity {
            while entries.len() >= capacity && !entries.contains_key(&url) {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
                    .map(|(key, _)| key.clone());

                match oldest {
                    Some(key) => {
                        log::debug!("Evicting {} from image cache", key);
                        entries.remove(&key);
                    }
                    None => break,
                }
            }
        }

        entries.insert(
            url,
            CacheEntry {
                bitmap,
                last_used: AtomicU64::new(stamp),
            },
        );
    }

    pub fn remove(&self, url: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(None)
    }
}
