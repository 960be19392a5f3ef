//! View buffer with LRU eviction
//!
//! Tracks which rendered pages belong to the working set. The buffer only
//! holds keys: the page list stays the owner of every page, and the buffer
//! tells its caller which page fell out of the working set so the caller can
//! release that page's surface.

use lru::LruCache;
use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Default number of rendered pages kept alive.
pub const DEFAULT_CACHE_SIZE: usize = 10;

/// Statistics about buffer usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Number of pages currently tracked
    pub len: usize,

    /// Maximum number of pages tracked before eviction
    pub capacity: usize,

    /// Total pushes, including re-pushes of tracked pages
    pub pushes: u64,

    /// Number of pages evicted because the buffer overflowed
    pub evictions: u64,
}

/// Bounded, recency-ordered set of rendered pages
///
/// Pushing a key marks it most recently used. When a push of a new key would
/// exceed the capacity, exactly one key (the least recently used) is evicted
/// and returned.
///
/// # Example
///
/// ```
/// use pdfview_cache::ViewBuffer;
///
/// let mut buffer = ViewBuffer::new(2);
///
/// assert_eq!(buffer.push(1_u32), None);
/// assert_eq!(buffer.push(2), None);
///
/// // Touch page 1 so page 2 becomes the eviction candidate.
/// assert_eq!(buffer.push(1), None);
/// assert_eq!(buffer.push(3), Some(2));
///
/// assert!(buffer.has(&1));
/// assert!(!buffer.has(&2));
/// ```
#[derive(Debug)]
pub struct ViewBuffer<K>
where
    K: Hash + Eq + Copy + Debug,
{
    entries: LruCache<K, ()>,
    stats: BufferStats,
}

impl<K> ViewBuffer<K>
where
    K: Hash + Eq + Copy + Debug,
{
    /// Create a buffer holding at most `capacity` pages
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = non_zero(capacity);

        Self {
            entries: LruCache::new(capacity),
            stats: BufferStats { capacity: capacity.get(), ..Default::default() },
        }
    }

    /// Mark `key` as most recently used, inserting it if absent
    ///
    /// Returns the evicted key when the insertion overflowed the buffer.
    /// Re-pushing a tracked key never evicts and never changes the length.
    pub fn push(&mut self, key: K) -> Option<K> {
        self.stats.pushes += 1;

        let evicted = match self.entries.push(key, ()) {
            Some((evicted, ())) if evicted != key => Some(evicted),
            _ => None,
        };

        if let Some(evicted) = evicted {
            self.stats.evictions += 1;
            tracing::debug!(?evicted, ?key, "view buffer evicted least recently used page");
        }

        self.stats.len = self.entries.len();
        evicted
    }

    /// Like [`push`](Self::push), but never evicts a key for which `keep` holds
    ///
    /// On overflow the least recently used key that is not kept is evicted.
    /// When every tracked key is kept and `key` is not, `key` itself is turned
    /// away: it is returned and left untracked. When `key` is kept as well,
    /// the plain LRU eviction applies.
    pub fn push_keeping<F>(&mut self, key: K, keep: F) -> Option<K>
    where
        F: Fn(&K) -> bool,
    {
        if self.entries.contains(&key) || self.entries.len() < self.entries.cap().get() {
            return self.push(key);
        }

        let victim = self.entries.iter().rev().map(|(tracked, _)| *tracked).find(|k| !keep(k));
        let evicted = match victim {
            Some(victim) => {
                self.entries.pop(&victim);
                self.entries.push(key, ());
                victim
            }
            None if keep(&key) => return self.push(key),
            None => key,
        };

        self.stats.pushes += 1;
        self.stats.evictions += 1;
        self.stats.len = self.entries.len();
        tracing::debug!(?evicted, ?key, "view buffer evicted least recently used unkept page");
        Some(evicted)
    }

    /// Membership test; does not affect recency
    pub fn has(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Stop tracking `key` without evicting anything else
    pub fn remove(&mut self, key: &K) -> bool {
        let removed = self.entries.pop(key).is_some();
        self.stats.len = self.entries.len();
        removed
    }

    /// Forget every tracked key and apply a new capacity
    ///
    /// The caller owns the pages; nothing is destroyed here.
    pub fn reset(&mut self, capacity: usize) {
        let capacity = non_zero(capacity);

        self.entries.clear();
        self.entries.resize(capacity);
        self.stats.len = 0;
        self.stats.capacity = capacity.get();
    }

    /// The key that the next overflowing push would evict
    pub fn least_recent(&self) -> Option<K> {
        self.entries.peek_lru().map(|(key, _)| *key)
    }

    /// Tracked keys from least to most recently used
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().rev().map(|(key, _)| *key).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }
}

impl<K> Default for ViewBuffer<K>
where
    K: Hash + Eq + Copy + Debug,
{
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

fn non_zero(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}
