//! Fixed-capacity IRI -> id cache built on `lru::LruCache`.

use crate::model::PrimaryKey;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Advisory cache from the canonical textual form of an IRI to its interned
/// id. A miss is not an error: callers must fall back to the node interner.
/// Never consulted for non-IRI values, since those are not uniquely keyable
/// this cheaply.
///
/// `Clone` is used by the write pipeline to take a snapshot before a batch
/// and publish it back only after the batch's transaction commits, so a
/// rolled-back batch never leaves the shared cache holding ids that never
/// landed on disk.
#[derive(Clone)]
pub struct ValueCache {
    inner: Option<LruCache<String, PrimaryKey>>,
}

impl ValueCache {
    /// Builds a cache holding at most `capacity` entries. `capacity == 0`
    /// builds a cache that never retains anything: `get` always misses and
    /// `put` is a no-op, without ever allocating an `LruCache`.
    pub fn new(capacity: usize) -> Self {
        let inner = NonZeroUsize::new(capacity).map(LruCache::new);
        Self { inner }
    }

    /// Looks up `iri`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, iri: &str) -> Option<PrimaryKey> {
        self.inner.as_mut()?.get(iri).copied()
    }

    /// Records `iri -> id`, evicting the least-recently-used entry if the
    /// cache is at capacity. A no-op on a zero-capacity cache.
    pub fn put(&mut self, iri: String, id: PrimaryKey) {
        if let Some(inner) = self.inner.as_mut() {
            inner.put(iri, id);
        }
    }

    /// Removes `iri` from the cache, if present. Called when a node's
    /// refcount reaches zero so a stale mapping never outlives its node.
    pub fn del(&mut self, iri: &str) {
        if let Some(inner) = self.inner.as_mut() {
            inner.pop(iri);
        }
    }

    /// Current number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, LruCache::len)
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.as_ref().map_or(true, LruCache::is_empty)
    }
}
