//! The abstract transactional key-value contract the quad store is built
//! on. Only the contract is part of this crate's surface; [`mem`] provides
//! a minimal in-process implementation so the rest of the crate is
//! independently testable without depending on a concrete external engine.

use crate::error::Result;
use bytes::Bytes;

/// A transactional, bucketed byte store. Implementations must provide
/// snapshot isolation for read (`write = false`) transactions and serialize
/// concurrent write transactions.
pub trait Kv: Send + Sync {
    /// Concrete read/write transaction type.
    type Tx<'a>: Tx
    where
        Self: 'a;

    /// Begins a transaction. Write transactions are serialized by the
    /// implementation (typically via a single writer lock).
    fn tx(&self, write: bool) -> Result<Self::Tx<'_>>;
}

/// A transaction over a [`Kv`] store.
pub trait Tx {
    /// Concrete bucket type.
    type Bucket<'a>: Bucket
    where
        Self: 'a;

    /// Returns an addressable subspace named `name`. In write transactions
    /// it is created if absent; in read transactions a missing bucket is
    /// reported by the bucket's own read operations returning empty/absent
    /// results, never a hard error, so readers never observe partial
    /// initialization as corruption.
    fn bucket(&mut self, name: &str) -> Result<Self::Bucket<'_>>;

    /// Commits the transaction. Consumes `self`, so a transaction that is
    /// merely dropped is implicitly rolled back.
    fn commit(self) -> Result<()>;
}

/// An addressable, prefix-scannable subspace of key-value pairs.
pub trait Bucket {
    /// Batched point lookup; result order matches `keys` order, with `None`
    /// for keys that are absent.
    fn get_batch(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Bytes>>>;
    /// Point lookup for a single key.
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.get_batch(&[key.to_vec()])?.into_iter().next().flatten())
    }
    /// Inserts or overwrites a key.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    /// Removes a key; removing an absent key is not an error.
    fn del(&mut self, key: &[u8]) -> Result<()>;
    /// Lexicographic scan of every key carrying `prefix`, in ascending
    /// order. Collected eagerly since the reference backend holds its
    /// snapshot in memory; a real backend would stream this.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Bytes)>>;
}

/// Runs `f` inside a write transaction, committing on `Ok` and relying on
/// `Drop` to roll back on `Err` or panic.
pub fn with_update<K, F, T>(kv: &K, f: F) -> Result<T>
where
    K: Kv,
    F: for<'a> FnOnce(&mut K::Tx<'a>) -> Result<T>,
{
    let mut tx = kv.tx(true)?;
    let result = f(&mut tx)?;
    tx.commit()?;
    Ok(result)
}

/// Runs `f` inside a read transaction. No explicit commit is required; the
/// transaction is simply dropped once the view is no longer needed.
pub fn with_view<K, F, T>(kv: &K, f: F) -> Result<T>
where
    K: Kv,
    F: for<'a> FnOnce(&mut K::Tx<'a>) -> Result<T>,
{
    let mut tx = kv.tx(false)?;
    f(&mut tx)
}

/// A minimal in-process reference implementation of [`Kv`], backed by a
/// `BTreeMap` per bucket under a single `RwLock`. Not a deliverable of this
/// crate's core (the backend KV engine is an external collaborator) but
/// sufficient to exercise every operation the core performs against a real
/// transactional store.
pub mod mem {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    type BucketMap = BTreeMap<Vec<u8>, Bytes>;

    /// In-memory [`Kv`] implementation.
    #[derive(Default)]
    pub struct MemKv {
        buckets: Arc<RwLock<BTreeMap<String, BucketMap>>>,
    }

    impl MemKv {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Kv for MemKv {
        type Tx<'a> = MemTx<'a>;

        fn tx(&self, write: bool) -> Result<Self::Tx<'_>> {
            let snapshot = self.buckets.read().clone();
            Ok(MemTx {
                store: &self.buckets,
                snapshot,
                write,
                committed: false,
            })
        }
    }

    /// In-memory transaction: reads are served from a cloned snapshot taken
    /// at transaction start, writes are buffered into the same snapshot and
    /// published back to the store atomically on commit.
    pub struct MemTx<'a> {
        store: &'a RwLock<BTreeMap<String, BucketMap>>,
        snapshot: BTreeMap<String, BucketMap>,
        write: bool,
        committed: bool,
    }

    impl<'a> Tx for MemTx<'a> {
        type Bucket<'b>
            = MemBucket<'b>
        where
            Self: 'b;

        fn bucket(&mut self, name: &str) -> Result<Self::Bucket<'_>> {
            if self.write && !self.snapshot.contains_key(name) {
                self.snapshot.insert(name.to_string(), BTreeMap::new());
            }
            Ok(MemBucket {
                name: name.to_string(),
                snapshot: &mut self.snapshot,
                write: self.write,
            })
        }

        fn commit(mut self) -> Result<()> {
            if self.write {
                *self.store.write() = self.snapshot.clone();
            }
            self.committed = true;
            Ok(())
        }
    }

    impl<'a> Drop for MemTx<'a> {
        fn drop(&mut self) {
            // Uncommitted write transactions simply discard `snapshot`;
            // nothing was published to `store`.
        }
    }

    /// Bucket view over a [`MemTx`]'s snapshot.
    pub struct MemBucket<'a> {
        name: String,
        snapshot: &'a mut BTreeMap<String, BucketMap>,
        write: bool,
    }

    impl<'a> Bucket for MemBucket<'a> {
        fn get_batch(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Bytes>>> {
            let bucket = self.snapshot.get(&self.name);
            Ok(keys
                .iter()
                .map(|k| bucket.and_then(|b| b.get(k.as_slice()).cloned()))
                .collect())
        }

        fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
            debug_assert!(self.write, "put called on a read-only bucket");
            self.snapshot
                .entry(self.name.clone())
                .or_default()
                .insert(key.to_vec(), Bytes::copy_from_slice(value));
            Ok(())
        }

        fn del(&mut self, key: &[u8]) -> Result<()> {
            debug_assert!(self.write, "del called on a read-only bucket");
            if let Some(bucket) = self.snapshot.get_mut(&self.name) {
                bucket.remove(key);
            }
            Ok(())
        }

        fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Bytes)>> {
            let Some(bucket) = self.snapshot.get(&self.name) else {
                return Ok(Vec::new());
            };
            Ok(bucket
                .range(prefix.to_vec()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }
    }

}
