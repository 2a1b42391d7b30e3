//! Node interning: hash -> id resolution backed by per-hash-prefix buckets,
//! plus per-node reference counting and garbage collection at refcount
//! zero.
//!
//! Ids are allocated lazily off the `horizon` counter the first time a
//! value's hash is seen, the value cache is populated on every write, and
//! invalidated on delete. Values are spread across `v/<h0>/<h1>` buckets
//! keyed by hash, with refcounts tracked separately in parallel
//! `n/<h0>/<h1>` buckets so a node's count can be bumped without touching
//! its (possibly large) value bytes.

use crate::cache::ValueCache;
use crate::codec::{encode_value, hash_value, Hash};
use crate::error::Result;
use crate::kv::Tx;
use crate::log;
use crate::model::{PrimaryKey, Value};

/// Outcome of resolving or creating a node for a given hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternResult {
    /// The node's id.
    pub id: PrimaryKey,
    /// Whether this call allocated a fresh id (and therefore the node
    /// cannot already participate in any existing link).
    pub is_new: bool,
}

fn bucket_name(prefix: &str, hash: &Hash) -> String {
    format!("{prefix}/{:02x}/{:02x}", hash[0], hash[1])
}

fn v_bucket_name(hash: &Hash) -> String {
    bucket_name("v", hash)
}

fn n_bucket_name(hash: &Hash) -> String {
    bucket_name("n", hash)
}

fn read_id<T: Tx>(tx: &mut T, hash: &Hash) -> Result<Option<PrimaryKey>> {
    let bucket = tx.bucket(&v_bucket_name(hash))?;
    Ok(bucket
        .get(hash)?
        .map(|b| u64::from_be_bytes(b.as_ref().try_into().unwrap())))
}

fn write_id<T: Tx>(tx: &mut T, hash: &Hash, id: PrimaryKey) -> Result<()> {
    let mut bucket = tx.bucket(&v_bucket_name(hash))?;
    bucket.put(hash, &id.to_be_bytes())
}

fn delete_id<T: Tx>(tx: &mut T, hash: &Hash) -> Result<()> {
    let mut bucket = tx.bucket(&v_bucket_name(hash))?;
    bucket.del(hash)
}

fn read_refcount<T: Tx>(tx: &mut T, hash: &Hash) -> Result<i64> {
    let bucket = tx.bucket(&n_bucket_name(hash))?;
    Ok(bucket
        .get(hash)?
        .map(|b| i64::from_be_bytes(b.as_ref().try_into().unwrap()))
        .unwrap_or(0))
}

fn write_refcount<T: Tx>(tx: &mut T, hash: &Hash, count: i64) -> Result<()> {
    let mut bucket = tx.bucket(&n_bucket_name(hash))?;
    bucket.put(hash, &count.to_be_bytes())
}

fn delete_refcount<T: Tx>(tx: &mut T, hash: &Hash) -> Result<()> {
    let mut bucket = tx.bucket(&n_bucket_name(hash))?;
    bucket.del(hash)
}

/// Resolves `value`'s id, creating a new node if it has never been
/// interned before. Consults `cache` first for IRI values.
pub fn resolve_or_create<T: Tx>(
    tx: &mut T,
    cache: &mut ValueCache,
    value: &Value,
) -> Result<InternResult> {
    let hash = hash_value(value);

    if let Some(iri) = value.as_iri() {
        if let Some(id) = cache.get(iri) {
            return Ok(InternResult { id, is_new: false });
        }
    }

    if let Some(id) = read_id(tx, &hash)? {
        if let Some(iri) = value.as_iri() {
            cache.put(iri.to_string(), id);
        }
        return Ok(InternResult { id, is_new: false });
    }

    let id = {
        let mut meta = tx.bucket("meta")?;
        log::gen_ids(&mut meta, 1)?
    };
    let primitive = crate::model::Primitive {
        id,
        subject: 0,
        predicate: 0,
        object: 0,
        label: 0,
        value: encode_value(value),
        timestamp: crate::clock::now_nanos(),
        deleted: false,
    };
    {
        let mut log_bucket = tx.bucket("log")?;
        log::put_primitive(&mut log_bucket, &primitive)?;
    }
    write_id(tx, &hash, id)?;
    if let Some(iri) = value.as_iri() {
        cache.put(iri.to_string(), id);
    }
    Ok(InternResult { id, is_new: true })
}

/// Resolves `value`'s id without creating it; `None` means the node has
/// never been interned (a link referencing it as a delete target cannot
/// exist).
pub fn resolve_existing<T: Tx>(
    tx: &mut T,
    cache: &mut ValueCache,
    value: &Value,
) -> Result<Option<PrimaryKey>> {
    let hash = hash_value(value);
    if let Some(iri) = value.as_iri() {
        if let Some(id) = cache.get(iri) {
            return Ok(Some(id));
        }
    }
    let found = read_id(tx, &hash)?;
    if let (Some(id), Some(iri)) = (found, value.as_iri()) {
        cache.put(iri.to_string(), id);
    }
    Ok(found)
}

/// Applies a signed refcount delta to an already-resolved node, deleting
/// the node entirely (hash->id row, refcount row, log row, cache entry)
/// when the resulting count reaches zero or below.
pub fn apply_ref_delta<T: Tx>(
    tx: &mut T,
    cache: &mut ValueCache,
    hash: &Hash,
    id: PrimaryKey,
    delta: i64,
) -> Result<()> {
    let current = read_refcount(tx, hash)?;
    let updated = current + delta;
    if updated <= 0 {
        delete_id(tx, hash)?;
        delete_refcount(tx, hash)?;
        {
            let mut log_bucket = tx.bucket("log")?;
            log::delete_row(&mut log_bucket, id)?;
        }
        // The cache is keyed by IRI text, not by hash; without decoding the
        // node's value we cannot know which IRI (if any) to evict by key,
        // so callers that track the originating `Value` evict it
        // themselves via `ValueCache::del`. Nothing further to do here.
        let _ = cache;
    } else {
        write_refcount(tx, hash, updated)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::mem::MemKv;
    use crate::kv::with_update;

    #[test]
    fn resolve_or_create_allocates_once_per_distinct_value() {
        let kv = MemKv::new();
        let mut cache = ValueCache::new(16);
        with_update(&kv, |tx| {
            let a = resolve_or_create(tx, &mut cache, &Value::Iri("a".into()))?;
            assert!(a.is_new);
            let again = resolve_or_create(tx, &mut cache, &Value::Iri("a".into()))?;
            assert!(!again.is_new);
            assert_eq!(a.id, again.id);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn resolve_existing_is_none_for_unseen_value() {
        let kv = MemKv::new();
        let mut cache = ValueCache::new(16);
        with_update(&kv, |tx| {
            let found = resolve_existing(tx, &mut cache, &Value::Iri("ghost".into()))?;
            assert!(found.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn ref_delta_to_zero_removes_log_row() {
        let kv = MemKv::new();
        let mut cache = ValueCache::new(16);
        with_update(&kv, |tx| {
            let value = Value::Iri("a".into());
            let created = resolve_or_create(tx, &mut cache, &value)?;
            let hash = hash_value(&value);
            apply_ref_delta(tx, &mut cache, &hash, created.id, 1)?;
            apply_ref_delta(tx, &mut cache, &hash, created.id, -2)?;

            let log_bucket = tx.bucket("log")?;
            assert!(log::get_primitive(&log_bucket, created.id)?.is_none());
            Ok(())
        })
        .unwrap();
    }
}
