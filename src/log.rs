//! The append-only primitive log and its `meta` counters (`version`,
//! `size`, `horizon`): a small fixed set of named counters, read and
//! written as a unit, backing id allocation and log-length tracking.

use crate::codec::{decode_primitive, encode_primitive, id_key};
use crate::error::{Result, StoreError};
use crate::kv::Bucket;
use crate::model::{Primitive, PrimaryKey};

/// The data-format version this build writes and accepts.
pub const LATEST_DATA_VERSION: i64 = 1;

const KEY_VERSION: &[u8] = b"version";
const KEY_SIZE: &[u8] = b"size";
const KEY_HORIZON: &[u8] = b"horizon";

/// Reads the `version` counter, if `meta` has ever been written.
pub fn read_version(meta: &impl Bucket) -> Result<Option<i64>> {
    Ok(meta
        .get(KEY_VERSION)?
        .map(|b| i64::from_le_bytes(b.as_ref().try_into().unwrap_or([0; 8]))))
}

/// Writes the `version` counter.
pub fn write_version(meta: &mut impl Bucket, version: i64) -> Result<()> {
    meta.put(KEY_VERSION, &version.to_le_bytes())
}

/// Validates that `meta`'s on-disk version matches [`LATEST_DATA_VERSION`],
/// per the error-handling contract: a mismatch is refused outright, with no
/// implicit upgrade.
pub fn check_version(meta: &impl Bucket) -> Result<()> {
    match read_version(meta)? {
        None => Err(StoreError::NotInitialized),
        Some(v) if v != LATEST_DATA_VERSION => Err(StoreError::VersionOutOfDate {
            found: v,
            expected: LATEST_DATA_VERSION,
        }),
        Some(_) => Ok(()),
    }
}

/// Reads the live-link `size` counter, defaulting to `0` if never written.
pub fn read_size(meta: &impl Bucket) -> Result<i64> {
    Ok(meta
        .get(KEY_SIZE)?
        .map(|b| i64::from_le_bytes(b.as_ref().try_into().unwrap_or([0; 8])))
        .unwrap_or(0))
}

/// Writes the `size` counter.
pub fn write_size(meta: &mut impl Bucket, size: i64) -> Result<()> {
    meta.put(KEY_SIZE, &size.to_le_bytes())
}

/// Adds `delta` (which may be negative) to the `size` counter.
pub fn adjust_size(meta: &mut impl Bucket, delta: i64) -> Result<()> {
    let current = read_size(meta)?;
    write_size(meta, current + delta)
}

/// Reads the `horizon` counter (last assigned id), defaulting to `0`.
pub fn read_horizon(meta: &impl Bucket) -> Result<PrimaryKey> {
    Ok(meta
        .get(KEY_HORIZON)?
        .map(|b| u64::from_le_bytes(b.as_ref().try_into().unwrap_or([0; 8])))
        .unwrap_or(0))
}

fn write_horizon(meta: &mut impl Bucket, horizon: PrimaryKey) -> Result<()> {
    meta.put(KEY_HORIZON, &horizon.to_le_bytes())
}

/// Atomically reserves a contiguous range of `n` new ids, returning the
/// first id of the range. `horizon` is never reused, even across store
/// restarts, because it is read from and written back to durable metadata
/// within the same transaction as every other effect of the batch.
pub fn gen_ids(meta: &mut impl Bucket, n: u64) -> Result<PrimaryKey> {
    let horizon = read_horizon(meta)?;
    let first = horizon + 1;
    write_horizon(meta, horizon + n)?;
    Ok(first)
}

/// Appends or overwrites the log row for `primitive`.
pub fn put_primitive(log: &mut impl Bucket, primitive: &Primitive) -> Result<()> {
    log.put(&id_key(primitive.id), &encode_primitive(primitive))
}

/// Reads a single log row, if present.
pub fn get_primitive(log: &impl Bucket, id: PrimaryKey) -> Result<Option<Primitive>> {
    match log.get(&id_key(id))? {
        None => Ok(None),
        Some(bytes) => Ok(Some(decode_primitive(&bytes)?)),
    }
}

/// Batched read of several log rows, preserving `ids`' order; missing rows
/// are reported as deleted nodes rather than as an error by the caller, as
/// [`crate::model::Primitive::id`] ranges past `horizon` never happen but a
/// garbage-collected node's row legitimately does not exist.
pub fn get_primitives_batch(log: &impl Bucket, ids: &[PrimaryKey]) -> Result<Vec<Option<Primitive>>> {
    let keys: Vec<Vec<u8>> = ids.iter().map(|id| id_key(*id).to_vec()).collect();
    log.get_batch(&keys)?
        .into_iter()
        .map(|maybe| maybe.map(|bytes| decode_primitive(&bytes)).transpose())
        .collect()
}

/// Removes a log row entirely. Used only for nodes whose refcount has
/// reached zero; links are tombstoned instead (see [`tombstone_link`]).
pub fn delete_row(log: &mut impl Bucket, id: PrimaryKey) -> Result<()> {
    log.del(&id_key(id))
}

/// Rewrites a link's row with `deleted = true`, preserving every other
/// field so the tombstone can still be inspected (e.g. by index repair).
pub fn tombstone_link(log: &mut impl Bucket, id: PrimaryKey) -> Result<()> {
    let Some(mut primitive) = get_primitive(log, id)? else {
        return Err(StoreError::CorruptPrimitive(format!(
            "tombstone of missing link {id}"
        )));
    };
    primitive.deleted = true;
    put_primitive(log, &primitive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::mem::MemKv;
    use crate::kv::{with_update, Kv, Tx};

    #[test]
    fn gen_ids_reserves_contiguous_ranges() {
        let kv = MemKv::new();
        with_update(&kv, |tx| {
            let mut meta = tx.bucket("meta")?;
            let first = gen_ids(&mut meta, 3)?;
            assert_eq!(first, 1);
            assert_eq!(read_horizon(&meta)?, 3);
            let second = gen_ids(&mut meta, 2)?;
            assert_eq!(second, 4);
            assert_eq!(read_horizon(&meta)?, 5);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn version_check_distinguishes_uninitialized_and_stale() {
        let kv = MemKv::new();
        with_update(&kv, |tx| {
            let meta = tx.bucket("meta")?;
            assert!(matches!(check_version(&meta), Err(StoreError::NotInitialized)));
            Ok(())
        })
        .unwrap();

        with_update(&kv, |tx| {
            let mut meta = tx.bucket("meta")?;
            write_version(&mut meta, 99)?;
            assert!(matches!(
                check_version(&meta),
                Err(StoreError::VersionOutOfDate { .. })
            ));
            write_version(&mut meta, LATEST_DATA_VERSION)?;
            assert!(check_version(&meta).is_ok());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn primitive_put_get_round_trip() {
        let kv = MemKv::new();
        with_update(&kv, |tx| {
            let mut log = tx.bucket("log")?;
            let p = Primitive {
                id: 1,
                subject: 0,
                predicate: 0,
                object: 0,
                label: 0,
                value: vec![9, 9],
                timestamp: 5,
                deleted: false,
            };
            put_primitive(&mut log, &p)?;
            let fetched = get_primitive(&log, 1)?.unwrap();
            assert_eq!(fetched, p);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn tombstone_preserves_fields_but_marks_deleted() {
        let kv = MemKv::new();
        with_update(&kv, |tx| {
            let mut log = tx.bucket("log")?;
            let p = Primitive {
                id: 7,
                subject: 1,
                predicate: 2,
                object: 3,
                label: 0,
                value: Vec::new(),
                timestamp: 10,
                deleted: false,
            };
            put_primitive(&mut log, &p)?;
            tombstone_link(&mut log, 7)?;
            let fetched = get_primitive(&log, 7)?.unwrap();
            assert!(fetched.deleted);
            assert_eq!(fetched.subject, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn delete_row_removes_entirely() {
        let kv = MemKv::new();
        with_update(&kv, |tx| {
            let mut log = tx.bucket("log")?;
            let p = Primitive {
                id: 3,
                subject: 0,
                predicate: 0,
                object: 0,
                label: 0,
                value: vec![1],
                timestamp: 0,
                deleted: false,
            };
            put_primitive(&mut log, &p)?;
            delete_row(&mut log, 3)?;
            assert!(get_primitive(&log, 3)?.is_none());
            Ok(())
        })
        .unwrap();
    }
}
