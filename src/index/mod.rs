//! Composable quad indexes over directions, and the in-transaction write
//! buffer that defers index mutations to a single sorted flush at commit
//! time.
//!
//! Each [`QuadIndex`] covers an ordered subset of directions and stores,
//! per distinct combination of those directions' ids, a sorted posting
//! list of link ids. Writes during a transaction accumulate in an
//! [`IndexBuffer`] (load-on-miss, flush-on-commit) instead of touching the
//! KV bucket on every insert/remove.

use crate::error::Result;
use crate::kv::Tx;
use crate::model::{Direction, Primitive, PrimaryKey};
use rustc_hash::FxHashMap;

/// A description of one quad index: the ordered directions it covers and
/// whether it is declared unique (at most one live link per key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadIndex {
    /// Directions covered, in key order.
    pub dirs: Vec<Direction>,
    /// Whether the write pipeline may assume at most one matching link.
    pub unique: bool,
}

impl QuadIndex {
    /// A non-unique index over a single direction.
    pub fn single(dir: Direction) -> Self {
        Self {
            dirs: vec![dir],
            unique: false,
        }
    }

    /// The default index set: one on `Subject`, one on `Object`.
    pub fn defaults() -> Vec<QuadIndex> {
        vec![Self::single(Direction::Subject), Self::single(Direction::Object)]
    }

    /// Bucket name: the concatenation of each covered direction's
    /// single-byte prefix, e.g. `"s"` or `"po"`.
    pub fn bucket_name(&self) -> String {
        self.dirs
            .iter()
            .map(|d| d.prefix() as char)
            .collect()
    }

    /// Builds the composite key for an explicit list of ids (used for
    /// partial-specification scans, where `vals.len() <= self.dirs.len()`).
    pub fn key(&self, vals: &[PrimaryKey]) -> Vec<u8> {
        let mut out = Vec::with_capacity(vals.len() * 8);
        for v in vals {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out
    }

    /// Builds the full composite key for `link`, reading one id per
    /// covered direction.
    pub fn key_for(&self, link: &Primitive) -> Vec<u8> {
        let vals: Vec<PrimaryKey> = self.dirs.iter().map(|d| link.direction_id(*d)).collect();
        self.key(&vals)
    }
}

/// Encodes a sorted list of link ids as concatenated big-endian u64s. A
/// true varint encoding is not used here (trading a few bytes per entry)
/// so appends and binary searches stay simple arithmetic over fixed-width
/// records.
pub fn encode_id_list(ids: &[PrimaryKey]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ids.len() * 8);
    for id in ids {
        out.extend_from_slice(&id.to_be_bytes());
    }
    out
}

/// Decodes a list previously produced by [`encode_id_list`].
pub fn decode_id_list(bytes: &[u8]) -> Vec<PrimaryKey> {
    bytes
        .chunks_exact(8)
        .map(|c| u64::from_be_bytes(c.try_into().unwrap()))
        .collect()
}

fn insert_sorted(list: &mut Vec<PrimaryKey>, id: PrimaryKey) {
    match list.binary_search(&id) {
        Ok(_) => {}
        Err(pos) => list.insert(pos, id),
    }
}

fn remove_sorted(list: &mut Vec<PrimaryKey>, id: PrimaryKey) {
    if let Ok(pos) = list.binary_search(&id) {
        list.remove(pos);
    }
}

/// Per-transaction buffer deferring index writes to a single sorted pass
/// at commit time. Reused across batches where possible to reduce
/// allocator pressure.
#[derive(Default)]
pub struct IndexBuffer {
    entries: FxHashMap<(String, Vec<u8>), Vec<PrimaryKey>>,
}

impl IndexBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_load<T: Tx>(
        &mut self,
        tx: &mut T,
        bucket_name: &str,
        key: &[u8],
    ) -> Result<&mut Vec<PrimaryKey>> {
        let entry_key = (bucket_name.to_string(), key.to_vec());
        if !self.entries.contains_key(&entry_key) {
            let bucket = tx.bucket(bucket_name)?;
            let existing = bucket
                .get(key)?
                .map(|b| decode_id_list(&b))
                .unwrap_or_default();
            self.entries.insert(entry_key.clone(), existing);
        }
        Ok(self.entries.get_mut(&entry_key).unwrap())
    }

    /// Buffers insertion of `link.id` into every configured index.
    pub fn insert_link<T: Tx>(
        &mut self,
        tx: &mut T,
        indexes: &[QuadIndex],
        link: &Primitive,
    ) -> Result<()> {
        for index in indexes {
            let key = index.key_for(link);
            let list = self.get_or_load(tx, &index.bucket_name(), &key)?;
            insert_sorted(list, link.id);
        }
        Ok(())
    }

    /// Buffers removal of `link.id` from every configured index.
    pub fn remove_link<T: Tx>(
        &mut self,
        tx: &mut T,
        indexes: &[QuadIndex],
        link: &Primitive,
    ) -> Result<()> {
        for index in indexes {
            let key = index.key_for(link);
            let list = self.get_or_load(tx, &index.bucket_name(), &key)?;
            remove_sorted(list, link.id);
        }
        Ok(())
    }

    /// Flushes every buffered key to the KV in sorted key order, writing a
    /// non-empty list or deleting the key if the list became empty.
    pub fn flush<T: Tx>(&mut self, tx: &mut T) -> Result<()> {
        let mut keys: Vec<(String, Vec<u8>)> = self.entries.keys().cloned().collect();
        keys.sort();
        for entry_key in keys {
            let list = self.entries.remove(&entry_key).unwrap();
            let mut bucket = tx.bucket(&entry_key.0)?;
            if list.is_empty() {
                bucket.del(&entry_key.1)?;
            } else {
                bucket.put(&entry_key.1, &encode_id_list(&list))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::mem::MemKv;
    use crate::kv::with_update;

    fn link(id: PrimaryKey, subject: PrimaryKey, object: PrimaryKey) -> Primitive {
        Primitive {
            id,
            subject,
            predicate: 0,
            object,
            label: 0,
            value: Vec::new(),
            timestamp: 0,
            deleted: false,
        }
    }

    #[test]
    fn id_list_round_trips_and_stays_sorted() {
        let encoded = encode_id_list(&[1, 5, 9]);
        assert_eq!(decode_id_list(&encoded), vec![1, 5, 9]);
    }

    #[test]
    fn bucket_name_concatenates_direction_prefixes() {
        let idx = QuadIndex {
            dirs: vec![Direction::Predicate, Direction::Object],
            unique: false,
        };
        assert_eq!(idx.bucket_name(), "po");
    }

    #[test]
    fn insert_then_flush_is_visible_and_sorted_ascending() {
        let kv = MemKv::new();
        let indexes = QuadIndex::defaults();
        with_update(&kv, |tx| {
            let mut buffer = IndexBuffer::new();
            buffer.insert_link(tx, &indexes, &link(10, 1, 2))?;
            buffer.insert_link(tx, &indexes, &link(5, 1, 3))?;
            buffer.flush(tx)?;

            let subject_index = &indexes[0];
            let bucket = tx.bucket(&subject_index.bucket_name())?;
            let raw = bucket.get(&subject_index.key(&[1])).unwrap().unwrap();
            assert_eq!(decode_id_list(&raw), vec![5, 10]);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn remove_drops_key_when_list_becomes_empty() {
        let kv = MemKv::new();
        let indexes = QuadIndex::defaults();
        with_update(&kv, |tx| {
            let mut buffer = IndexBuffer::new();
            buffer.insert_link(tx, &indexes, &link(1, 7, 8))?;
            buffer.flush(tx)?;
            Ok(())
        })
        .unwrap();

        with_update(&kv, |tx| {
            let mut buffer = IndexBuffer::new();
            buffer.remove_link(tx, &indexes, &link(1, 7, 8))?;
            buffer.flush(tx)?;

            let subject_index = &indexes[0];
            let bucket = tx.bucket(&subject_index.bucket_name())?;
            assert!(bucket.get(&subject_index.key(&[7])).unwrap().is_none());
            Ok(())
        })
        .unwrap();
    }
}
