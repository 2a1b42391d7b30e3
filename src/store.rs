//! The write pipeline (`apply_deltas`) and the store's external interface:
//! `init`/`open`, `size`/`horizon`, node/quad translation, and iterator
//! constructors.
//!
//! A single entry point owns the meta counters, the node index, and the
//! quad indexes behind one writer lock: writes are serialized through
//! [`QuadStore::apply_deltas`], while readers take a snapshot of the
//! shared value cache and bloom filter state without ever blocking on
//! that lock.

use crate::bloom::BloomFilter;
use crate::cache::ValueCache;
use crate::codec::{self, hash_value, Hash};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::index::{IndexBuffer, QuadIndex};
use crate::interner::{self, InternResult};
use crate::kv::{with_update, with_view, Bucket, Kv, Tx};
use crate::log;
use crate::model::{Direction, Primitive, PrimaryKey, Quad, Ref, Value};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

/// Batch action for one [`Delta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Insert the quad, subject to duplicate suppression.
    Add,
    /// Remove the quad, subject to existence checking.
    Delete,
}

/// One write instruction in an [`QuadStore::apply_deltas`] batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    /// Whether this delta adds or removes `quad`.
    pub action: Action,
    /// The quad affected.
    pub quad: Quad,
}

/// Per-batch suppression flags for otherwise-fatal delta outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreOptions {
    /// Treat an `Add` of an already-live quad as a no-op instead of failing
    /// the batch with [`StoreError::QuadExists`].
    pub ignore_dup: bool,
    /// Treat a `Delete` of a non-existent quad as a no-op instead of failing
    /// the batch with [`StoreError::QuadNotExist`].
    pub ignore_missing: bool,
}

fn delta_err(index: usize, kind: StoreError) -> StoreError {
    StoreError::Delta {
        index,
        kind: Box::new(kind),
    }
}

/// The four direction hashes of one delta's quad, computed once up front and
/// reused across the refcount aggregation, interning, and revert passes.
struct DirHashes {
    subject: Hash,
    predicate: Hash,
    object: Hash,
    label: Option<Hash>,
}

/// The KV-backed quad store: node interning, quad indexes, the primitive
/// log, and the shared bloom filter / value cache that back them.
pub struct QuadStore<K: Kv> {
    kv: K,
    indexes: Vec<QuadIndex>,
    bloom: BloomFilter,
    cache: Mutex<ValueCache>,
    writer_lock: Mutex<()>,
    config: StoreConfig,
}

impl<K: Kv> QuadStore<K> {
    /// One-time initialization of a fresh backend. Fails with
    /// [`StoreError::DatabaseExists`] if `meta` already carries a version.
    pub fn init(kv: K, config: StoreConfig) -> Result<Self> {
        with_update(&kv, |tx| {
            {
                let meta = tx.bucket("meta")?;
                if log::read_version(&meta)?.is_some() {
                    return Err(StoreError::DatabaseExists);
                }
            }
            let mut meta = tx.bucket("meta")?;
            log::write_version(&mut meta, log::LATEST_DATA_VERSION)?;
            log::write_size(&mut meta, 0)
        })?;

        if config.upfront {
            Self::precreate_buckets(&kv)?;
        }

        Ok(Self::assemble(kv, config, BloomFilter::for_quad_store()))
    }

    /// Opens a store previously created with [`Self::init`]. Fails with
    /// [`StoreError::NotInitialized`] or [`StoreError::VersionOutOfDate`].
    pub fn open(kv: K, config: StoreConfig) -> Result<Self> {
        with_view(&kv, |tx| {
            let meta = tx.bucket("meta")?;
            log::check_version(&meta)
        })?;

        let bloom = BloomFilter::for_quad_store();
        with_view(&kv, |tx| {
            let horizon = {
                let meta = tx.bucket("meta")?;
                log::read_horizon(&meta)?
            };
            let log_bucket = tx.bucket("log")?;
            let mut id = 1u64;
            const BATCH: u64 = 100;
            while id <= horizon {
                let end = (id + BATCH - 1).min(horizon);
                let ids: Vec<PrimaryKey> = (id..=end).collect();
                for primitive in log::get_primitives_batch(&log_bucket, &ids)?
                    .into_iter()
                    .flatten()
                {
                    if primitive.is_link() && !primitive.deleted {
                        let key = BloomFilter::key_for(
                            primitive.subject,
                            primitive.predicate,
                            primitive.object,
                        );
                        bloom.add(&key);
                    }
                }
                id = end + 1;
            }
            Ok(())
        })?;

        Ok(Self::assemble(kv, config, bloom))
    }

    fn assemble(kv: K, config: StoreConfig, bloom: BloomFilter) -> Self {
        Self {
            kv,
            indexes: QuadIndex::defaults(),
            bloom,
            cache: Mutex::new(ValueCache::new(config.value_cache_entries)),
            writer_lock: Mutex::new(()),
            config,
        }
    }

    /// Pre-creates every `v/<h0>/<h1>` and `n/<h0>/<h1>` bucket so the first
    /// write touching a given hash prefix never pays bucket-creation cost.
    fn precreate_buckets(kv: &K) -> Result<()> {
        with_update(kv, |tx| {
            for h0 in 0u16..256 {
                for h1 in 0u16..256 {
                    tx.bucket(&format!("v/{h0:02x}/{h1:02x}"))?;
                    tx.bucket(&format!("n/{h0:02x}/{h1:02x}"))?;
                }
            }
            Ok(())
        })
    }

    /// The configured quad indexes (`{Subject}`, `{Object}` by default).
    pub fn indexes(&self) -> &[QuadIndex] {
        &self.indexes
    }

    /// The store's configuration, as passed to [`Self::init`]/[`Self::open`].
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of live (non-deleted) links.
    pub fn size(&self) -> Result<i64> {
        with_view(&self.kv, |tx| {
            let meta = tx.bucket("meta")?;
            log::read_size(&meta)
        })
    }

    /// The largest primitive id ever assigned.
    pub fn horizon(&self) -> Result<PrimaryKey> {
        with_view(&self.kv, |tx| {
            let meta = tx.bucket("meta")?;
            log::read_horizon(&meta)
        })
    }

    /// Fetches a single primitive by id, if its log row still exists.
    pub fn fetch_primitive(&self, id: PrimaryKey) -> Result<Option<Primitive>> {
        with_view(&self.kv, |tx| {
            let log_bucket = tx.bucket("log")?;
            log::get_primitive(&log_bucket, id)
        })
    }

    /// Batched primitive fetch, preserving `ids`' order.
    pub fn fetch_primitives_batch(&self, ids: &[PrimaryKey]) -> Result<Vec<Option<Primitive>>> {
        with_view(&self.kv, |tx| {
            let log_bucket = tx.bucket("log")?;
            log::get_primitives_batch(&log_bucket, ids)
        })
    }

    /// Scans `index`'s bucket for every key carrying `prefix`, decoding each
    /// stored value into its link-id list.
    pub fn scan_index_prefix(
        &self,
        index: &QuadIndex,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<PrimaryKey>)>> {
        with_view(&self.kv, |tx| {
            let bucket = tx.bucket(&index.bucket_name())?;
            Ok(bucket
                .scan_prefix(prefix)?
                .into_iter()
                .map(|(k, v)| (k, crate::index::decode_id_list(&v)))
                .collect())
        })
    }

    /// Resolves `value` to its node id, if it has ever been interned.
    pub fn value_of(&self, value: &Value) -> Result<Option<Ref>> {
        with_view(&self.kv, |tx| {
            let mut cache = self.cache.lock().clone();
            Ok(interner::resolve_existing(tx, &mut cache, value)?.map(Ref::Node))
        })
    }

    /// The [`Value`] a [`Ref`] names. Only meaningful for node refs (or link
    /// refs whose id happens to address a node row, which never occurs for
    /// refs this crate hands out).
    pub fn name_of(&self, r: &Ref) -> Result<Value> {
        with_view(&self.kv, |tx| {
            let log_bucket = tx.bucket("log")?;
            let primitive = log::get_primitive(&log_bucket, r.id())?
                .ok_or(StoreError::NotFound("node"))?;
            if !primitive.is_node() {
                return Err(StoreError::NotFound("node"));
            }
            codec::decode_value(&primitive.value)
        })
    }

    /// [`Self::name_of`] applied to each of `refs`, in order.
    pub fn values_of(&self, refs: &[Ref]) -> Result<Vec<Value>> {
        refs.iter().map(|r| self.name_of(r)).collect()
    }

    /// Reconstructs the full [`Quad`] a link ref represents.
    pub fn quad(&self, r: &Ref) -> Result<Quad> {
        with_view(&self.kv, |tx| {
            let log_bucket = tx.bucket("log")?;
            let link =
                log::get_primitive(&log_bucket, r.id())?.ok_or(StoreError::NotFound("link"))?;
            if !link.is_link() {
                return Err(StoreError::NotFound("link"));
            }
            let node_value = |id: PrimaryKey| -> Result<Value> {
                let node = log::get_primitive(&log_bucket, id)?.ok_or(StoreError::NotFound("node"))?;
                codec::decode_value(&node.value)
            };
            Ok(Quad {
                subject: node_value(link.subject)?,
                predicate: node_value(link.predicate)?,
                object: node_value(link.object)?,
                label: if link.label == 0 {
                    None
                } else {
                    Some(node_value(link.label)?)
                },
            })
        })
    }

    /// The node ref occupying `dir` on the link `r` refers to, or
    /// [`StoreError::NotFound`] if that direction is absent (only `Label`
    /// can be).
    pub fn quad_direction(&self, r: &Ref, dir: Direction) -> Result<Ref> {
        with_view(&self.kv, |tx| {
            let log_bucket = tx.bucket("log")?;
            let link =
                log::get_primitive(&log_bucket, r.id())?.ok_or(StoreError::NotFound("link"))?;
            let id = link.direction_id(dir);
            if id == 0 {
                return Err(StoreError::NotFound("direction"));
            }
            Ok(Ref::Node(id))
        })
    }

    /// Applies a batch of adds/deletes atomically: every delta in `deltas`
    /// either all land or none do. Adds that already exist as live links
    /// and deletes that target a link that is already absent are governed
    /// by `opts.ignore_dup`/`opts.ignore_missing` rather than failing the
    /// whole batch.
    pub fn apply_deltas(&self, deltas: &[Delta], opts: IgnoreOptions) -> Result<()> {
        let _writer_guard = self.writer_lock.lock();
        let mut local_cache = self.cache.lock().clone();
        let mut bloom_adds: Vec<[u8; 24]> = Vec::new();
        let mut bloom_removes: Vec<[u8; 24]> = Vec::new();

        let result = with_update(&self.kv, |tx| {
            self.apply_deltas_tx(tx, &mut local_cache, deltas, &opts, &mut bloom_adds, &mut bloom_removes)
        });

        if let Err(ref err) = result {
            tracing::debug!(batch_len = deltas.len(), %err, "apply_deltas batch rolled back");
        }
        result?;

        *self.cache.lock() = local_cache;
        for key in &bloom_adds {
            self.bloom.add(key);
        }
        for key in &bloom_removes {
            self.bloom.test_and_remove(key);
        }
        tracing::debug!(
            batch_len = deltas.len(),
            links_added = bloom_adds.len(),
            links_removed = bloom_removes.len(),
            "apply_deltas committed"
        );
        Ok(())
    }

    fn apply_deltas_tx<T: Tx>(
        &self,
        tx: &mut T,
        cache: &mut ValueCache,
        deltas: &[Delta],
        opts: &IgnoreOptions,
        bloom_adds: &mut Vec<[u8; 24]>,
        bloom_removes: &mut Vec<[u8; 24]>,
    ) -> Result<()> {
        // Step 1: per-delta direction hashes, aggregated per-hash refcount
        // deltas (+1/-1 per direction reference), and a hash -> Value map
        // wide enough to cover every value this batch ever touches.
        let mut ref_deltas: FxHashMap<Hash, i64> = FxHashMap::default();
        let mut value_by_hash: FxHashMap<Hash, Value> = FxHashMap::default();
        let mut per_delta: Vec<DirHashes> = Vec::with_capacity(deltas.len());

        for delta in deltas {
            let subject = hash_value(&delta.quad.subject);
            let predicate = hash_value(&delta.quad.predicate);
            let object = hash_value(&delta.quad.object);
            let label = delta.quad.label.as_ref().map(hash_value);

            value_by_hash
                .entry(subject)
                .or_insert_with(|| delta.quad.subject.clone());
            value_by_hash
                .entry(predicate)
                .or_insert_with(|| delta.quad.predicate.clone());
            value_by_hash
                .entry(object)
                .or_insert_with(|| delta.quad.object.clone());
            if let (Some(h), Some(v)) = (label, delta.quad.label.as_ref()) {
                value_by_hash.entry(h).or_insert_with(|| v.clone());
            }

            let sign: i64 = match delta.action {
                Action::Add => 1,
                Action::Delete => -1,
            };
            *ref_deltas.entry(subject).or_insert(0) += sign;
            *ref_deltas.entry(predicate).or_insert(0) += sign;
            *ref_deltas.entry(object).or_insert(0) += sign;
            if let Some(h) = label {
                *ref_deltas.entry(h).or_insert(0) += sign;
            }

            per_delta.push(DirHashes {
                subject,
                predicate,
                object,
                label,
            });
        }

        // Step 2: intern every node referenced by an Add delta.
        let mut add_hashes: FxHashMap<Hash, Value> = FxHashMap::default();
        for delta in deltas.iter().filter(|d| d.action == Action::Add) {
            let subject = hash_value(&delta.quad.subject);
            let predicate = hash_value(&delta.quad.predicate);
            let object = hash_value(&delta.quad.object);
            add_hashes.entry(subject).or_insert_with(|| delta.quad.subject.clone());
            add_hashes
                .entry(predicate)
                .or_insert_with(|| delta.quad.predicate.clone());
            add_hashes.entry(object).or_insert_with(|| delta.quad.object.clone());
            if let Some(label) = &delta.quad.label {
                add_hashes.entry(hash_value(label)).or_insert_with(|| label.clone());
            }
        }
        let mut resolved: FxHashMap<Hash, InternResult> = FxHashMap::default();
        for (hash, value) in &add_hashes {
            resolved.insert(*hash, interner::resolve_or_create(tx, cache, value)?);
        }
        let mut id_by_hash: FxHashMap<Hash, PrimaryKey> =
            resolved.iter().map(|(h, r)| (*h, r.id)).collect();

        // Step 3: for each Add delta, resolve ids and suppress duplicates.
        struct PendingLink {
            subject: PrimaryKey,
            predicate: PrimaryKey,
            object: PrimaryKey,
            label: PrimaryKey,
        }
        let mut pending_links: Vec<PendingLink> = Vec::new();
        let mut enqueued_this_batch: FxHashSet<(PrimaryKey, PrimaryKey, PrimaryKey, PrimaryKey)> =
            FxHashSet::default();

        for (i, delta) in deltas.iter().enumerate() {
            if delta.action != Action::Add {
                continue;
            }
            let hashes = &per_delta[i];
            let subject_r = resolved[&hashes.subject];
            let predicate_r = resolved[&hashes.predicate];
            let object_r = resolved[&hashes.object];
            let label_r = hashes.label.map(|h| resolved[&h]);
            let label_id = label_r.map(|r| r.id).unwrap_or(0);
            let any_new = subject_r.is_new
                || predicate_r.is_new
                || object_r.is_new
                || label_r.map(|r| r.is_new).unwrap_or(false);

            let key = (subject_r.id, predicate_r.id, object_r.id, label_id);

            // A node being "new" only rules out a duplicate already committed
            // to the log; an earlier delta in this same batch may have
            // already queued the identical quad for that same new node.
            let duplicate_in_batch = enqueued_this_batch.contains(&key);

            let existing = if duplicate_in_batch {
                Some(0)
            } else if any_new {
                None
            } else {
                has_primitive(
                    tx,
                    &self.indexes,
                    &self.bloom,
                    subject_r.id,
                    predicate_r.id,
                    object_r.id,
                    label_id,
                )?
            };

            if let Some(_existing_id) = existing {
                if !opts.ignore_dup {
                    return Err(delta_err(i, StoreError::QuadExists));
                }
                // Already live (or already queued this batch): revert this
                // delta's refcount contribution so the no-op add leaves
                // every node's count unchanged.
                revert_delta_refs(&mut ref_deltas, &per_delta[i], -1);
            } else {
                enqueued_this_batch.insert(key);
                pending_links.push(PendingLink {
                    subject: subject_r.id,
                    predicate: predicate_r.id,
                    object: object_r.id,
                    label: label_id,
                });
            }
        }

        // Step 4: allocate ids for genuinely new links and write them.
        let mut size_delta: i64 = 0;
        let mut index_buffer = IndexBuffer::new();

        if !pending_links.is_empty() {
            let first_id = {
                let mut meta = tx.bucket("meta")?;
                log::gen_ids(&mut meta, pending_links.len() as u64)?
            };
            let timestamp = crate::clock::now_nanos();
            let mut log_bucket = tx.bucket("log")?;
            for (offset, pending) in pending_links.iter().enumerate() {
                let link = Primitive {
                    id: first_id + offset as u64,
                    subject: pending.subject,
                    predicate: pending.predicate,
                    object: pending.object,
                    label: pending.label,
                    value: Vec::new(),
                    timestamp,
                    deleted: false,
                };
                log::put_primitive(&mut log_bucket, &link)?;
                index_buffer.insert_link(tx, &self.indexes, &link)?;
                bloom_adds.push(BloomFilter::key_for(link.subject, link.predicate, link.object));
                size_delta += 1;
            }
        }

        // Step 5: for each Delete delta, resolve and tombstone or suppress.
        for (i, delta) in deltas.iter().enumerate() {
            if delta.action != Action::Delete {
                continue;
            }
            let hashes = &per_delta[i];
            let subject_id = interner::resolve_existing(tx, cache, &delta.quad.subject)?;
            let predicate_id = interner::resolve_existing(tx, cache, &delta.quad.predicate)?;
            let object_id = interner::resolve_existing(tx, cache, &delta.quad.object)?;
            let label_id = match &delta.quad.label {
                Some(label_value) => interner::resolve_existing(tx, cache, label_value)?,
                None => Some(0),
            };

            if let Some(id) = subject_id {
                id_by_hash.insert(hashes.subject, id);
            }
            if let Some(id) = predicate_id {
                id_by_hash.insert(hashes.predicate, id);
            }
            if let Some(id) = object_id {
                id_by_hash.insert(hashes.object, id);
            }
            if let (Some(h), Some(id)) = (hashes.label, label_id) {
                if id != 0 {
                    id_by_hash.insert(h, id);
                }
            }

            let fully_resolved = subject_id.zip(predicate_id).zip(object_id).zip(label_id);
            let existing = match fully_resolved {
                Some((((s, p), o), l)) => {
                    has_primitive(tx, &self.indexes, &self.bloom, s, p, o, l)?
                }
                None => None,
            };

            match existing {
                Some(link_id) => {
                    let label_id_val = label_id.unwrap_or(0);
                    let link = Primitive {
                        id: link_id,
                        subject: subject_id.unwrap(),
                        predicate: predicate_id.unwrap(),
                        object: object_id.unwrap(),
                        label: label_id_val,
                        value: Vec::new(),
                        timestamp: 0,
                        deleted: true,
                    };
                    {
                        let mut log_bucket = tx.bucket("log")?;
                        log::tombstone_link(&mut log_bucket, link_id)?;
                    }
                    index_buffer.remove_link(tx, &self.indexes, &link)?;
                    bloom_removes.push(BloomFilter::key_for(link.subject, link.predicate, link.object));
                    size_delta -= 1;
                }
                None => {
                    if !opts.ignore_missing {
                        return Err(delta_err(i, StoreError::QuadNotExist));
                    }
                    revert_delta_refs(&mut ref_deltas, hashes, 1);
                }
            }
        }

        // Step 6: apply the net refcount deltas, garbage-collecting nodes
        // whose count drops to zero.
        let mut hashes: Vec<Hash> = ref_deltas.keys().copied().collect();
        hashes.sort_unstable();
        for hash in hashes {
            let delta = ref_deltas[&hash];
            if delta == 0 {
                continue;
            }
            let Some(&id) = id_by_hash.get(&hash) else {
                continue;
            };
            interner::apply_ref_delta(tx, cache, &hash, id, delta)?;
            if delta < 0 {
                if let Some(value) = value_by_hash.get(&hash) {
                    if let Some(iri) = value.as_iri() {
                        // Node GC inside `apply_ref_delta` cannot know which
                        // IRI to evict from the cache; do it here where the
                        // originating Value is still in scope.
                        let still_live = {
                            let n_bucket =
                                tx.bucket(&format!("n/{:02x}/{:02x}", hash[0], hash[1]))?;
                            n_bucket.get(&hash)?.is_some()
                        };
                        if !still_live {
                            cache.del(iri);
                        }
                    }
                }
            }
        }

        // Step 7: flush buffered index writes, then update `size`.
        index_buffer.flush(tx)?;
        let mut meta = tx.bucket("meta")?;
        log::adjust_size(&mut meta, size_delta)?;
        Ok(())
    }

    /// A scan iterator over every live, non-tombstoned node.
    pub fn nodes_all_iterator(&self) -> Result<crate::iterators::AllIterator<'_, K>> {
        crate::iterators::AllIterator::new(self, crate::iterators::PrimitiveKind::Node, None)
    }

    /// A scan iterator over every live quad.
    pub fn quads_all_iterator(&self) -> Result<crate::iterators::AllIterator<'_, K>> {
        crate::iterators::AllIterator::new(self, crate::iterators::PrimitiveKind::Link, None)
    }

    /// A scan iterator over every live quad whose `dir` direction equals
    /// `id`, using the covering [`QuadIndex`] when one exists.
    pub fn quad_iterator(&self, dir: Direction, id: PrimaryKey) -> Result<crate::iterators::QuadIterator<'_, K>> {
        match self.indexes.iter().find(|idx| idx.dirs == [dir]) {
            Some(index) => Ok(crate::iterators::QuadIterator::new(self, index.clone(), vec![id])),
            None => {
                // No covering index: fall back to a full scan constrained to
                // `dir == id`, expressed through `AllIterator`'s constraint.
                crate::iterators::QuadIterator::unindexed(self, dir, id)
            }
        }
    }

    /// A fixed, pre-enumerated set of refs, used by query composition and as
    /// the target of the `LinksTo`/`Fixed` optimization.
    pub fn fixed_iterator(&self, refs: Vec<Ref>) -> crate::iterators::FixedIterator {
        crate::iterators::FixedIterator::new(refs)
    }
}

fn revert_delta_refs(ref_deltas: &mut FxHashMap<Hash, i64>, hashes: &DirHashes, amount: i64) {
    *ref_deltas.entry(hashes.subject).or_insert(0) += amount;
    *ref_deltas.entry(hashes.predicate).or_insert(0) += amount;
    *ref_deltas.entry(hashes.object).or_insert(0) += amount;
    if let Some(h) = hashes.label {
        *ref_deltas.entry(h).or_insert(0) += amount;
    }
}

/// Resolves whether a live link with the given direction ids already
/// exists, consulting the bloom filter first (a negative is authoritative)
/// and falling back to an index intersection + log comparison on a hit.
pub(crate) fn has_primitive<T: Tx>(
    tx: &mut T,
    indexes: &[QuadIndex],
    bloom: &BloomFilter,
    subject: PrimaryKey,
    predicate: PrimaryKey,
    object: PrimaryKey,
    label: PrimaryKey,
) -> Result<Option<PrimaryKey>> {
    let bloom_key = BloomFilter::key_for(subject, predicate, object);
    if !bloom.test(&bloom_key) {
        return Ok(None);
    }

    let candidate = Primitive {
        id: 0,
        subject,
        predicate,
        object,
        label,
        value: Vec::new(),
        timestamp: 0,
        deleted: false,
    };

    let index = indexes
        .iter()
        .find(|idx| idx.unique)
        .unwrap_or(&indexes[0]);
    let key = index.key_for(&candidate);
    let ids = {
        let bucket = tx.bucket(&index.bucket_name())?;
        match bucket.get(&key)? {
            Some(bytes) => crate::index::decode_id_list(&bytes),
            None => {
                tracing::warn!(subject, predicate, object, "bloom hit with no covering index entry");
                return Ok(None);
            }
        }
    };

    let log_bucket = tx.bucket("log")?;
    for id in ids {
        if let Some(primitive) = log::get_primitive(&log_bucket, id)? {
            if !primitive.deleted && primitive.is_same_link(&candidate) {
                return Ok(Some(id));
            }
        }
    }
    tracing::warn!(
        subject,
        predicate,
        object,
        "bloom filter false positive: index entries present but none matched a live link"
    );
    Ok(None)
}
