//! End-to-end scenarios and cross-module invariants, exercised against the
//! in-process `MemKv` reference backend.

use quadstore::config::StoreConfig;
use quadstore::kv::mem::MemKv;
use quadstore::model::{Direction, Quad, Ref, Value};
use quadstore::store::{Action, Delta, IgnoreOptions, QuadStore};
use quadstore::StoreError;

fn iri(s: &str) -> Value {
    Value::Iri(s.to_string())
}

fn add(subject: &str, predicate: &str, object: &str) -> Delta {
    Delta {
        action: Action::Add,
        quad: Quad::new(iri(subject), iri(predicate), iri(object)),
    }
}

fn del(subject: &str, predicate: &str, object: &str) -> Delta {
    Delta {
        action: Action::Delete,
        quad: Quad::new(iri(subject), iri(predicate), iri(object)),
    }
}

fn node_id(store: &QuadStore<MemKv>, v: &Value) -> u64 {
    match store.value_of(v).unwrap().unwrap() {
        Ref::Node(id) => id,
        Ref::Link(_) => unreachable!("value_of never resolves to a link"),
    }
}

fn link_ref(store: &QuadStore<MemKv>, subject: &str, predicate: &str, object: &str) -> Ref {
    let mut iter = store
        .quad_iterator(Direction::Subject, node_id(store, &iri(subject)))
        .unwrap();
    while iter.next().unwrap() {
        if let Some(r @ Ref::Link(p)) = iter.result() {
            if p.predicate == node_id(store, &iri(predicate)) && p.object == node_id(store, &iri(object)) {
                return r.clone();
            }
        }
    }
    panic!("no live link ({subject}, {predicate}, {object})");
}

#[test]
fn s1_basic_round_trip() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();

    assert_eq!(store.size().unwrap(), 1);
    assert_eq!(store.horizon().unwrap(), 4);

    let id_a = node_id(&store, &iri("a"));
    let id_c = node_id(&store, &iri("c"));
    let link = link_ref(&store, "a", "b", "c");

    let subject_index = &store.indexes()[0];
    let entries = store.scan_index_prefix(subject_index, &subject_index.key(&[id_a])).unwrap();
    let ids: Vec<u64> = entries.into_iter().flat_map(|(_, ids)| ids).collect();
    assert_eq!(ids, vec![link.id()]);

    let object_index = &store.indexes()[1];
    let entries = store.scan_index_prefix(object_index, &object_index.key(&[id_c])).unwrap();
    let ids: Vec<u64> = entries.into_iter().flat_map(|(_, ids)| ids).collect();
    assert_eq!(ids, vec![link.id()]);

    let quad = store.quad(&link).unwrap();
    assert_eq!(quad, Quad::new(iri("a"), iri("b"), iri("c")));
}

#[test]
fn s2_duplicate_rejection() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();

    let err = store
        .apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Delta { index: 0, kind } if matches!(*kind, StoreError::QuadExists)
    ));
    assert_eq!(store.size().unwrap(), 1);
    assert_eq!(store.horizon().unwrap(), 4);
}

#[test]
fn s3_shared_predicate() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "d")], IgnoreOptions::default()).unwrap();

    assert_eq!(store.size().unwrap(), 2);

    let id_a = node_id(&store, &iri("a"));
    let subject_index = &store.indexes()[0];
    let entries = store.scan_index_prefix(subject_index, &subject_index.key(&[id_a])).unwrap();
    let mut ids: Vec<u64> = entries.into_iter().flat_map(|(_, ids)| ids).collect();
    ids.sort_unstable();
    assert_eq!(ids.len(), 2);
    let link1 = link_ref(&store, "a", "b", "c").id();
    let link2 = link_ref(&store, "a", "b", "d").id();
    let mut expected = vec![link1, link2];
    expected.sort_unstable();
    assert_eq!(ids, expected);
}

#[test]
fn s4_deletion_with_node_gc() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();
    let id_a = node_id(&store, &iri("a"));
    let id_b = node_id(&store, &iri("b"));
    let id_c = node_id(&store, &iri("c"));
    let link = link_ref(&store, "a", "b", "c");

    store.apply_deltas(&[del("a", "b", "c")], IgnoreOptions::default()).unwrap();

    assert_eq!(store.size().unwrap(), 0);
    assert!(store.value_of(&iri("a")).unwrap().is_none());
    assert!(store.value_of(&iri("b")).unwrap().is_none());
    assert!(store.value_of(&iri("c")).unwrap().is_none());
    assert!(store.fetch_primitive(id_a).unwrap().is_none());
    assert!(store.fetch_primitive(id_b).unwrap().is_none());
    assert!(store.fetch_primitive(id_c).unwrap().is_none());

    let tombstone = store.fetch_primitive(link.id()).unwrap().unwrap();
    assert!(tombstone.deleted);

    for index in store.indexes() {
        let entries = store.scan_index_prefix(index, &[]).unwrap();
        for (_, ids) in entries {
            assert!(!ids.contains(&link.id()));
        }
    }
}

#[test]
fn s5_iterator_cost_is_exact_for_a_fully_specified_index_key() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    let deltas: Vec<Delta> = (0..1000)
        .map(|i| add("s", "p", &format!("o{i}")))
        .collect();
    store.apply_deltas(&deltas, IgnoreOptions::default()).unwrap();

    let id_s = node_id(&store, &iri("s"));
    let mut iter = store.quad_iterator(Direction::Subject, id_s).unwrap();
    let cost = iter.cost().unwrap();
    assert_eq!(cost.size.value, 1000);
    assert!(cost.size.exact);

    let mut ids = Vec::new();
    while iter.next().unwrap() {
        if let Some(Ref::Link(p)) = iter.result() {
            ids.push(p.id);
        }
    }
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 1000);
}

#[test]
fn s6_batched_deletion_with_ignore_missing() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();

    let opts = IgnoreOptions {
        ignore_dup: false,
        ignore_missing: true,
    };
    store
        .apply_deltas(&[del("a", "b", "c"), del("x", "y", "z")], opts)
        .unwrap();

    assert_eq!(store.size().unwrap(), 0);
    assert!(store.value_of(&iri("a")).unwrap().is_none());
    assert!(store.value_of(&iri("x")).unwrap().is_none());
}

// --- Invariants ---

#[test]
fn invariant_round_trip_of_the_log() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();
    let link = link_ref(&store, "a", "b", "c");
    let fetched = store.fetch_primitive(link.id()).unwrap().unwrap();
    assert_eq!(fetched.id, link.id());
    assert!(!fetched.deleted);
}

#[test]
fn invariant_id_monotonicity() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();
    let horizon1 = store.horizon().unwrap();
    store.apply_deltas(&[add("a", "b", "d")], IgnoreOptions::default()).unwrap();
    let horizon2 = store.horizon().unwrap();
    assert!(horizon2 > horizon1);
}

#[test]
fn invariant_node_interning_uniqueness() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c"), add("a", "b", "d")], IgnoreOptions::default()).unwrap();
    // "a" and "b" are each referenced twice but must resolve to one id.
    let id_a_1 = node_id(&store, &iri("a"));
    let id_a_2 = node_id(&store, &iri("a"));
    assert_eq!(id_a_1, id_a_2);
}

#[test]
fn invariant_refcount_correctness_via_gc_threshold() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c"), add("a", "b", "d")], IgnoreOptions::default()).unwrap();
    // "a" and "b" each carry a refcount of 2; deleting one quad must leave
    // them live (refcount 1), not collected.
    store.apply_deltas(&[del("a", "b", "c")], IgnoreOptions::default()).unwrap();
    assert!(store.value_of(&iri("a")).unwrap().is_some());
    assert!(store.value_of(&iri("b")).unwrap().is_some());
    assert!(store.value_of(&iri("c")).unwrap().is_none());
    store.apply_deltas(&[del("a", "b", "d")], IgnoreOptions::default()).unwrap();
    assert!(store.value_of(&iri("a")).unwrap().is_none());
    assert!(store.value_of(&iri("b")).unwrap().is_none());
}

#[test]
fn invariant_index_completeness() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    let deltas: Vec<Delta> = (0..50).map(|i| add(&format!("s{i}"), "p", "o")).collect();
    store.apply_deltas(&deltas, IgnoreOptions::default()).unwrap();

    let mut iter = store.quads_all_iterator().unwrap();
    let mut all_ids = Vec::new();
    while iter.next().unwrap() {
        if let Some(Ref::Link(p)) = iter.result() {
            all_ids.push(p.id);
        }
    }
    assert_eq!(all_ids.len(), 50);

    for i in 0..50 {
        let id_s = node_id(&store, &iri(&format!("s{i}")));
        let mut idx_iter = store.quad_iterator(Direction::Subject, id_s).unwrap();
        let mut found = 0;
        while idx_iter.next().unwrap() {
            found += 1;
        }
        assert_eq!(found, 1, "subject index missing a link for s{i}");
    }
}

#[test]
fn invariant_bloom_soundness_no_false_negative_after_add() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();
    // A second add of the same quad must be detected as a duplicate, which
    // can only happen if the bloom filter reports a positive for it.
    let err = store
        .apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::Delta { .. }));
}

#[test]
fn invariant_idempotence_under_ignore_dup() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    let opts = IgnoreOptions {
        ignore_dup: true,
        ignore_missing: false,
    };
    store.apply_deltas(&[add("a", "b", "c")], opts).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], opts).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], opts).unwrap();
    assert_eq!(store.size().unwrap(), 1);
    assert!(store.value_of(&iri("a")).unwrap().is_some());
}

#[test]
fn intra_batch_duplicate_add_is_rejected_like_any_other_duplicate() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    // Both deltas reference entirely fresh nodes, so neither can be caught
    // by a pre-existing-link check; the duplicate must be caught against
    // the other delta in the same batch instead.
    let batch = vec![add("a", "b", "c"), add("a", "b", "c")];
    let err = store.apply_deltas(&batch, IgnoreOptions::default()).unwrap_err();
    assert!(matches!(err, StoreError::Delta { index: 1, .. }));
    assert_eq!(store.size().unwrap(), 0);
}

#[test]
fn intra_batch_duplicate_add_with_ignore_dup_creates_one_link() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    let opts = IgnoreOptions {
        ignore_dup: true,
        ignore_missing: false,
    };
    let batch = vec![add("a", "b", "c"), add("a", "b", "c")];
    store.apply_deltas(&batch, opts).unwrap();
    assert_eq!(store.size().unwrap(), 1);
}

#[test]
fn invariant_atomicity_a_failing_batch_leaves_no_partial_effect() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();
    let horizon_before = store.horizon().unwrap();

    // Second delta in this batch duplicates a live quad with ignore_dup
    // unset, so the whole batch must fail and the first delta's otherwise
    // valid effect must not be observable.
    let batch = vec![add("x", "y", "z"), add("a", "b", "c")];
    let err = store.apply_deltas(&batch, IgnoreOptions::default()).unwrap_err();
    assert!(matches!(err, StoreError::Delta { index: 1, .. }));

    assert_eq!(store.size().unwrap(), 1);
    assert_eq!(store.horizon().unwrap(), horizon_before);
    assert!(store.value_of(&iri("x")).unwrap().is_none());
}

#[test]
fn invariant_commit_ordering_links_get_increasing_timestamps() {
    let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "c")], IgnoreOptions::default()).unwrap();
    store.apply_deltas(&[add("a", "b", "d")], IgnoreOptions::default()).unwrap();

    let link1 = link_ref(&store, "a", "b", "c");
    let link2 = link_ref(&store, "a", "b", "d");
    let p1 = store.fetch_primitive(link1.id()).unwrap().unwrap();
    let p2 = store.fetch_primitive(link2.id()).unwrap().unwrap();
    assert!(p2.timestamp > p1.timestamp);
}
