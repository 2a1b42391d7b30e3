//! Scan and containment iterators over nodes, all quads, and
//! direction-constrained quads, plus their cost estimates and the single
//! shape-rewrite optimization the core guarantees.
//!
//! Every iterator either walks forward (`next`) or tests membership
//! (`contains`), never both in the same call, and exposes a [`CostEstimate`]
//! so a planner can pick between an unconstrained scan and an
//! index-backed probe without running either.

use crate::error::Result;
use crate::index::QuadIndex;
use crate::kv::Kv;
use crate::model::{Direction, Primitive, PrimaryKey, Ref};
use crate::store::QuadStore;
use std::collections::VecDeque;

/// Number of ids fetched from the log per batch while scanning.
const SCAN_BATCH: u64 = 100;

/// Which primitive kind an [`AllIterator`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Interned nodes (`Primitive::is_node`).
    Node,
    /// Links (`Primitive::is_link`).
    Link,
}

/// Estimated result-set size of an iterator. `exact` is true only when the
/// value is a precise count (a fully-specified index key); partial
/// specifications and unconstrained scans are always estimates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeEstimate {
    /// Estimated or exact cardinality.
    pub value: u64,
    /// Whether `value` is exact.
    pub exact: bool,
}

/// Planner-facing cost estimate for one iterator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    /// Approximate cost of one `contains` probe.
    pub contains_cost: u64,
    /// Approximate cost of one `next` step.
    pub next_cost: u64,
    /// Result-set size estimate.
    pub size: SizeEstimate,
}

/// A scan over every live primitive of one kind (`Node` or `Link`),
/// optionally constrained to links whose `dir` direction equals a fixed id.
pub struct AllIterator<'s, K: Kv> {
    store: &'s QuadStore<K>,
    kind: PrimitiveKind,
    constraint: Option<(Direction, PrimaryKey)>,
    next_id: PrimaryKey,
    horizon: PrimaryKey,
    buffer: VecDeque<Primitive>,
    current: Option<Ref>,
    closed: bool,
}

impl<'s, K: Kv> AllIterator<'s, K> {
    pub(crate) fn new(
        store: &'s QuadStore<K>,
        kind: PrimitiveKind,
        constraint: Option<(Direction, PrimaryKey)>,
    ) -> Result<Self> {
        let horizon = store.horizon()?;
        Ok(Self {
            store,
            kind,
            constraint,
            next_id: 1,
            horizon,
            buffer: VecDeque::new(),
            current: None,
            closed: false,
        })
    }

    fn matches(&self, p: &Primitive) -> bool {
        if p.deleted {
            return false;
        }
        let kind_ok = match self.kind {
            PrimitiveKind::Node => p.is_node(),
            PrimitiveKind::Link => p.is_link(),
        };
        if !kind_ok {
            return false;
        }
        if let Some((dir, id)) = self.constraint {
            if p.direction_id(dir) != id {
                return false;
            }
        }
        true
    }

    /// Advances to the next matching primitive. Returns `false` once the
    /// scan is exhausted or the iterator has been closed.
    pub fn next(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        loop {
            if let Some(p) = self.buffer.pop_front() {
                self.current = Some(match self.kind {
                    PrimitiveKind::Node => Ref::Node(p.id),
                    PrimitiveKind::Link => Ref::Link(p),
                });
                return Ok(true);
            }
            if self.next_id > self.horizon {
                self.current = None;
                return Ok(false);
            }
            let end = (self.next_id + SCAN_BATCH - 1).min(self.horizon);
            let ids: Vec<PrimaryKey> = (self.next_id..=end).collect();
            self.next_id = end + 1;
            for p in self
                .store
                .fetch_primitives_batch(&ids)?
                .into_iter()
                .flatten()
            {
                if self.matches(&p) {
                    self.buffer.push_back(p);
                }
            }
        }
    }

    /// Tests whether `r` would be yielded by this iterator, without
    /// disturbing the current scan position.
    pub fn contains(&mut self, r: &Ref) -> Result<bool> {
        let id = r.id();
        if id == 0 || id > self.horizon {
            return Ok(false);
        }
        let Some(p) = self.store.fetch_primitive(id)? else {
            return Ok(false);
        };
        let ok = self.matches(&p);
        if ok {
            self.current = Some(match self.kind {
                PrimitiveKind::Node => Ref::Node(p.id),
                PrimitiveKind::Link => Ref::Link(p),
            });
        }
        Ok(ok)
    }

    /// The ref produced by the most recent successful `next`/`contains`.
    pub fn result(&self) -> Option<&Ref> {
        self.current.as_ref()
    }

    /// Marks this iterator closed; subsequent `next` calls return `false`.
    pub fn close(&mut self) {
        self.closed = true;
        self.buffer.clear();
    }

    /// Cost statistics. The global count is never exact for an unconstrained
    /// or direction-constrained full scan, since the log may contain
    /// tombstoned entries that are skipped without being counted up front.
    pub fn cost(&self) -> Result<CostEstimate> {
        Ok(CostEstimate {
            contains_cost: 1,
            next_cost: SCAN_BATCH,
            size: SizeEstimate {
                value: self.horizon,
                exact: false,
            },
        })
    }
}

/// A scan over the link ids posted under one or more keys of a covering
/// [`QuadIndex`], or (when no index covers the constrained direction) a
/// full-log scan constrained by direction.
pub enum QuadIterator<'s, K: Kv> {
    /// Backed by a covering index's posting list.
    Indexed(IndexedQuadIterator<'s, K>),
    /// No covering index for this direction; degrades to a constrained
    /// full-log scan.
    Unindexed(AllIterator<'s, K>),
}

impl<'s, K: Kv> QuadIterator<'s, K> {
    pub(crate) fn new(store: &'s QuadStore<K>, index: QuadIndex, vals: Vec<PrimaryKey>) -> Self {
        QuadIterator::Indexed(IndexedQuadIterator::new(store, index, vals))
    }

    pub(crate) fn unindexed(store: &'s QuadStore<K>, dir: Direction, id: PrimaryKey) -> Result<Self> {
        Ok(QuadIterator::Unindexed(AllIterator::new(
            store,
            PrimitiveKind::Link,
            Some((dir, id)),
        )?))
    }

    /// Advances to the next matching link.
    pub fn next(&mut self) -> Result<bool> {
        match self {
            QuadIterator::Indexed(it) => it.next(),
            QuadIterator::Unindexed(it) => it.next(),
        }
    }

    /// Tests whether `r` (a link ref) would be yielded by this iterator.
    pub fn contains(&mut self, r: &Ref) -> Result<bool> {
        match self {
            QuadIterator::Indexed(it) => it.contains(r),
            QuadIterator::Unindexed(it) => it.contains(r),
        }
    }

    /// The ref produced by the most recent successful `next`/`contains`.
    pub fn result(&self) -> Option<&Ref> {
        match self {
            QuadIterator::Indexed(it) => it.result(),
            QuadIterator::Unindexed(it) => it.result(),
        }
    }

    /// Cost statistics; exact for a fully-specified index key.
    pub fn cost(&self) -> Result<CostEstimate> {
        match self {
            QuadIterator::Indexed(it) => it.cost(),
            QuadIterator::Unindexed(it) => it.cost(),
        }
    }
}

/// The indexed half of [`QuadIterator`]: a prefix scan over one
/// [`QuadIndex`]'s bucket.
pub struct IndexedQuadIterator<'s, K: Kv> {
    store: &'s QuadStore<K>,
    index: QuadIndex,
    vals: Vec<PrimaryKey>,
    prefix: Vec<u8>,
    pending: VecDeque<PrimaryKey>,
    scanned: bool,
    current: Option<Ref>,
}

impl<'s, K: Kv> IndexedQuadIterator<'s, K> {
    fn new(store: &'s QuadStore<K>, index: QuadIndex, vals: Vec<PrimaryKey>) -> Self {
        let prefix = index.key(&vals);
        Self {
            store,
            index,
            vals,
            prefix,
            pending: VecDeque::new(),
            scanned: false,
            current: None,
        }
    }

    fn load_pending(&mut self) -> Result<()> {
        let mut entries = self.store.scan_index_prefix(&self.index, &self.prefix)?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut ids: Vec<PrimaryKey> = entries.into_iter().flat_map(|(_, ids)| ids).collect();
        ids.sort_unstable();
        self.pending = ids.into();
        self.scanned = true;
        Ok(())
    }

    pub fn next(&mut self) -> Result<bool> {
        loop {
            if let Some(id) = self.pending.pop_front() {
                if let Some(p) = self.store.fetch_primitive(id)? {
                    if !p.deleted {
                        self.current = Some(Ref::Link(p));
                        return Ok(true);
                    }
                }
                continue;
            }
            if self.scanned {
                self.current = None;
                return Ok(false);
            }
            self.load_pending()?;
        }
    }

    pub fn contains(&mut self, r: &Ref) -> Result<bool> {
        let Ref::Link(candidate) = r else {
            return Ok(false);
        };
        let Some(p) = self.store.fetch_primitive(candidate.id)? else {
            return Ok(false);
        };
        if p.deleted {
            return Ok(false);
        }
        let matches = self
            .index
            .dirs
            .iter()
            .zip(self.vals.iter())
            .all(|(dir, val)| p.direction_id(*dir) == *val);
        if matches {
            self.current = Some(Ref::Link(p));
        }
        Ok(matches)
    }

    pub fn result(&self) -> Option<&Ref> {
        self.current.as_ref()
    }

    pub fn cost(&self) -> Result<CostEstimate> {
        let fully_specified = self.vals.len() == self.index.dirs.len();
        let size = if fully_specified {
            let entries = self.store.scan_index_prefix(&self.index, &self.prefix)?;
            let count: usize = entries.iter().map(|(_, ids)| ids.len()).sum();
            SizeEstimate {
                value: count as u64,
                exact: true,
            }
        } else {
            let store_size = self.store.size()?.max(0) as u64;
            SizeEstimate {
                value: 1 + store_size / 2,
                exact: false,
            }
        };
        Ok(CostEstimate {
            contains_cost: 1,
            next_cost: 2,
            size,
        })
    }
}

/// A fixed, pre-enumerated set of refs. The `optimize` target for a
/// `LinksTo` shape wrapping a single-valued `Fixed` child.
pub struct FixedIterator {
    refs: Vec<Ref>,
    pos: usize,
    current: Option<Ref>,
}

impl FixedIterator {
    pub(crate) fn new(refs: Vec<Ref>) -> Self {
        Self {
            refs,
            pos: 0,
            current: None,
        }
    }

    /// Advances to the next ref in enumeration order.
    pub fn next(&mut self) -> bool {
        if self.pos < self.refs.len() {
            self.current = Some(self.refs[self.pos].clone());
            self.pos += 1;
            true
        } else {
            self.current = None;
            false
        }
    }

    /// Tests whether `r` is a member of the fixed set.
    pub fn contains(&mut self, r: &Ref) -> bool {
        let found = self.refs.iter().any(|x| x == r);
        if found {
            self.current = Some(r.clone());
        }
        found
    }

    /// The ref produced by the most recent successful `next`/`contains`.
    pub fn result(&self) -> Option<&Ref> {
        self.current.as_ref()
    }

    /// Exact cardinality; always known for a fixed set.
    pub fn size(&self) -> SizeEstimate {
        SizeEstimate {
            value: self.refs.len() as u64,
            exact: true,
        }
    }
}

/// A composable query shape, as the planner sees it before (and after)
/// optimization.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Every live node.
    AllNodes,
    /// Every live quad.
    AllQuads,
    /// A pre-enumerated, fixed set of refs.
    Fixed(Vec<Ref>),
    /// Quads whose `dir` direction matches every ref yielded by `child`.
    LinksTo {
        /// Constrained direction.
        dir: Direction,
        /// The shape supplying candidate ids for `dir`.
        child: Box<Shape>,
    },
    /// Quads whose `dir` direction equals `id` exactly, via a covering
    /// index. The only shape `optimize` ever introduces.
    Quad {
        /// Constrained direction.
        dir: Direction,
        /// The id `dir` must equal.
        id: PrimaryKey,
    },
}

/// Rewrites a `LinksTo` shape wrapping a single-valued `Fixed` child into a
/// direct `Quad` shape over the corresponding covering index. This is the
/// only optimization the core guarantees; everything else passes through
/// unchanged.
pub fn optimize(shape: Shape) -> Shape {
    match shape {
        Shape::LinksTo { dir, child } => match *child {
            Shape::Fixed(ref refs) if refs.len() == 1 => Shape::Quad {
                dir,
                id: refs[0].id(),
            },
            other => Shape::LinksTo {
                dir,
                child: Box::new(other),
            },
        },
        other => other,
    }
}
