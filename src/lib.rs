//! # quadstore
//!
//! A KV-backed RDF-style quad store: the layer that lifts a generic ordered
//! key-value engine into a graph store with node interning, quad indexing,
//! duplicate suppression, incremental write application, iterator
//! composition, and query-planner-friendly cost statistics.
//!
//! ## Quick start
//!
//! ```
//! use quadstore::config::StoreConfig;
//! use quadstore::kv::mem::MemKv;
//! use quadstore::model::{Quad, Value};
//! use quadstore::store::{Action, Delta, IgnoreOptions, QuadStore};
//!
//! let store = QuadStore::init(MemKv::new(), StoreConfig::default()).unwrap();
//! let quad = Quad::new(
//!     Value::Iri("http://example.org/a".into()),
//!     Value::Iri("http://example.org/b".into()),
//!     Value::Iri("http://example.org/c".into()),
//! );
//! store
//!     .apply_deltas(
//!         &[Delta { action: Action::Add, quad }],
//!         IgnoreOptions::default(),
//!     )
//!     .unwrap();
//! assert_eq!(store.size().unwrap(), 1);
//! ```
//!
//! ## Architecture
//!
//! The crate is layered leaves-first:
//! - [`kv`] — the abstract transactional bucketed byte store the rest of the
//!   crate is built on, plus an in-process reference implementation.
//! - [`codec`] — the wire format for [`model::Value`] and [`model::Primitive`],
//!   and the content hash used throughout.
//! - [`cache`] — the advisory IRI -> id LRU cache.
//! - [`bloom`] — the deletable counting bloom filter backing existence checks.
//! - [`log`] — the append-only primitive log and `meta` counters.
//! - [`interner`] — node interning and refcount bookkeeping.
//! - [`index`] — quad indexes and the in-transaction write buffer.
//! - [`store`] — the write pipeline (`apply_deltas`) and external interface.
//! - [`iterators`] — scan/containment iterators and cost estimates.
//!
//! Ambient concerns ([`error`], [`config`], [`logging`], [`clock`]) are
//! carried throughout regardless of which graph features are in scope.

pub mod bloom;
pub mod cache;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod interner;
pub mod iterators;
pub mod kv;
pub mod log;
pub mod logging;
pub mod model;
pub mod store;

pub use crate::error::{Result, StoreError};
pub use crate::model::{Direction, Primitive, PrimaryKey, Quad, Ref, Value};
pub use crate::store::{Action, Delta, IgnoreOptions, QuadStore};
