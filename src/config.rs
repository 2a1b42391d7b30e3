//! Store configuration: a `Default` impl for local development plus named
//! presets, with an optional TOML file to override individual fields.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options recognized by [`crate::store::QuadStore::init`] and
/// [`crate::store::QuadStore::open`], per the external-interfaces contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Pre-create all 65,536 `v/`+`n/` bucket pairs during `init` to avoid
    /// later bucket creation on the hot path.
    pub upfront: bool,
    /// Forwarded to the underlying KV engine; trades durability for
    /// throughput.
    pub nosync: bool,
    /// Advisory page-cache hint passed through to the KV backend.
    pub cache_size_mb: u32,
    /// Advisory capacity for the in-transaction index write buffer, in
    /// number of distinct keys before a mid-transaction flush is considered.
    pub index_cache_entries: usize,
    /// Capacity of the IRI -> id LRU value cache.
    pub value_cache_entries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            upfront: false,
            nosync: false,
            cache_size_mb: 64,
            index_cache_entries: 10_000,
            value_cache_entries: 2_000,
        }
    }
}

impl StoreConfig {
    /// A preset tuned for throughput over durability: skips fsync-equivalent
    /// behavior in the backend and pre-creates the bucket space.
    pub fn benchmark() -> Self {
        Self {
            upfront: true,
            nosync: true,
            cache_size_mb: 256,
            index_cache_entries: 50_000,
            value_cache_entries: 20_000,
        }
    }

    /// A conservative preset for production use: durable writes, modest
    /// memory footprint.
    pub fn production() -> Self {
        Self {
            upfront: true,
            nosync: false,
            ..Self::default()
        }
    }

    /// Loads a config by layering a TOML file's fields over [`Self::default`].
    /// Fields absent from the file keep their default value.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::InvalidArgument(format!("reading config file: {e}")))?;
        Self::from_toml_str(&text)
    }

    /// Parses a config from a TOML string, as [`Self::from_toml_file`] does
    /// after reading the file.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        #[derive(Deserialize, Default)]
        struct Partial {
            upfront: Option<bool>,
            nosync: Option<bool>,
            cache_size_mb: Option<u32>,
            index_cache_entries: Option<usize>,
            value_cache_entries: Option<usize>,
        }

        let partial: Partial = toml::from_str(text)
            .map_err(|e| StoreError::InvalidArgument(format!("parsing config file: {e}")))?;
        let defaults = Self::default();
        Ok(Self {
            upfront: partial.upfront.unwrap_or(defaults.upfront),
            nosync: partial.nosync.unwrap_or(defaults.nosync),
            cache_size_mb: partial.cache_size_mb.unwrap_or(defaults.cache_size_mb),
            index_cache_entries: partial
                .index_cache_entries
                .unwrap_or(defaults.index_cache_entries),
            value_cache_entries: partial
                .value_cache_entries
                .unwrap_or(defaults.value_cache_entries),
        })
    }
}
