use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Distinct failure kinds surfaced by the quad store, independent of their
/// message text so callers can branch on `matches!`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested bucket does not exist and the transaction is read-only.
    #[error("bucket {0:?} not found")]
    NoBucket(&'static str),
    /// `init` was called against a store that already carries metadata.
    #[error("database already initialized")]
    DatabaseExists,
    /// `open` was called against a store with no `meta` bucket yet.
    #[error("database not initialized")]
    NotInitialized,
    /// The on-disk `version` counter does not match the version this build
    /// understands.
    #[error("on-disk version {found} does not match supported version {expected}")]
    VersionOutOfDate {
        /// Version recorded on disk.
        found: i64,
        /// Version this build supports.
        expected: i64,
    },
    /// Add of a link that already exists, with `ignore_dup` unset.
    #[error("quad already exists")]
    QuadExists,
    /// Delete of a link that does not exist, with `ignore_missing` unset.
    #[error("quad does not exist")]
    QuadNotExist,
    /// A delta's action was outside `{Add, Delete}`.
    #[error("invalid delta action")]
    InvalidAction,
    /// A log row failed to decode into a well-formed `Primitive`.
    #[error("corrupt primitive: {0}")]
    CorruptPrimitive(String),
    /// The underlying KV backend returned an error.
    #[error("kv backend failure: {0}")]
    KvFailure(String),
    /// An argument failed validation before any KV access was attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Requested ref does not resolve to a live primitive.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A single delta within an `apply_deltas` batch failed; `index` is its
    /// position in the input slice and `kind` carries the specific failure
    /// (typically `QuadExists`, `QuadNotExist`, `InvalidAction`,
    /// `CorruptPrimitive`, or `KvFailure`). Wrapping preserves which delta
    /// failed without needing a parallel error-kind enum.
    #[error("delta {index}: {kind}")]
    Delta {
        /// Index of the failing delta within the batch.
        index: usize,
        /// Underlying failure.
        kind: Box<StoreError>,
    },
}
