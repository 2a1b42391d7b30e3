//! Structured logging bootstrap.
//!
//! The store itself never initializes a subscriber implicitly — callers that
//! embed the crate into a larger binary own that decision. `init` is provided
//! for standalone tools and tests.

use crate::error::{Result, StoreError};
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a process-wide `tracing` subscriber filtered by `level`
/// (anything `EnvFilter` accepts, e.g. `"quadstore=debug"` or `"info"`).
///
/// Safe to call more than once; later calls are no-ops reported as an error
/// so callers can choose whether to ignore it.
pub fn init(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| StoreError::InvalidArgument(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .try_init()
        .map_err(|_| StoreError::InvalidArgument("logging already initialized".into()))
}
