//! Wall-clock timestamps for newly written primitives, using the `time`
//! crate.
//!
//! Deterministic tests swap this for a monotonically increasing counter so
//! assertions on ordering don't depend on clock resolution; the library's
//! public write path always uses [`now_nanos`].

use std::sync::atomic::{AtomicI64, Ordering};

static TEST_COUNTER: AtomicI64 = AtomicI64::new(0);

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn now_nanos() -> i64 {
    if cfg!(test) {
        // Deterministic, strictly increasing, so tests asserting commit
        // ordering never race the system clock's resolution.
        TEST_COUNTER.fetch_add(1, Ordering::Relaxed)
    } else {
        let now = time::OffsetDateTime::now_utc();
        now.unix_timestamp() * 1_000_000_000 + now.nanosecond() as i64
    }
}
