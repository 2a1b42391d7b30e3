//! Deletable counting bloom filter, keyed by the 24-byte concatenation of a
//! link's `(subject, predicate, object)` ids.
//!
//! Plain counters behind a `parking_lot::Mutex`: shared in-memory state
//! guarded by its own lock, held only long enough to touch the counter
//! array and released before any KV call.

use parking_lot::Mutex;

/// Four-bit saturating counters packed two per byte, giving a deletable
/// bloom filter: `add` increments, `test_and_remove` decrements, both
/// saturating at the nibble's range so a burst of duplicate adds never
/// wraps a counter back to zero.
pub struct BloomFilter {
    counters: Mutex<Vec<u8>>,
    num_bits: usize,
    num_hashes: u32,
}

const NIBBLE_MAX: u8 = 0x0f;

impl BloomFilter {
    /// Builds a filter sized for `expected_items` entries at approximately
    /// `false_positive_rate` (e.g. `0.05` for 5%), following the standard
    /// optimal-parameters formulas:
    /// `m = -n * ln(p) / ln(2)^2`, `k = (m/n) * ln(2)`.
    pub fn new(expected_items: u64, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = false_positive_rate.clamp(1e-6, 0.5);
        let m = (-(n * p.ln()) / std::f64::consts::LN_2.powi(2)).ceil() as usize;
        let num_bits = m.max(8);
        let k = ((num_bits as f64 / n) * std::f64::consts::LN_2).round() as u32;
        let num_hashes = k.clamp(1, 16);
        let num_nibbles = num_bits;
        let num_bytes = num_nibbles.div_ceil(2);
        Self {
            counters: Mutex::new(vec![0u8; num_bytes]),
            num_bits,
            num_hashes,
        }
    }

    /// Default sizing for the store's existence-check filter: ~10^8 items
    /// at ~5% false positives.
    pub fn for_quad_store() -> Self {
        Self::new(100_000_000, 0.05)
    }

    /// Builds the 24-byte bloom key for a link's subject/predicate/object
    /// ids. The label direction does not participate: existence is
    /// determined by the triple alone, with label checked against the
    /// covering index/log afterward.
    pub fn key_for(subject: u64, predicate: u64, object: u64) -> [u8; 24] {
        let mut key = [0u8; 24];
        key[0..8].copy_from_slice(&subject.to_be_bytes());
        key[8..16].copy_from_slice(&predicate.to_be_bytes());
        key[16..24].copy_from_slice(&object.to_be_bytes());
        key
    }

    fn positions(&self, key: &[u8]) -> impl Iterator<Item = usize> + '_ {
        let h1 = xxhash_rust::xxh3::xxh3_64(key);
        let h2 = xxhash_rust::xxh32::xxh32(key, 1) as u64;
        let num_bits = self.num_bits;
        (0..self.num_hashes).map(move |i| {
            let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
            (combined % num_bits as u64) as usize
        })
    }

    fn get_nibble(counters: &[u8], idx: usize) -> u8 {
        let byte = counters[idx / 2];
        if idx % 2 == 0 {
            byte & 0x0f
        } else {
            byte >> 4
        }
    }

    fn set_nibble(counters: &mut [u8], idx: usize, value: u8) {
        let byte = &mut counters[idx / 2];
        if idx % 2 == 0 {
            *byte = (*byte & 0xf0) | (value & 0x0f);
        } else {
            *byte = (*byte & 0x0f) | (value << 4);
        }
    }

    /// Registers one occurrence of `key`, saturating each of its `k`
    /// counters at 15 rather than overflowing.
    pub fn add(&self, key: &[u8]) {
        let positions: Vec<usize> = self.positions(key).collect();
        let mut counters = self.counters.lock();
        for idx in positions {
            let current = Self::get_nibble(&counters, idx);
            if current < NIBBLE_MAX {
                Self::set_nibble(&mut counters, idx, current + 1);
            }
        }
    }

    /// A negative answer is authoritative: `key` is definitely absent. A
    /// positive answer requires an exact check (index intersection) before
    /// being trusted.
    pub fn test(&self, key: &[u8]) -> bool {
        let counters = self.counters.lock();
        self.positions(key)
            .all(|idx| Self::get_nibble(&counters, idx) > 0)
    }

    /// Removes one occurrence of `key` if [`Self::test`] would currently
    /// report it present; returns whether it was present. Saturated (15)
    /// counters are treated as permanently present for this key's slot and
    /// are not decremented, matching standard counting-bloom practice (a
    /// decrement on a saturated counter would make later `test` calls for
    /// unrelated keys sharing that slot report false negatives).
    pub fn test_and_remove(&self, key: &[u8]) -> bool {
        let positions: Vec<usize> = self.positions(key).collect();
        let mut counters = self.counters.lock();
        let present = positions
            .iter()
            .all(|&idx| Self::get_nibble(&counters, idx) > 0);
        if present {
            for &idx in &positions {
                let current = Self::get_nibble(&counters, idx);
                if current > 0 && current < NIBBLE_MAX {
                    Self::set_nibble(&mut counters, idx, current - 1);
                }
            }
        }
        present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_filter_reports_everything_absent() {
        let filter = BloomFilter::new(1_000, 0.05);
        let key = BloomFilter::key_for(1, 2, 3);
        assert!(!filter.test(&key));
    }

    #[test]
    fn add_then_test_is_positive() {
        let filter = BloomFilter::new(1_000, 0.05);
        let key = BloomFilter::key_for(1, 2, 3);
        filter.add(&key);
        assert!(filter.test(&key));
    }

    #[test]
    fn test_and_remove_clears_membership() {
        let filter = BloomFilter::new(1_000, 0.05);
        let key = BloomFilter::key_for(1, 2, 3);
        filter.add(&key);
        assert!(filter.test_and_remove(&key));
        assert!(!filter.test(&key));
    }

    #[test]
    fn remove_of_absent_key_is_a_no_op() {
        let filter = BloomFilter::new(1_000, 0.05);
        let key = BloomFilter::key_for(9, 9, 9);
        assert!(!filter.test_and_remove(&key));
    }

    #[test]
    fn no_false_negatives_across_many_insertions() {
        let filter = BloomFilter::new(5_000, 0.05);
        let keys: Vec<[u8; 24]> = (0..2_000u64)
            .map(|i| BloomFilter::key_for(i, i + 1, i + 2))
            .collect();
        for key in &keys {
            filter.add(key);
        }
        for key in &keys {
            assert!(filter.test(key), "false negative for a key that was added");
        }
    }
}
