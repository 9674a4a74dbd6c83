//! Bloom prefilter over fully static route paths.
//!
//! The filter is filled once per static route during registration and is read-only
//! after the router is frozen. A negative answer proves the path was never added,
//! so the router can skip the trie walk for paths that cannot reach a dynamic
//! route. A positive answer is only a hint and is always confirmed by the trie.
//!
//! Indices are derived by double hashing (`h1 + i * h2`), so a single pair of
//! 64-bit hashes per path feeds any number of probe positions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Default bit-array length.
pub const DEFAULT_BLOOM_BITS: usize = 1024;
/// Default number of probe positions per path.
pub const DEFAULT_BLOOM_HASHES: u32 = 3;

const SEED_PRIMARY: u64 = 0x51_7c_c1_b7_27_22_0a_95;
const SEED_SECONDARY: u64 = 0x9e_37_79_b9_7f_4a_7c_15;

/// Pair of hashes identifying a static path inside the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathHash {
    h1: u64,
    h2: u64,
}

impl PathHash {
    /// Hash a request or route path.
    #[must_use]
    pub fn of(path: &str) -> Self {
        let h1 = seeded_hash(SEED_PRIMARY, path);
        // An even step would only ever probe half the positions of an even-length array.
        let h2 = seeded_hash(SEED_SECONDARY, path) | 1;
        Self { h1, h2 }
    }
}

fn seeded_hash(seed: u64, path: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    path.hash(&mut hasher);
    hasher.finish()
}

fn probe_positions(bits: usize, hashes: u32, hash: PathHash) -> impl Iterator<Item = usize> {
    let bits = bits as u64;
    (0..u64::from(hashes)).map(move |i| (hash.h1.wrapping_add(i.wrapping_mul(hash.h2)) % bits) as usize)
}

/// Fixed-size Bloom filter.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    words: Vec<u64>,
    bits: usize,
    hashes: u32,
    items: usize,
}

impl BloomFilter {
    /// Create an empty filter. Zero sizes are bumped to one.
    #[must_use]
    pub fn new(bits: usize, hashes: u32) -> Self {
        let bits = bits.max(1);
        Self {
            words: vec![0; bits.div_ceil(64)],
            bits,
            hashes: hashes.max(1),
            items: 0,
        }
    }

    /// Record a static path hash.
    pub fn add(&mut self, hash: PathHash) {
        for pos in probe_positions(self.bits, self.hashes, hash) {
            self.words[pos / 64] |= 1 << (pos % 64);
        }
        self.items += 1;
    }

    /// `false` means the hash was definitely never added.
    #[must_use]
    pub fn might_contain(&self, hash: PathHash) -> bool {
        probe_positions(self.bits, self.hashes, hash)
            .all(|pos| self.words[pos / 64] & (1 << (pos % 64)) != 0)
    }

    /// Number of paths added.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    #[must_use]
    pub fn bits(&self) -> usize {
        self.bits
    }

    #[must_use]
    pub fn hashes(&self) -> u32 {
        self.hashes
    }

    /// Estimated false-positive rate at the current fill: `(1 - e^(-kn/m))^k`.
    #[must_use]
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let k = f64::from(self.hashes);
        let n = self.items as f64;
        let m = self.bits as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }
}

impl Default for BloomFilter {
    fn default() -> Self {
        Self::new(DEFAULT_BLOOM_BITS, DEFAULT_BLOOM_HASHES)
    }
}
