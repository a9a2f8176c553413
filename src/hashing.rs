//! Hash spreading, seed folding, and the alternate string-hashing
//! strategy.
//!
//! Bucket selection only ever consults the low bits of a hash (see
//! `bucket_table::index_for`), so weak hash functions with entropy in
//! their high bits would collide badly under a plain mask. `spread`
//! folds the high bits down before masking. The alternate strategy is
//! a seeded Murmur3-32 `BuildHasher` that callers inject at
//! construction as a hash-flooding defense for textual keys; it is
//! deliberately not global state.

use core::hash::{BuildHasher, Hasher};
use std::io::Cursor;

/// Spread high bits into low bits. The shift amounts are chosen so
/// every bit of the input influences the low byte of the output.
#[inline]
pub(crate) fn spread(mut h: u32) -> u32 {
    h ^= (h >> 20) ^ (h >> 12);
    h ^ (h >> 7) ^ (h >> 4)
}

/// Fold an optional seed into a native 64-bit hash, narrowing to the
/// 32-bit domain the spread function and bucket mask operate on. A
/// seed of 0 means no alternate hashing is active.
#[inline]
pub(crate) fn fold_seed(seed: u32, native: u64) -> u32 {
    seed ^ native as u32
}

/// Configuration for the alternate-hashing switch.
///
/// When a table inflation or resize reaches `capacity_threshold` and
/// no seed is active yet, `seed` becomes the active seed and that
/// migration recomputes every cached hash. Both values are supplied by
/// the caller; the map never draws hidden randomness.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AltHashing {
    pub capacity_threshold: usize,
    pub seed: u32,
}

/// A `BuildHasher` computing seeded Murmur3-32 over the key's written
/// byte stream. Intended as the injectable alternate strategy for
/// string-keyed maps; pair it with a nonzero seed.
#[derive(Copy, Clone, Debug, Default)]
pub struct Murmur3BuildHasher {
    seed: u32,
}

impl Murmur3BuildHasher {
    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }
}

impl BuildHasher for Murmur3BuildHasher {
    type Hasher = Murmur3Hasher;

    fn build_hasher(&self) -> Self::Hasher {
        Murmur3Hasher {
            seed: self.seed,
            buf: Vec::new(),
        }
    }
}

/// Buffers all written bytes and hashes them in one Murmur3-32 pass at
/// `finish`. Murmur3 is not incremental over arbitrary write chunk
/// boundaries, so buffering keeps the digest independent of how a
/// key's `Hash` impl splits its writes.
pub struct Murmur3Hasher {
    seed: u32,
    buf: Vec<u8>,
}

impl Hasher for Murmur3Hasher {
    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn finish(&self) -> u64 {
        let digest = murmur3::murmur3_32(&mut Cursor::new(&self.buf), self.seed)
            .expect("reading from an in-memory cursor cannot fail");
        digest as u64
    }
}
