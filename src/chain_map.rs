//! ChainMap: the table controller. Orchestrates hashing, bucket
//! indexing, lookup, insertion, lazy inflation, and the doubling
//! resize with its collision-gated growth policy.

use crate::bucket_table::{index_for, round_up_to_pow2, BucketTable, Node, MAXIMUM_CAPACITY};
use crate::hashing::{fold_seed, spread, AltHashing};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::mem;
use std::collections::hash_map::RandomState;

/// Bucket count a map inflates to when none was requested.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Growth is considered once `size >= capacity * load_factor`.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Construction-time parameter error. The map is never left partially
/// constructed: validation happens before any state exists.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Load factor must be positive and not NaN.
    InvalidLoadFactor(f32),
}

/// A single-threaded chained hash map with power-of-two capacities,
/// exactly one null key, and lazy bucket allocation.
///
/// The null key is expressed as `None`: `put(None, v)` and
/// `get(None::<&Q>)` address the one null entry, which always lives in
/// slot 0 with hash 0 and is matched without invoking `Eq`.
///
/// The bucket array is allocated on the first `put` (or at the
/// requested capacity, rounded up to a power of two). When an
/// insertion finds `size >= threshold` *and* its target bucket already
/// occupied, capacity doubles and every node migrates into a fresh
/// table. An insertion that lands in an empty bucket never triggers
/// growth, even above the threshold.
pub struct ChainMap<K, V, S = RandomState> {
    table: BucketTable<K, V>,
    size: usize,
    threshold: usize,
    load_factor: f32,
    initial_capacity: usize,
    hasher: S,
    hash_seed: u32,
    alt: Option<AltHashing>,
    generation: u64,
}

impl<K, V> ChainMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self::with_config(
            initial_capacity,
            DEFAULT_LOAD_FACTOR,
            RandomState::new(),
            None,
        )
        .expect("the default load factor is valid")
    }

    pub fn with_capacity_and_load_factor(
        initial_capacity: usize,
        load_factor: f32,
    ) -> Result<Self, ConfigError> {
        Self::with_config(initial_capacity, load_factor, RandomState::new(), None)
    }
}

impl<K, V> Default for ChainMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_INITIAL_CAPACITY, hasher)
    }

    pub fn with_capacity_and_hasher(initial_capacity: usize, hasher: S) -> Self {
        Self::with_config(initial_capacity, DEFAULT_LOAD_FACTOR, hasher, None)
            .expect("the default load factor is valid")
    }

    /// Full-control constructor. `alt` arms the alternate-hashing
    /// switch: once the capacity reaches its threshold, the configured
    /// seed activates and that migration rehashes every cached hash.
    pub fn with_config(
        initial_capacity: usize,
        load_factor: f32,
        hasher: S,
        alt: Option<AltHashing>,
    ) -> Result<Self, ConfigError> {
        if load_factor <= 0.0 || load_factor.is_nan() {
            return Err(ConfigError::InvalidLoadFactor(load_factor));
        }
        Ok(Self {
            table: BucketTable::empty(),
            size: 0,
            threshold: 0,
            load_factor,
            initial_capacity: initial_capacity.min(MAXIMUM_CAPACITY),
            hasher,
            hash_seed: 0,
            alt,
            generation: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Current bucket count; 0 until the first insertion materializes
    /// the table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Size at which the next insertion into an occupied bucket
    /// doubles the capacity.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Structural generation, bumped once per node created. An
    /// external iterator can snapshot this and fail fast when a later
    /// insertion invalidates its walk. Value overwrites do not bump
    /// it, and it is no synchronization mechanism.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Look up a key; `None` addresses the null key. No side effects.
    pub fn get<Q>(&self, key: Option<&Q>) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.size == 0 {
            return None;
        }
        match key {
            None => self.null_entry().map(|node| &node.value),
            Some(q) => self.entry(q).map(|node| &node.value),
        }
    }

    /// Explicit presence query. With nullable values modeled as
    /// `V = Option<T>`, this is how callers distinguish "absent" from
    /// "present with None".
    pub fn contains_key<Q>(&self, key: Option<&Q>) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.size == 0 {
            return false;
        }
        match key {
            None => self.null_entry().is_some(),
            Some(q) => self.entry(q).is_some(),
        }
    }

    /// Insert or overwrite; returns the previous value for the key.
    /// The first call materializes the bucket table, and a call that
    /// creates a new node may double the capacity first.
    pub fn put(&mut self, key: Option<K>, value: V) -> Option<V> {
        if !self.table.is_allocated() {
            self.inflate(self.initial_capacity);
        }
        match key {
            None => self.put_null(value),
            Some(key) => self.put_key(key, value),
        }
    }

    /// Spread hash for a key under the currently active seed.
    fn hash_of<Q>(&self, q: &Q) -> u32
    where
        Q: ?Sized + Hash,
    {
        spread(fold_seed(self.hash_seed, self.hasher.hash_one(q)))
    }

    fn entry<Q>(&self, q: &Q) -> Option<&Node<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_of(q);
        let index = index_for(hash, self.table.capacity());
        let mut cur = self.table.head(index);
        while let Some(node) = cur {
            // Cached-hash comparison rejects most non-matches without
            // touching `Eq`.
            if node.hash == hash && node.key.as_ref().is_some_and(|k| k.borrow() == q) {
                return Some(node);
            }
            cur = node.next.as_deref();
        }
        None
    }

    // The null key never goes through hashing: slot 0, matched by the
    // absence of a key.
    fn null_entry(&self) -> Option<&Node<K, V>> {
        let mut cur = self.table.head(0);
        while let Some(node) = cur {
            if node.key.is_none() {
                return Some(node);
            }
            cur = node.next.as_deref();
        }
        None
    }

    fn put_null(&mut self, value: V) -> Option<V> {
        let mut cur = self.table.head_mut(0);
        while let Some(node) = cur {
            if node.key.is_none() {
                return Some(mem::replace(&mut node.value, value));
            }
            cur = node.next.as_deref_mut();
        }
        self.add_entry(0, None, value, 0);
        None
    }

    fn put_key(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_of(&key);
        let index = index_for(hash, self.table.capacity());
        let mut cur = self.table.head_mut(index);
        while let Some(node) = cur {
            if node.hash == hash && node.key.as_ref().is_some_and(|k| *k == key) {
                // Overwrite in place: the node keeps its chain
                // position, size and generation stay unchanged.
                return Some(mem::replace(&mut node.value, value));
            }
            cur = node.next.as_deref_mut();
        }
        self.add_entry(hash, Some(key), value, index);
        None
    }

    /// Create a new chain-head node, growing first when the policy
    /// fires. Growth requires both the threshold to be reached and the
    /// target bucket to be occupied; a colliding insertion is what a
    /// resize actually relieves.
    fn add_entry(&mut self, hash: u32, key: Option<K>, value: V, index: usize) {
        let (hash, index) = if self.size >= self.threshold && self.table.head(index).is_some() {
            self.resize(self.table.capacity() * 2);
            // Re-derive placement against the new capacity; the seed
            // may have changed during the resize.
            let hash = match &key {
                None => 0,
                Some(k) => self.hash_of(k),
            };
            (hash, index_for(hash, self.table.capacity()))
        } else {
            (hash, index)
        };

        self.table.push_head(
            index,
            Box::new(Node {
                hash,
                key,
                value,
                next: None,
            }),
        );
        self.size += 1;
        self.generation = self.generation.wrapping_add(1);
    }

    fn inflate(&mut self, to_size: usize) {
        let capacity = round_up_to_pow2(to_size);
        self.threshold = threshold_for(capacity, self.load_factor);
        self.table = BucketTable::with_capacity(capacity);
        // The table is still empty, so an activated seed has nothing
        // to rehash here.
        let _ = self.reseed_as_needed(capacity);
    }

    fn resize(&mut self, new_capacity: usize) {
        if self.table.capacity() == MAXIMUM_CAPACITY {
            // Saturated: stop growing and only pin the threshold so
            // the policy never fires again. Chains just get longer.
            self.threshold = usize::MAX;
            return;
        }
        let rehash = self.reseed_as_needed(new_capacity);
        self.transfer(new_capacity, rehash);
        self.threshold = threshold_for(new_capacity, self.load_factor);
    }

    /// Migrate every node into a fresh table of `new_capacity`. Nodes
    /// are re-owned, not re-compared; cached hashes are reused unless
    /// this resize activated the alternate seed. Head insertion
    /// reverses chain order, which is observable but not contractual.
    fn transfer(&mut self, new_capacity: usize, rehash: bool) {
        let mut old = mem::replace(&mut self.table, BucketTable::with_capacity(new_capacity));
        for mut head in old.take_slots() {
            while let Some(mut node) = head {
                head = node.next.take();
                if rehash {
                    node.hash = match &node.key {
                        None => 0,
                        Some(k) => self.hash_of(k),
                    };
                }
                let index = index_for(node.hash, new_capacity);
                self.table.push_head(index, node);
            }
        }
    }

    /// Activate the injected alternate seed once capacity crosses its
    /// threshold. Returns whether this call flipped the seed, i.e.
    /// whether the caller must rehash cached hashes.
    fn reseed_as_needed(&mut self, capacity: usize) -> bool {
        let Some(alt) = self.alt else {
            return false;
        };
        let switching = self.hash_seed == 0 && alt.seed != 0 && capacity >= alt.capacity_threshold;
        if switching {
            self.hash_seed = alt.seed;
        }
        switching
    }
}

/// `floor(capacity * load_factor)`, capped at `MAXIMUM_CAPACITY + 1`
/// so a saturated table's threshold can never be reached by `size`.
fn threshold_for(capacity: usize, load_factor: f32) -> usize {
    let raw = (capacity as f64 * load_factor as f64) as usize;
    raw.min(MAXIMUM_CAPACITY + 1)
}

#[cfg(test)]
impl<K, V, S> ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Walk every chain and assert the structural invariants: node
    /// placement matches its cached hash, size is the exact node
    /// count, keys are unique, and at most one null-key node exists
    /// (slot 0, hash 0).
    pub(crate) fn check_invariants(&self) {
        let capacity = self.table.capacity();
        if capacity == 0 {
            assert_eq!(self.size, 0, "uninflated table must be empty");
            return;
        }
        assert!(capacity.is_power_of_two());
        assert!(capacity <= MAXIMUM_CAPACITY);

        let mut counted = 0;
        let mut nulls = 0;
        let mut keys: Vec<&K> = Vec::new();
        for index in 0..capacity {
            let mut cur = self.table.head(index);
            while let Some(node) = cur {
                counted += 1;
                assert_eq!(
                    index_for(node.hash, capacity),
                    index,
                    "node stored in the wrong bucket"
                );
                match &node.key {
                    None => {
                        nulls += 1;
                        assert_eq!(index, 0, "null key outside slot 0");
                        assert_eq!(node.hash, 0, "null key with nonzero hash");
                    }
                    Some(k) => {
                        assert!(!keys.contains(&k), "duplicate key in table");
                        keys.push(k);
                    }
                }
                cur = node.next.as_deref();
            }
        }
        assert!(nulls <= 1, "more than one null-key node");
        assert_eq!(counted, self.size, "size out of sync with live nodes");
    }
}
