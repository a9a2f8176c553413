//! chain-hashmap: a single-threaded, resizable chained hash map with
//! power-of-two bucket tables, lazy allocation, and exactly one null
//! key.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: build ChainMap in small, verifiable layers so each piece
//!   can be reasoned about independently.
//! - Layers:
//!   - bucket_table: Node (one pair, cached hash, owned successor) and
//!     BucketTable (fixed power-of-two slot array of chain heads,
//!     replaced wholesale on resize), plus bucket indexing and
//!     capacity rounding.
//!   - hashing: the bit-spread applied before bucket masking, seed
//!     folding, and a seeded Murmur3-32 BuildHasher as the injectable
//!     alternate strategy for textual keys.
//!   - chain_map: the controller. Lookup, insertion, lazy inflation,
//!     the collision-gated growth policy, and the doubling
//!     resize/rehash migration.
//!
//! Constraints
//! - Single-threaded and synchronous: no locking, no suspension
//!   points; every operation runs to completion on the caller.
//! - Capacity is always a power of two, at most 2^30; once there, the
//!   map stops growing and chains simply lengthen.
//! - Exactly one null key, expressed as `None`. It lives in slot 0
//!   with hash 0 and is matched without invoking `Eq`.
//! - Insertion is amortized O(1), lookup O(1) average, resize O(n).
//!
//! Growth policy
//! - Capacity doubles only when `size >= threshold` AND the insertion
//!   would collide with an occupied bucket. An insertion landing in an
//!   empty bucket never resizes, no matter the count. This defers the
//!   O(n) migration until it would actually relieve a chain, and it
//!   makes resize timing observable: callers must not rely on a pure
//!   count-based trigger.
//!
//! Hashing invariants
//! - Each node caches its spread `u32` hash; lookups reject on the
//!   cached hash before touching `Eq`, and resize migrations relink by
//!   cached hash without re-invoking `Hash` or `Eq` -- except when the
//!   alternate-hashing seed activates during that migration, which
//!   recomputes every cached hash once.
//! - The alternate strategy is injected at construction (`AltHashing`,
//!   `Murmur3BuildHasher`), never hidden global state.
//!
//! Notes and non-goals
//! - No iteration views, entry/key-set adapters, removal, cloning, or
//!   serialization; an external iterator would walk the buckets and
//!   check `generation()` to fail fast on structural changes.
//! - Chain order is LIFO per insertion and reverses during migration;
//!   no ordering is contractual.
//! - Not thread-safe; concurrent mutation without external
//!   synchronization is undefined.

mod bucket_table;
mod chain_map;
mod chain_map_proptest;
mod hashing;

// Public surface
pub use bucket_table::MAXIMUM_CAPACITY;
pub use chain_map::{ChainMap, ConfigError, DEFAULT_INITIAL_CAPACITY, DEFAULT_LOAD_FACTOR};
pub use hashing::{AltHashing, Murmur3BuildHasher, Murmur3Hasher};
