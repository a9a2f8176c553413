//! BucketTable: a fixed power-of-two array of singly linked node chains.
//!
//! The table owns its chains: each slot holds an optional boxed chain
//! head, and each node exclusively owns its successor. The table is
//! never grown in place; the controller builds a replacement and
//! migrates nodes into it, then drops the old table wholesale.

use core::mem;

/// Largest bucket count a table will ever reach. Doubling stops here;
/// beyond it the map degrades toward longer chains instead of failing.
pub const MAXIMUM_CAPACITY: usize = 1 << 30;

/// One key/value pair in a bucket chain.
///
/// `key == None` is the null key: it always carries hash 0, lives in
/// slot 0, and is matched by its `None`-ness without invoking `Eq`.
pub(crate) struct Node<K, V> {
    pub(crate) hash: u32,
    pub(crate) key: Option<K>,
    pub(crate) value: V,
    pub(crate) next: Option<Box<Node<K, V>>>,
}

pub(crate) struct BucketTable<K, V> {
    slots: Box<[Option<Box<Node<K, V>>>]>,
}

/// Bucket selection: mask off all but the low `log2(length)` bits.
/// Requires `length` to be a power of two so `length - 1` is an
/// all-ones mask over exactly those bits.
#[inline]
pub(crate) fn index_for(hash: u32, length: usize) -> usize {
    debug_assert!(length.is_power_of_two());
    hash as usize & (length - 1)
}

/// Capacity rounding: the smallest power of two >= `n`, clamped to
/// `[1, MAXIMUM_CAPACITY]`.
pub(crate) fn round_up_to_pow2(n: usize) -> usize {
    if n >= MAXIMUM_CAPACITY {
        MAXIMUM_CAPACITY
    } else if n > 1 {
        n.next_power_of_two()
    } else {
        1
    }
}

impl<K, V> BucketTable<K, V> {
    /// The uninflated table: zero slots, no allocation. The controller
    /// materializes a real table on the first insertion.
    pub(crate) fn empty() -> Self {
        Self {
            slots: Vec::new().into_boxed_slice(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two() && capacity <= MAXIMUM_CAPACITY);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table has been materialized yet.
    pub(crate) fn is_allocated(&self) -> bool {
        !self.slots.is_empty()
    }

    pub(crate) fn head(&self, index: usize) -> Option<&Node<K, V>> {
        self.slots[index].as_deref()
    }

    pub(crate) fn head_mut(&mut self, index: usize) -> Option<&mut Node<K, V>> {
        self.slots[index].as_deref_mut()
    }

    /// Link `node` in as the new chain head of `index`. The previous
    /// head, if any, becomes its successor (LIFO insertion).
    pub(crate) fn push_head(&mut self, index: usize, mut node: Box<Node<K, V>>) {
        node.next = self.slots[index].take();
        self.slots[index] = Some(node);
    }

    /// Detach and return every slot, leaving the table empty. Used by
    /// the resize migration, which relinks each node into the
    /// replacement table one at a time.
    pub(crate) fn take_slots(&mut self) -> impl Iterator<Item = Option<Box<Node<K, V>>>> {
        mem::take(&mut self.slots).into_vec().into_iter()
    }
}

// Unlink each chain front-to-back before dropping nodes, so that
// dropping a table never recurses to the depth of its longest chain.
impl<K, V> Drop for BucketTable<K, V> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            let mut head = slot.take();
            while let Some(mut node) = head {
                head = node.next.take();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: rounding yields the smallest power of two >= n, with
    /// 0 and 1 both mapping to 1 and everything at or above the cap
    /// pinned to MAXIMUM_CAPACITY.
    #[test]
    fn round_up_to_pow2_cases() {
        assert_eq!(round_up_to_pow2(0), 1);
        assert_eq!(round_up_to_pow2(1), 1);
        assert_eq!(round_up_to_pow2(2), 2);
        assert_eq!(round_up_to_pow2(15), 16);
        assert_eq!(round_up_to_pow2(16), 16);
        assert_eq!(round_up_to_pow2(17), 32);
        assert_eq!(round_up_to_pow2(MAXIMUM_CAPACITY - 1), MAXIMUM_CAPACITY);
        assert_eq!(round_up_to_pow2(MAXIMUM_CAPACITY), MAXIMUM_CAPACITY);
        assert_eq!(round_up_to_pow2(MAXIMUM_CAPACITY + 5), MAXIMUM_CAPACITY);
        assert_eq!(round_up_to_pow2(usize::MAX), MAXIMUM_CAPACITY);
    }

    /// Invariant: indexing selects exactly the low bits of the hash.
    #[test]
    fn index_for_masks_low_bits() {
        assert_eq!(index_for(0, 16), 0);
        assert_eq!(index_for(15, 16), 15);
        assert_eq!(index_for(16, 16), 0);
        assert_eq!(index_for(17, 16), 1);
        assert_eq!(index_for(u32::MAX, 8), 7);
        assert_eq!(index_for(5, 1), 0);
    }

    /// Invariant: push_head links the previous head as the successor,
    /// so a chain reads back in reverse insertion order.
    #[test]
    fn push_head_is_lifo() {
        let mut t: BucketTable<u32, u32> = BucketTable::with_capacity(4);
        for i in 0..3u32 {
            t.push_head(
                2,
                Box::new(Node {
                    hash: 2,
                    key: Some(i),
                    value: i * 10,
                    next: None,
                }),
            );
        }
        let mut seen = Vec::new();
        let mut cur = t.head(2);
        while let Some(n) = cur {
            seen.push(n.key);
            cur = n.next.as_deref();
        }
        assert_eq!(seen, vec![Some(2), Some(1), Some(0)]);
        assert!(t.head(0).is_none());
    }

    /// Invariant: the empty table reports zero capacity and no
    /// allocation; with_capacity reports exactly the requested slots.
    #[test]
    fn empty_and_allocated_tables() {
        let t: BucketTable<u32, ()> = BucketTable::empty();
        assert_eq!(t.capacity(), 0);
        assert!(!t.is_allocated());

        let t: BucketTable<u32, ()> = BucketTable::with_capacity(16);
        assert_eq!(t.capacity(), 16);
        assert!(t.is_allocated());
        assert!((0..16).all(|i| t.head(i).is_none()));
    }

    /// Dropping a table with a very long chain must not recurse per
    /// node. This overflows the test thread's stack if Drop is ever
    /// changed back to the default recursive chain drop.
    #[test]
    fn drop_of_long_chain_is_iterative() {
        let mut t: BucketTable<u32, u32> = BucketTable::with_capacity(1);
        for i in 0..200_000u32 {
            t.push_head(
                0,
                Box::new(Node {
                    hash: 0,
                    key: Some(i),
                    value: i,
                    next: None,
                }),
            );
        }
        drop(t);
    }

    /// take_slots leaves the table empty and hands over ownership of
    /// every chain exactly once.
    #[test]
    fn take_slots_transfers_ownership() {
        let mut t: BucketTable<u32, u32> = BucketTable::with_capacity(4);
        for i in 0..4u32 {
            t.push_head(
                index_for(i, 4),
                Box::new(Node {
                    hash: i,
                    key: Some(i),
                    value: i,
                    next: None,
                }),
            );
        }
        let taken: Vec<_> = t.take_slots().collect();
        assert_eq!(taken.len(), 4);
        assert_eq!(taken.iter().filter(|s| s.is_some()).count(), 4);
        assert_eq!(t.capacity(), 0);
    }
}
