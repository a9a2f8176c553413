#![cfg(test)]

// Property tests for ChainMap kept inside the crate so they can call
// the internal structural invariant checker after every operation.

use crate::chain_map::ChainMap;
use crate::hashing::AltHashing;
use proptest::prelude::*;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to
// earlier keys, pool length shrinks, and op lists shrink in length.
// `None` in the model key mirrors the map's null key.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    PutNull(i32),
    Get(usize),
    GetNull,
    Contains(String),
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            any::<i32>().prop_map(OpI::PutNull),
            idx.clone().prop_map(OpI::Get),
            Just(OpI::GetNull),
            prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_scenario<S: BuildHasher>(
    mut sut: ChainMap<String, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Option<String>, i32> = HashMap::new();
    let mut generation = sut.generation();

    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = pool[i].clone();
                let prev = sut.put(Some(k.clone()), v);
                let model_prev = model.insert(Some(k), v);
                prop_assert_eq!(prev, model_prev, "put must return the previous value");
                if model_prev.is_none() {
                    // New node: generation must advance exactly once.
                    prop_assert_eq!(sut.generation(), generation.wrapping_add(1));
                    generation = sut.generation();
                } else {
                    prop_assert_eq!(sut.generation(), generation);
                }
            }
            OpI::PutNull(v) => {
                let prev = sut.put(None, v);
                let model_prev = model.insert(None, v);
                prop_assert_eq!(prev, model_prev);
                if model_prev.is_none() {
                    prop_assert_eq!(sut.generation(), generation.wrapping_add(1));
                    generation = sut.generation();
                } else {
                    prop_assert_eq!(sut.generation(), generation);
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(Some(k.as_str())), model.get(&Some(k.clone())));
            }
            OpI::GetNull => {
                prop_assert_eq!(sut.get(None::<&str>), model.get(&None));
            }
            OpI::Contains(s) => {
                prop_assert_eq!(
                    sut.contains_key(Some(s.as_str())),
                    model.contains_key(&Some(s.clone()))
                );
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        if sut.capacity() > 0 {
            prop_assert!(sut.capacity().is_power_of_two());
        }
        sut.check_invariants();
    }

    // Everything the model holds is observable at the end.
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k.as_deref()), Some(v));
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap
// with Option<String> keys standing in for the nullable key. Exercised
// invariants: put returns the previous value, overwrite does not grow
// size or generation, lookups match the model, every intermediate state
// passes the structural checker.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(ChainMap::new(), pool, ops)?;
    }
}

// Same machine starting from a one-slot table, so nearly every insert
// walks the growth policy and several resizes happen per run.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_from_minimal_capacity((pool, ops) in arb_scenario()) {
        run_scenario(ChainMap::with_capacity(1), pool, ops)?;
    }
}

// Collision variant using a constant hasher: all keys share one chain,
// stressing chain-walk equality resolution and the collision-gated
// growth trigger.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(ChainMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Alternate-hashing variant: the seed activates mid-run once a resize
// reaches the configured capacity, forcing a rehashing migration under
// random workloads.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_alt_hashing((pool, ops) in arb_scenario()) {
        let alt = AltHashing { capacity_threshold: 8, seed: 0x9747_b28c };
        let sut = ChainMap::with_config(1, 0.75, RandomState::new(), Some(alt))
            .expect("valid load factor");
        run_scenario(sut, pool, ops)?;
    }
}
