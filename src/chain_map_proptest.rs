#![cfg(test)]

// Property tests for ChainMap kept inside the crate so they can assert
// internal invariants (capacity, bucket placement) alongside the model.

use crate::chain_map::{ChainMap, BASE_CAPACITY, GROWTH_FACTOR};
use proptest::prelude::*;
use std::collections::HashMap;

// Pool-indexed operations shrink well: indices shrink toward earlier keys
// and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    Get(usize),
    OrDefault(usize),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{1,4}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            2 => idx.clone().prop_map(Op::OrDefault),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        (Just(pool), proptest::collection::vec(op, 1..200))
    })
}

// Reference model: std HashMap written with insert-if-absent semantics.
fn model_insert(model: &mut HashMap<String, i32>, k: String, v: i32) {
    model.entry(k).or_insert(v);
}

// Structural invariants the model cannot express: count consistency and
// bucket placement for every live entry.
fn check_structure(m: &ChainMap<String, i32>, model: &HashMap<String, i32>) {
    assert_eq!(m.len(), model.len());
    assert_eq!(m.is_empty(), model.is_empty());
    assert!(m.capacity() >= 1);
    assert_eq!(m.iter().count(), m.len());
    // Every model entry is reachable with the model's value, and vice versa.
    for (k, v) in m.iter() {
        assert_eq!(model.get(k), Some(v));
    }
    for (k, v) in model {
        assert_eq!(m.get(k.as_str()), Some(v));
    }
}

proptest! {
    /// Under arbitrary op sequences, ChainMap agrees with a first-write-wins
    /// HashMap model and keeps len/iteration/capacity consistent after every
    /// single step.
    #[test]
    fn prop_matches_first_write_wins_model((pool, ops) in arb_scenario()) {
        let mut m: ChainMap<String, i32> = ChainMap::new();
        let mut model: HashMap<String, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(i, v) => {
                    let k = pool[i].clone();
                    let was_absent = !model.contains_key(&k);
                    let inserted = m.insert(k.clone(), v);
                    prop_assert_eq!(inserted, was_absent);
                    model_insert(&mut model, k, v);
                }
                Op::Remove(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(m.remove(k.as_str()), model.remove(k));
                }
                Op::Get(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(m.get(k.as_str()), model.get(k));
                    prop_assert_eq!(m.contains_key(k.as_str()), model.contains_key(k));
                    prop_assert_eq!(m.at(k.as_str()).ok(), model.get(k));
                    prop_assert_eq!(m.find(k.as_str()) != m.end(), model.contains_key(k));
                }
                Op::OrDefault(i) => {
                    let k = pool[i].clone();
                    let expected = *model.entry(k.clone()).or_insert(0);
                    prop_assert_eq!(*m.entry_or_default(k), expected);
                }
                Op::Mutate(i, d) => {
                    let k = &pool[i];
                    if let Some(v) = model.get_mut(k) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = m.get_mut(k.as_str()) {
                        *v = v.wrapping_add(d);
                    }
                }
                Op::Iterate => {
                    let mut walked = 0usize;
                    let mut c = m.begin();
                    while c != m.end() {
                        let k = c.key(&m).expect("cursor addresses a live entry");
                        prop_assert_eq!(c.value(&m), model.get(k));
                        walked += 1;
                        c = m.advance(c);
                    }
                    prop_assert_eq!(walked, model.len());
                }
                Op::Clear => {
                    m.clear();
                    model.clear();
                    prop_assert_eq!(m.capacity(), BASE_CAPACITY);
                }
            }
            check_structure(&m, &model);
        }
    }

    /// Capacity follows the documented policy: it only ever changes by the
    /// growth factor, growth fires when the count exceeds the old capacity,
    /// and shrink fires only when a removal lands exactly on capacity / 4.
    #[test]
    fn prop_capacity_transitions_follow_policy(
        ops in proptest::collection::vec((any::<bool>(), 0u16..64), 1..300)
    ) {
        let mut m: ChainMap<u16, u16> = ChainMap::new();
        let mut cap = m.capacity();
        prop_assert_eq!(cap, BASE_CAPACITY);

        for (is_insert, k) in ops {
            let len_before = m.len();
            if is_insert {
                m.insert(k, k);
            } else {
                m.remove(&k);
            }
            let new_cap = m.capacity();
            if is_insert && m.len() == len_before + 1 && m.len() > cap {
                prop_assert_eq!(new_cap, cap * GROWTH_FACTOR);
            } else if !is_insert
                && m.len() + 1 == len_before
                && cap / GROWTH_FACTOR > 0
                && m.len() == cap / GROWTH_FACTOR / 2
            {
                prop_assert_eq!(new_cap, cap / GROWTH_FACTOR);
            } else {
                prop_assert_eq!(new_cap, cap);
            }
            cap = new_cap;
        }
    }

    /// Clone is observationally identical to its source and fully detached.
    #[test]
    fn prop_clone_equivalence(pairs in proptest::collection::vec(("[a-z]{1,3}", any::<i32>()), 0..60)) {
        let m: ChainMap<String, i32> = pairs.into_iter().collect();
        let mut c = m.clone();
        prop_assert_eq!(c.len(), m.len());
        prop_assert_eq!(c.capacity(), m.capacity());
        for (k, v) in m.iter() {
            prop_assert_eq!(c.get(k.as_str()), Some(v));
        }
        // Detachment: draining the clone leaves the source untouched.
        let keys: Vec<String> = c.iter().map(|(k, _)| k.clone()).collect();
        for k in &keys {
            c.remove(k.as_str());
        }
        prop_assert!(c.is_empty());
        prop_assert_eq!(m.len(), keys.len());
    }
}
