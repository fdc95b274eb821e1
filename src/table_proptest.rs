#![cfg(test)]

// Property tests for DHashTable kept inside the crate so they can reach
// RawTable internals when checking load accounting.

use crate::enumerate::EnumFlags;
use crate::ops::{MapOps, StubOps, STUB_OPS};
use crate::slot::MIN_SIZE;
use crate::table::{DHashTable, EntryHandle};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};

// Keys come from a small range so adds and removes collide with earlier
// keys, and the range is wide enough to force several grows and shrinks.
#[derive(Clone, Debug)]
enum Op {
    Add(u16),
    Set(u16, i32),
    Remove(u16),
    RawRemove(u16),
    Lookup(u16),
    // Remove every entry whose key is divisible by the modulus.
    EnumRemove(u16),
    // Stop after visiting this many entries.
    EnumStop(u32),
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let key = 0u16..96;
    let op = prop_oneof![
        4 => key.clone().prop_map(Op::Add),
        2 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Set(k, v)),
        2 => key.clone().prop_map(Op::Remove),
        1 => key.clone().prop_map(Op::RawRemove),
        2 => key.prop_map(Op::Lookup),
        1 => (1u16..5).prop_map(Op::EnumRemove),
        1 => (0u32..20).prop_map(Op::EnumStop),
    ];
    proptest::collection::vec(op, 1..200)
}

fn check_structure<S: BuildHasher>(t: &DHashTable<'_, MapOps<u16, i32, S>>) -> Result<(), TestCaseError> {
    let cap = t.capacity();
    prop_assert!(cap.is_power_of_two());
    prop_assert!(cap >= MIN_SIZE);
    prop_assert_eq!(t.hash_shift(), 32 - cap.trailing_zeros());

    // Header counts agree with the slots themselves.
    let slots = t.raw.slots();
    let live = slots.iter().filter(|s| s.is_live()).count() as u32;
    let removed = slots.iter().filter(|s| s.is_removed()).count() as u32;
    prop_assert_eq!(live, t.entry_count());
    prop_assert_eq!(removed, t.removed_count());

    // A free slot always remains, so every probe terminates.
    prop_assert!(t.entry_count() + t.removed_count() < cap);
    prop_assert!(t.entry_count() + t.removed_count() <= t.raw.alpha().max_load(cap));
    prop_assert!(slots.iter().all(|s| !s.is_live() || s.key_hash() >= 2));
    Ok(())
}

fn run<S: BuildHasher>(ops: &MapOps<u16, i32, S>, script: Vec<Op>) -> Result<(), TestCaseError> {
    let mut sut = DHashTable::new(ops, ()).unwrap();
    let mut model: HashMap<u16, i32> = HashMap::new();
    let mut issued: Vec<(EntryHandle, u16)> = Vec::new();
    let mut last_generation = 0;

    for op in script {
        match op {
            Op::Add(k) => {
                let before = sut.lookup(&k);
                let h = sut.add(&k).expect("add succeeds");
                if let Some(b) = before {
                    // Present keys are found, not re-inserted.
                    prop_assert_eq!(b, h);
                }
                prop_assert_eq!(sut.get(h).map(|e| e.key), Some(k));
                model.entry(k).or_insert(0);
                issued.push((h, k));
            }
            Op::Set(k, v) => {
                let found = sut.lookup_entry_mut(&k);
                prop_assert_eq!(found.is_some(), model.contains_key(&k));
                if let Some(e) = found {
                    e.value = v;
                    model.insert(k, v);
                }
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k).is_some());
                prop_assert!(!sut.contains(&k));
            }
            Op::RawRemove(k) => {
                let cap = sut.capacity();
                let generation = sut.generation();
                match sut.lookup(&k) {
                    Some(h) => {
                        prop_assert!(sut.raw_remove(h));
                        prop_assert!(!sut.raw_remove(h));
                        model.remove(&k);
                    }
                    None => prop_assert!(!model.contains_key(&k)),
                }
                prop_assert_eq!(sut.capacity(), cap);
                prop_assert_eq!(sut.generation(), generation);
            }
            Op::Lookup(k) => {
                let got = sut.lookup_entry(&k).map(|e| e.value);
                prop_assert_eq!(got, model.get(&k).copied());
            }
            Op::EnumRemove(m) => {
                let mut seen = BTreeSet::new();
                let n = sut.enumerate(|v| {
                    let k = v.entry().key;
                    seen.insert(k);
                    if k % m == 0 {
                        EnumFlags::REMOVE
                    } else {
                        EnumFlags::NEXT
                    }
                });
                prop_assert_eq!(n as usize, model.len());
                let expected: BTreeSet<u16> = model.keys().copied().collect();
                prop_assert_eq!(seen, expected);
                model.retain(|k, _| k % m != 0);
            }
            Op::EnumStop(limit) => {
                let mut visited = 0u32;
                let n = sut.enumerate(|_| {
                    visited += 1;
                    if visited > limit {
                        EnumFlags::STOP
                    } else {
                        EnumFlags::NEXT
                    }
                });
                prop_assert_eq!(n, visited);
                prop_assert_eq!(n as usize, model.len().min(limit as usize + 1));
            }
        }

        check_structure(&sut)?;
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());

        let generation = sut.generation();
        prop_assert!(generation >= last_generation);
        last_generation = generation;

        // Handles from an older generation never resolve. Without a
        // rebuild entries stay put, so a current handle to a live key
        // still names that key.
        for &(h, k) in &issued {
            if h.generation() != generation {
                prop_assert!(sut.get(h).is_none());
            } else if model.contains_key(&k) {
                prop_assert_eq!(sut.get(h).map(|e| e.key), Some(k));
            }
        }
        issued.retain(|(h, k)| h.generation() == generation && model.contains_key(k));

        let s_keys: BTreeSet<u16> = sut.iter().map(|(_, e)| e.key).collect();
        let m_keys: BTreeSet<u16> = model.keys().copied().collect();
        prop_assert_eq!(s_keys, m_keys);
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `add` is idempotent and returns a handle resolving to the key.
// - `lookup`/`remove` parity with the model; raw removal never resizes.
// - Enumeration visits each live entry exactly once and removes only what
//   the callback asked for.
// - Slot headers agree with the entry and tombstone counts, and a free
//   slot always remains.
// - Generations never decrease and stale handles never resolve.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(script in arb_ops()) {
        let ops: MapOps<u16, i32> = MapOps::new();
        run(&ops, script)?;
    }
}

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

// Property: Same invariants under a constant hash, where every key shares
// one probe sequence and only `match_entry` tells entries apart.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions(script in arb_ops()) {
        let ops: MapOps<u16, i32, ConstBuildHasher> = MapOps::with_hasher(ConstBuildHasher);
        run(&ops, script)?;
    }
}

// Property: adding n distinct keys into a table built for n never resizes.
proptest! {
    #[test]
    fn prop_capacity_hint_avoids_resize(n in 0u32..500) {
        let mut t: DHashTable<'_, StubOps> = DHashTable::with_capacity(&STUB_OPS, (), n).unwrap();
        let cap = t.capacity();
        for k in 0..n as usize {
            t.add(&((k + 1) << 2)).unwrap();
        }
        prop_assert_eq!(t.capacity(), cap);
        prop_assert_eq!(t.generation(), 0);
        prop_assert_eq!(t.len(), n as usize);
    }
}
