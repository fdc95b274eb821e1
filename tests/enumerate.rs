// Enumeration tests.
//
// Invariants exercised:
// - Every live entry is visited once, in storage order, with ordinals
//   counting from zero.
// - REMOVE turns the visited entry into a tombstone through clear_entry.
// - STOP ends the walk; the return value counts entries visited.
// - After removals, sparse storage is rebuilt for the survivors and the
//   generation advances; otherwise storage is left alone.
use dhash_table::{DHashTable, EnumFlags, MapOps, MIN_SIZE};

#[test]
fn visits_each_entry_once() {
    let ops: MapOps<u32, u32> = MapOps::new();
    let n = 50;
    let mut t = DHashTable::new(&ops, ()).unwrap();
    for k in 0..n {
        t.add_entry(&k).unwrap().value = k * 10;
    }
    let mut keys = Vec::new();
    let count = t.enumerate(|v| {
        assert_eq!(v.entry().value, v.entry().key * 10);
        assert_eq!(v.ordinal() as usize, keys.len());
        keys.push(v.entry().key);
        EnumFlags::NEXT
    });
    assert_eq!(count, n);
    keys.sort_unstable();
    assert_eq!(keys, (0..n).collect::<Vec<_>>());
}

#[test]
fn entry_mut_updates_in_place() {
    let ops: MapOps<u32, u32> = MapOps::new();
    let n = 20;
    let mut t = DHashTable::new(&ops, ()).unwrap();
    for k in 0..n {
        t.add(&k).unwrap();
    }
    let generation = t.generation();
    t.enumerate(|v| {
        let ordinal = v.ordinal();
        v.entry_mut().value = ordinal + 1;
        EnumFlags::NEXT
    });
    assert_eq!(t.generation(), generation);
    assert!(t.iter().all(|(_, e)| e.value >= 1));
}

// Test: STOP with and without REMOVE.
// Verifies: the walk ends after the stopping entry, which is removed only
// when REMOVE is also set.
#[test]
fn stop_ends_walk() {
    let ops: MapOps<u32, u32> = MapOps::new();
    let n = 10;
    let mut t = DHashTable::new(&ops, ()).unwrap();
    for k in 0..n {
        t.add(&k).unwrap();
    }
    let count = t.enumerate(|v| if v.ordinal() == 3 { EnumFlags::STOP } else { EnumFlags::NEXT });
    assert_eq!(count, 4);
    assert_eq!(t.len(), 10);

    let mut stopped_on = None;
    let count = t.enumerate(|v| {
        if v.ordinal() == 0 {
            stopped_on = Some(v.entry().key);
            EnumFlags::REMOVE | EnumFlags::STOP
        } else {
            EnumFlags::NEXT
        }
    });
    assert_eq!(count, 1);
    assert_eq!(t.len(), 9);
    assert!(!t.contains(&stopped_on.unwrap()));
}

#[test]
fn few_removals_leave_storage_alone() {
    let ops: MapOps<u32, u32> = MapOps::new();
    let n = 10;
    let mut t = DHashTable::new(&ops, ()).unwrap();
    for k in 0..n {
        t.add(&k).unwrap();
    }
    t.enumerate(|v| if v.entry().key == 4 { EnumFlags::REMOVE } else { EnumFlags::NEXT });
    assert_eq!(t.capacity(), MIN_SIZE);
    assert_eq!(t.generation(), 0);
    assert_eq!(t.removed_count(), 1);
    assert!(!t.contains(&4));
}

// Test: compaction after heavy removal.
// Verifies: storage is rebuilt at the smallest power of two holding the
// survivors at 1.5x, tombstones are gone, and lookups still work.
#[test]
fn heavy_removal_compacts() {
    let ops: MapOps<u32, u32> = MapOps::new();
    let n = 40;
    let mut t = DHashTable::with_capacity(&ops, (), n).unwrap();
    for k in 0..n {
        t.add(&k).unwrap();
    }
    assert_eq!(t.capacity(), 64);

    // 20 survivors want 30 slots: 32.
    t.enumerate(|v| if v.entry().key % 2 == 0 { EnumFlags::REMOVE } else { EnumFlags::NEXT });
    assert_eq!(t.len(), 20);
    assert_eq!(t.capacity(), 32);
    assert_eq!(t.removed_count(), 0);
    assert_eq!(t.generation(), 1);

    // 5 survivors floor at the minimum size.
    t.enumerate(|v| if v.entry().key > 10 { EnumFlags::REMOVE } else { EnumFlags::NEXT });
    assert_eq!(t.len(), 5);
    assert_eq!(t.capacity(), MIN_SIZE);
    assert_eq!(t.generation(), 2);
    for k in [1, 3, 5, 7, 9] {
        assert!(t.contains(&k));
    }
}

#[test]
fn compaction_applies_after_stop() {
    let ops: MapOps<u32, u32> = MapOps::new();
    let n = 24;
    let mut t = DHashTable::new(&ops, ()).unwrap();
    for k in 0..n {
        t.add(&k).unwrap();
    }
    assert_eq!(t.capacity(), 32);
    // Remove the first 16 visited, then stop: 8 survivors at or under the
    // minimum load of a 32-slot table.
    let count = t.enumerate(|v| {
        if v.ordinal() < 15 {
            EnumFlags::REMOVE
        } else {
            EnumFlags::REMOVE | EnumFlags::STOP
        }
    });
    assert_eq!(count, 16);
    assert_eq!(t.len(), 8);
    assert_eq!(t.capacity(), MIN_SIZE);
    assert_eq!(t.generation(), 2);
}

// Test: raw removal through the visit.
// Verifies: entries go, tombstones stay and no compaction follows.
#[test]
fn visit_raw_remove_defers_compaction() {
    let ops: MapOps<u32, u32> = MapOps::new();
    let n = 24;
    let mut t = DHashTable::new(&ops, ()).unwrap();
    for k in 0..n {
        t.add(&k).unwrap();
    }
    let generation = t.generation();
    t.enumerate(|v| {
        v.raw_remove();
        EnumFlags::NEXT
    });
    assert!(t.is_empty());
    assert_eq!(t.removed_count(), n);
    assert_eq!(t.capacity(), 32);
    assert_eq!(t.generation(), generation);
}

#[test]
fn enumerate_empty_table() {
    let ops: MapOps<u32, u32> = MapOps::new();
    let mut t = DHashTable::new(&ops, ()).unwrap();
    let count = t.enumerate(|_| unreachable!("no entries to visit"));
    assert_eq!(count, 0);
}
