//! The operations trait through which a table learns about its entries.
//!
//! A table never inspects keys or entries itself. Hashing, key comparison,
//! moving entries between storages, clearing removed entries, and storage
//! allocation all go through a `TableOps` value that the table borrows for
//! its whole life. Ops values hold no per-table state, so a single `static`
//! can serve any number of tables, each with its own `Context`.
//!
//! Only `hash_key` and `match_entry` must be written; the remaining hooks
//! default to the stub behavior that suits plain Rust entries.

use crate::slot::Slot;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use hashbrown::hash_map::DefaultHashBuilder;

/// Hooks driving a `DHashTable`.
///
/// No hook may call back into the table that invoked it; doing so panics.
pub trait TableOps {
    /// Lookup key. Need not be stored in the entry at all.
    type Key: ?Sized;
    /// Entry stored in each live slot. A freshly claimed slot starts from
    /// `Entry::default()`.
    type Entry: Default;
    /// Per-table data handed to every hook.
    type Context;

    /// Allocate `capacity` free slots. `None` reports allocation failure.
    fn alloc_table(&self, ctx: &Self::Context, capacity: usize) -> Option<Vec<Slot<Self::Entry>>> {
        let _ = ctx;
        Slot::alloc_free(capacity)
    }

    /// Release storage previously returned by `alloc_table`. Every slot is
    /// free by the time this is called.
    fn free_table(&self, ctx: &Self::Context, storage: Vec<Slot<Self::Entry>>) {
        let _ = ctx;
        drop(storage);
    }

    /// Hash `key`. Any value is allowed; the table scrambles it.
    fn hash_key(&self, ctx: &Self::Context, key: &Self::Key) -> u32;

    /// Whether `entry` is identified by `key`.
    fn match_entry(&self, ctx: &Self::Context, entry: &Self::Entry, key: &Self::Key) -> bool;

    /// Relocate an entry into new storage during a resize.
    fn move_entry(&self, ctx: &Self::Context, from: Self::Entry) -> Self::Entry {
        let _ = ctx;
        from
    }

    /// Dispose of a removed entry.
    fn clear_entry(&self, ctx: &Self::Context, entry: Self::Entry) {
        let _ = ctx;
        drop(entry);
    }

    /// Called once when the table is finished, before remaining entries
    /// are cleared.
    fn finalize(&self, ctx: &mut Self::Context) {
        let _ = ctx;
    }

    /// Fill in a newly claimed entry for `key`. Returning false fails the
    /// add and leaves the slot unclaimed.
    fn init_entry(&self, ctx: &Self::Context, entry: &mut Self::Entry, key: &Self::Key) -> bool {
        let _ = (ctx, entry, key);
        true
    }
}

/// Entry holding just a pointer-sized key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EntryStub {
    pub key: usize,
}

/// Ops for tables keyed by addresses or other pointer-sized integers.
///
/// The hash discards the two low bits, which are zero for any address of a
/// 4-byte-aligned object.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubOps;

/// Shared stub ops instance.
pub static STUB_OPS: StubOps = StubOps;

impl TableOps for StubOps {
    type Key = usize;
    type Entry = EntryStub;
    type Context = ();

    #[inline]
    fn hash_key(&self, _ctx: &(), key: &usize) -> u32 {
        (*key >> 2) as u32
    }

    #[inline]
    fn match_entry(&self, _ctx: &(), entry: &EntryStub, key: &usize) -> bool {
        entry.key == *key
    }

    #[inline]
    fn init_entry(&self, _ctx: &(), entry: &mut EntryStub, key: &usize) -> bool {
        entry.key = *key;
        true
    }
}

/// Key/value entry used by `MapOps`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapEntry<K, V> {
    pub key: K,
    pub value: V,
}

/// Ops for any `K: Hash + Eq`, hashing through a `BuildHasher`.
///
/// New entries get a clone of the key and `V::default()`.
pub struct MapOps<K, V, S = DefaultHashBuilder> {
    hasher: S,
    _pd: PhantomData<fn() -> (K, V)>,
}

impl<K, V> MapOps<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K, V> Default for MapOps<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> MapOps<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            _pd: PhantomData,
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<K, V, S> TableOps for MapOps<K, V, S>
where
    K: Hash + Eq + Clone + Default,
    V: Default,
    S: BuildHasher,
{
    type Key = K;
    type Entry = MapEntry<K, V>;
    type Context = ();

    #[inline]
    fn hash_key(&self, _ctx: &(), key: &K) -> u32 {
        let h = self.hasher.hash_one(key);
        (h ^ (h >> 32)) as u32
    }

    #[inline]
    fn match_entry(&self, _ctx: &(), entry: &MapEntry<K, V>, key: &K) -> bool {
        entry.key == *key
    }

    fn init_entry(&self, _ctx: &(), entry: &mut MapEntry<K, V>, key: &K) -> bool {
        entry.key = key.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_ops_ignore_alignment_bits() {
        assert_eq!(STUB_OPS.hash_key(&(), &0x1000), STUB_OPS.hash_key(&(), &0x1003));
        assert_ne!(STUB_OPS.hash_key(&(), &0x1000), STUB_OPS.hash_key(&(), &0x1004));
    }

    #[test]
    fn stub_ops_init_and_match() {
        let mut e = EntryStub::default();
        assert!(STUB_OPS.init_entry(&(), &mut e, &0x40));
        assert!(STUB_OPS.match_entry(&(), &e, &0x40));
        assert!(!STUB_OPS.match_entry(&(), &e, &0x44));
    }

    #[test]
    fn map_ops_hash_is_deterministic_per_instance() {
        let ops: MapOps<String, i32> = MapOps::new();
        let a = ops.hash_key(&(), &"abc".to_string());
        let b = ops.hash_key(&(), &"abc".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn map_ops_init_copies_key() {
        let ops: MapOps<String, i32> = MapOps::new();
        let mut e = MapEntry::default();
        assert!(ops.init_entry(&(), &mut e, &"k".to_string()));
        assert_eq!(e.key, "k");
        assert_eq!(e.value, 0);
        assert!(ops.match_entry(&(), &e, &"k".to_string()));
    }

    #[test]
    fn default_hooks_are_stubs() {
        let ops: MapOps<u32, u32> = MapOps::new();
        let store = ops.alloc_table(&(), 4).unwrap();
        assert!(store.iter().all(Slot::is_free));
        let moved = ops.move_entry(&(), MapEntry { key: 1, value: 2 });
        assert_eq!(moved, MapEntry { key: 1, value: 2 });
        ops.clear_entry(&(), moved);
        ops.free_table(&(), store);
    }
}
