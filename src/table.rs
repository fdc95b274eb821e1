//! DHashTable: guarded public surface over `RawTable` with generation-checked handles.

use crate::alpha::{AlphaBounds, TableConfig};
use crate::error::{AddError, AlphaBoundsError, InitError};
use crate::ops::TableOps;
use crate::raw::RawTable;
use crate::reentrancy::AccessGuard;
use crate::slot::Slot;
use core::fmt;
use core::mem;

/// Selector for `DHashTable::operate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Lookup,
    Add,
    Remove,
}

/// Names a live entry without borrowing the table.
///
/// A handle resolves while the table's generation is unchanged and its slot
/// still holds an entry with the same key hash. Any resize invalidates it.
/// Removing the entry and adding another key with an identical key hash
/// into the same slot, with no resize in between, makes the old handle
/// resolve to the new entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EntryHandle {
    index: u32,
    generation: u32,
    key_hash: u32,
}

impl EntryHandle {
    pub(crate) fn new(index: usize, generation: u32, key_hash: u32) -> Self {
        Self {
            index: index as u32,
            generation,
            key_hash,
        }
    }

    /// Slot index in storage order.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Table generation the handle was issued in.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Scrambled key hash of the entry.
    pub fn key_hash(&self) -> u32 {
        self.key_hash
    }

    pub fn entry<'a, O: TableOps>(&self, table: &'a DHashTable<'_, O>) -> Option<&'a O::Entry> {
        table.get(*self)
    }

    pub fn entry_mut<'a, O: TableOps>(
        &self,
        table: &'a mut DHashTable<'_, O>,
    ) -> Option<&'a mut O::Entry> {
        table.get_mut(*self)
    }
}

/// Open-addressing hash table using double hashing.
///
/// Entries live inline in a power-of-two slot vector. All knowledge of keys
/// and entries comes from the borrowed `TableOps`; the table owns its
/// `Context` and passes it to every hook.
///
/// Not internally synchronized. The table is `Send` when its parts are and
/// never `Sync`; share it across threads behind a lock.
pub struct DHashTable<'o, O: TableOps> {
    pub(crate) raw: RawTable<'o, O>,
    pub(crate) access: AccessGuard,
}

/// Iterator over live entries in storage order.
pub struct Iter<'a, E> {
    it: core::iter::Enumerate<core::slice::Iter<'a, Slot<E>>>,
    generation: u32,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = (EntryHandle, &'a E);

    fn next(&mut self) -> Option<Self::Item> {
        for (index, slot) in self.it.by_ref() {
            if let Slot::Live { key_hash, entry } = slot {
                return Some((EntryHandle::new(index, self.generation, *key_hash), entry));
            }
        }
        None
    }
}

impl<'o, O: TableOps> DHashTable<'o, O> {
    /// Table with the minimum capacity and default alpha bounds.
    pub fn new(ops: &'o O, ctx: O::Context) -> Result<Self, InitError> {
        Self::with_config(ops, ctx, TableConfig::default())
    }

    /// Table sized so `capacity_hint` adds never reallocate.
    pub fn with_capacity(ops: &'o O, ctx: O::Context, capacity_hint: u32) -> Result<Self, InitError> {
        Self::with_config(ops, ctx, TableConfig::new().capacity_hint(capacity_hint))
    }

    pub fn with_config(ops: &'o O, ctx: O::Context, config: TableConfig) -> Result<Self, InitError> {
        Ok(Self {
            raw: RawTable::new(ops, ctx, &config)?,
            access: AccessGuard::new(),
        })
    }

    #[inline]
    fn handle_at(&self, index: usize) -> EntryHandle {
        let key_hash = self.raw.slot(index).map_or(0, Slot::key_hash);
        debug_assert!(key_hash >= 2);
        EntryHandle::new(index, self.raw.generation(), key_hash)
    }

    #[inline]
    fn resolve(&self, handle: EntryHandle) -> Option<usize> {
        if handle.generation != self.raw.generation() {
            return None;
        }
        let index = handle.index as usize;
        match self.raw.slot(index)? {
            Slot::Live { key_hash, .. } if *key_hash == handle.key_hash => Some(index),
            _ => None,
        }
    }

    /// Single entry point for the three keyed operations.
    ///
    /// `Lookup` and `Add` return the entry's handle, or `None` when the key
    /// is absent or the add failed. `Remove` always returns `None`.
    pub fn operate(&mut self, key: &O::Key, op: Operation) -> Option<EntryHandle> {
        match op {
            Operation::Lookup => self.lookup(key),
            Operation::Add => self.add(key).ok(),
            Operation::Remove => {
                self.remove(key);
                None
            }
        }
    }

    pub fn lookup(&self, key: &O::Key) -> Option<EntryHandle> {
        let _g = self.access.enter();
        let index = self.raw.lookup(key)?;
        Some(self.handle_at(index))
    }

    pub fn contains(&self, key: &O::Key) -> bool {
        let _g = self.access.enter();
        self.raw.lookup(key).is_some()
    }

    /// Find the entry for `key`, inserting a fresh one if absent.
    ///
    /// A fresh entry starts from `Entry::default()` and passes through
    /// `init_entry`. Adding a key that is already present changes nothing
    /// and returns the same handle as before.
    pub fn add(&mut self, key: &O::Key) -> Result<EntryHandle, AddError> {
        let _g = self.access.enter_mut();
        let index = self.raw.add(key)?;
        Ok(self.handle_at(index))
    }

    /// Remove the entry for `key`. Returns whether one was present.
    pub fn remove(&mut self, key: &O::Key) -> bool {
        let _g = self.access.enter_mut();
        self.raw.remove(key)
    }

    /// Remove an entry already located by `lookup`, `add` or `iter`,
    /// without hashing its key again and without shrinking. Returns false
    /// for a stale handle.
    pub fn raw_remove(&mut self, handle: EntryHandle) -> bool {
        let _g = self.access.enter_mut();
        match self.resolve(handle) {
            Some(index) => self.raw.raw_remove(index),
            None => false,
        }
    }

    pub fn get(&self, handle: EntryHandle) -> Option<&O::Entry> {
        let _g = self.access.enter();
        let index = self.resolve(handle)?;
        self.raw.slot(index).and_then(Slot::entry)
    }

    pub fn get_mut(&mut self, handle: EntryHandle) -> Option<&mut O::Entry> {
        let _g = self.access.enter_mut();
        let index = self.resolve(handle)?;
        self.raw.slot_mut(index).and_then(Slot::entry_mut)
    }

    pub fn lookup_entry(&self, key: &O::Key) -> Option<&O::Entry> {
        let _g = self.access.enter();
        let index = self.raw.lookup(key)?;
        self.raw.slot(index).and_then(Slot::entry)
    }

    pub fn lookup_entry_mut(&mut self, key: &O::Key) -> Option<&mut O::Entry> {
        let _g = self.access.enter_mut();
        let index = self.raw.lookup(key)?;
        self.raw.slot_mut(index).and_then(Slot::entry_mut)
    }

    /// `add`, returning the entry itself for the caller to fill in.
    pub fn add_entry(&mut self, key: &O::Key) -> Result<&mut O::Entry, AddError> {
        let _g = self.access.enter_mut();
        let index = self.raw.add(key)?;
        match self.raw.slot_mut(index).and_then(Slot::entry_mut) {
            Some(entry) => Ok(entry),
            None => unreachable!("add returned a non-live slot"),
        }
    }

    /// Live entries in storage order.
    pub fn iter(&self) -> Iter<'_, O::Entry> {
        Iter {
            it: self.raw.slots().iter().enumerate(),
            generation: self.raw.generation(),
        }
    }

    /// Replace the load-factor bounds. Takes effect at the next add or
    /// remove; the current storage is not resized.
    pub fn set_alpha_bounds(&mut self, max_alpha: f64, min_alpha: f64) -> Result<(), AlphaBoundsError> {
        let _g = self.access.enter_mut();
        let bounds = AlphaBounds::new(max_alpha, min_alpha).inspect_err(|e| {
            log::debug!("dhash: rejected alpha bounds ({max_alpha}, {min_alpha}): {e}");
        })?;
        self.raw.set_alpha(bounds);
        Ok(())
    }

    /// Forbid all further mutation. Mutating calls panic afterwards and
    /// reads are no longer checked for reentrancy.
    pub fn mark_immutable(&self) {
        self.access.mark_immutable();
    }

    pub fn is_immutable(&self) -> bool {
        self.access.is_immutable()
    }

    /// Tear the table down: `finalize`, then `clear_entry` for each live
    /// entry, then `free_table`. Dropping the table does the same.
    pub fn finish(self) {
        drop(self);
    }

    pub fn len(&self) -> usize {
        self.raw.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.raw.entry_count() == 0
    }

    /// Live entries.
    pub fn entry_count(&self) -> u32 {
        self.raw.entry_count()
    }

    /// Tombstones awaiting the next rebuild.
    pub fn removed_count(&self) -> u32 {
        self.raw.removed_count()
    }

    /// Gross slot count, always a power of two.
    pub fn capacity(&self) -> u32 {
        self.raw.capacity()
    }

    /// Incremented by every rebuild of storage.
    pub fn generation(&self) -> u32 {
        self.raw.generation()
    }

    /// `32 - log2(capacity)`.
    pub fn hash_shift(&self) -> u32 {
        self.raw.hash_shift()
    }

    /// Bytes per slot.
    pub fn entry_size(&self) -> usize {
        mem::size_of::<Slot<O::Entry>>()
    }

    pub fn max_alpha(&self) -> f64 {
        self.raw.alpha().max()
    }

    pub fn min_alpha(&self) -> f64 {
        self.raw.alpha().min()
    }

    pub fn ops(&self) -> &'o O {
        self.raw.ops
    }

    pub fn context(&self) -> &O::Context {
        &self.raw.ctx
    }

    pub fn context_mut(&mut self) -> &mut O::Context {
        let _g = self.access.enter_mut();
        &mut self.raw.ctx
    }

    /// Slot storage plus whatever `size_of_entry` reports for each live
    /// entry. The ops and the table value itself are not counted.
    pub fn size_of_excluding_this<F>(&self, mut size_of_entry: F) -> usize
    where
        F: FnMut(&O::Entry) -> usize,
    {
        let _g = self.access.enter();
        let entries: usize = self.raw.slots().iter().filter_map(Slot::entry).map(&mut size_of_entry).sum();
        self.raw.storage_bytes() + entries
    }

    /// `size_of_excluding_this` plus the table value itself.
    pub fn size_of_including_this<F>(&self, size_of_entry: F) -> usize
    where
        F: FnMut(&O::Entry) -> usize,
    {
        mem::size_of::<Self>() + self.size_of_excluding_this(size_of_entry)
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> crate::meter::TableStats {
        self.raw.meter.snapshot()
    }

    /// Probe-chain statistics over every live entry.
    #[cfg(feature = "stats")]
    pub fn chain_stats(&self) -> crate::meter::ChainStats {
        let _g = self.access.enter();
        let lengths: Vec<(u32, u32)> = self
            .raw
            .slots()
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Live { key_hash, .. } => Some(self.raw.chain_len(*key_hash, index)),
                _ => None,
            })
            .collect();
        crate::meter::ChainStats::from_lengths(&lengths)
    }

    /// Write sizing, counters and probe-chain statistics to `out`.
    #[cfg(feature = "stats")]
    pub fn dump_meter<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        let chains = self.chain_stats();
        let capacity = self.capacity();
        writeln!(out, "Double hashing statistics:")?;
        writeln!(out, "        table size (in entries): {capacity}")?;
        writeln!(out, "              number of entries: {}", self.entry_count())?;
        writeln!(out, "      number of removed entries: {}", self.removed_count())?;
        writeln!(out, "                     generation: {}", self.generation())?;
        writeln!(
            out,
            "                    load factor: {:.4}",
            f64::from(self.entry_count()) / f64::from(capacity)
        )?;
        write!(out, "{}", self.stats())?;
        writeln!(out, "  mean steps per hash chain: {:.4} +/- {:.4}", chains.mean_chain_len, chains.sigma)?;
        writeln!(
            out,
            "   max hash chain length: {} (home slot {})",
            chains.max_chain_len, chains.max_chain_hash1
        )?;
        Ok(())
    }
}

impl<O: TableOps> Drop for DHashTable<'_, O> {
    fn drop(&mut self) {
        self.raw.teardown();
    }
}

impl<O: TableOps> fmt::Debug for DHashTable<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DHashTable")
            .field("capacity", &self.capacity())
            .field("entry_count", &self.entry_count())
            .field("removed_count", &self.removed_count())
            .field("generation", &self.generation())
            .field("max_alpha", &self.max_alpha())
            .field("min_alpha", &self.min_alpha())
            .finish()
    }
}
