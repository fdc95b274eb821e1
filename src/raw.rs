//! RawTable: storage, probing and resizing, without access checks.
//!
//! Everything here assumes the caller holds the table's access guard. The
//! public `DHashTable` takes the guard and delegates.

use crate::alpha::{AlphaBounds, TableConfig};
use crate::error::{AddError, InitError};
#[cfg(feature = "stats")]
use crate::meter::Meter;
use crate::meter::meter;
use crate::ops::TableOps;
use crate::slot::{ceiling_log2, hash1, hash2, scramble, Slot, HASH_BITS, MIN_SIZE, SIZE_LIMIT};
use core::mem;

/// Outcome of a search: the index of a matching live slot, or of the slot
/// where the key would go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    Hit(usize),
    Miss(usize),
}

pub(crate) struct RawTable<'o, O: TableOps> {
    pub(crate) ops: &'o O,
    pub(crate) ctx: O::Context,
    hash_shift: u32,
    alpha: AlphaBounds,
    entry_count: u32,
    removed_count: u32,
    generation: u32,
    store: Vec<Slot<O::Entry>>,
    #[cfg(feature = "stats")]
    pub(crate) meter: Meter,
}

impl<'o, O: TableOps> RawTable<'o, O> {
    pub(crate) fn new(ops: &'o O, ctx: O::Context, config: &TableConfig) -> Result<Self, InitError> {
        let alpha = config.bounds()?;
        let capacity = config.initial_capacity(&alpha)?;
        let Some(store) = ops.alloc_table(&ctx, capacity as usize) else {
            log::warn!("dhash: failed to allocate {capacity} slots");
            return Err(InitError::AllocFailed);
        };
        debug_assert_eq!(store.len(), capacity as usize);
        Ok(Self {
            ops,
            ctx,
            hash_shift: HASH_BITS - capacity.trailing_zeros(),
            alpha,
            entry_count: 0,
            removed_count: 0,
            generation: 0,
            store,
            #[cfg(feature = "stats")]
            meter: Meter::default(),
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> u32 {
        1 << self.size_log2()
    }

    #[inline]
    pub(crate) fn size_log2(&self) -> u32 {
        HASH_BITS - self.hash_shift
    }

    #[inline]
    pub(crate) fn hash_shift(&self) -> u32 {
        self.hash_shift
    }

    #[inline]
    pub(crate) fn entry_count(&self) -> u32 {
        self.entry_count
    }

    #[inline]
    pub(crate) fn removed_count(&self) -> u32 {
        self.removed_count
    }

    #[inline]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub(crate) fn alpha(&self) -> &AlphaBounds {
        &self.alpha
    }

    pub(crate) fn set_alpha(&mut self, alpha: AlphaBounds) {
        self.alpha = alpha;
    }

    #[inline]
    pub(crate) fn slots(&self) -> &[Slot<O::Entry>] {
        &self.store
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> Option<&Slot<O::Entry>> {
        self.store.get(index)
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot<O::Entry>> {
        self.store.get_mut(index)
    }

    /// Bytes of slot storage owned by the table.
    pub(crate) fn storage_bytes(&self) -> usize {
        self.store.len() * mem::size_of::<Slot<O::Entry>>()
    }

    #[inline]
    pub(crate) fn key_hash_of(&self, key: &O::Key) -> u32 {
        scramble(self.ops.hash_key(&self.ctx, key))
    }

    #[inline]
    fn matches(&self, slot: &Slot<O::Entry>, key_hash: u32, key: &O::Key) -> bool {
        match slot {
            Slot::Live { key_hash: kh, entry } => {
                *kh == key_hash && self.ops.match_entry(&self.ctx, entry, key)
            }
            _ => false,
        }
    }

    /// Walk the double-hashing sequence for `key`. With `for_add`, a miss
    /// reports the first tombstone passed, if any, instead of the free slot
    /// that ended the walk.
    pub(crate) fn search(&self, key: &O::Key, key_hash: u32, for_add: bool) -> Probe {
        meter!(self.meter, searches);
        let mut h1 = hash1(key_hash, self.hash_shift);
        let slot = &self.store[h1 as usize];
        if slot.is_free() {
            meter!(self.meter, misses);
            return Probe::Miss(h1 as usize);
        }
        if self.matches(slot, key_hash, key) {
            meter!(self.meter, hits);
            return Probe::Hit(h1 as usize);
        }

        let size_log2 = self.size_log2();
        let h2 = hash2(key_hash, size_log2, self.hash_shift);
        let mask = (1u32 << size_log2) - 1;
        let mut first_removed: Option<u32> = None;
        loop {
            if first_removed.is_none() && self.store[h1 as usize].is_removed() {
                first_removed = Some(h1);
            }
            meter!(self.meter, steps);
            h1 = h1.wrapping_sub(h2) & mask;

            let slot = &self.store[h1 as usize];
            if slot.is_free() {
                meter!(self.meter, misses);
                let index = match first_removed {
                    Some(removed) if for_add => removed,
                    _ => h1,
                };
                return Probe::Miss(index as usize);
            }
            if self.matches(slot, key_hash, key) {
                meter!(self.meter, hits);
                return Probe::Hit(h1 as usize);
            }
        }
    }

    /// First non-busy slot on `key_hash`'s probe sequence. Used while
    /// rebuilding, when no tombstones exist and no key can match.
    fn find_free_slot(&self, key_hash: u32) -> usize {
        let mut h1 = hash1(key_hash, self.hash_shift);
        if !self.store[h1 as usize].is_busy() {
            return h1 as usize;
        }
        let size_log2 = self.size_log2();
        let h2 = hash2(key_hash, size_log2, self.hash_shift);
        let mask = (1u32 << size_log2) - 1;
        loop {
            meter!(self.meter, steps);
            h1 = h1.wrapping_sub(h2) & mask;
            if !self.store[h1 as usize].is_busy() {
                return h1 as usize;
            }
        }
    }

    /// Rebuild storage at `2^(log2 + delta_log2)` slots. Live entries are
    /// moved through `move_entry`, tombstones are dropped and the
    /// generation advances. On failure the old storage stays in place.
    pub(crate) fn change_table(&mut self, delta_log2: i32) -> Result<(), AddError> {
        let old_capacity = self.capacity();
        let new_log2 = self.size_log2() as i32 + delta_log2;
        debug_assert!(new_log2 >= MIN_SIZE.trailing_zeros() as i32);
        let new_capacity = match u32::try_from(new_log2).ok().and_then(|l| 1u32.checked_shl(l)) {
            Some(c) if c < SIZE_LIMIT => c,
            _ => return Err(AddError::CapacityOverflow),
        };
        let Some(new_store) = self.ops.alloc_table(&self.ctx, new_capacity as usize) else {
            log::warn!("dhash: failed to allocate {new_capacity} slots, keeping {old_capacity}");
            return Err(AddError::AllocFailed);
        };
        debug_assert_eq!(new_store.len(), new_capacity as usize);

        self.hash_shift = HASH_BITS - new_log2 as u32;
        self.removed_count = 0;
        self.generation = self.generation.wrapping_add(1);

        let mut old_store = mem::replace(&mut self.store, new_store);
        for slot in old_store.iter_mut() {
            if let Slot::Live { key_hash, entry } = mem::replace(slot, Slot::Free) {
                let entry = self.ops.move_entry(&self.ctx, entry);
                let index = self.find_free_slot(key_hash);
                self.store[index] = Slot::Live { key_hash, entry };
            }
        }
        self.ops.free_table(&self.ctx, old_store);

        log::debug!(
            "dhash: resized {old_capacity} -> {new_capacity} slots, {} entries, generation {}",
            self.entry_count,
            self.generation
        );
        Ok(())
    }

    pub(crate) fn lookup(&self, key: &O::Key) -> Option<usize> {
        meter!(self.meter, lookups);
        let key_hash = self.key_hash_of(key);
        match self.search(key, key_hash, false) {
            Probe::Hit(index) => Some(index),
            Probe::Miss(_) => None,
        }
    }

    /// Find or insert the entry for `key` and return its slot index.
    pub(crate) fn add(&mut self, key: &O::Key) -> Result<usize, AddError> {
        let key_hash = self.key_hash_of(key);
        let mut probe = self.search(key, key_hash, true);
        if let Probe::Hit(index) = probe {
            meter!(self.meter, add_hits);
            return Ok(index);
        }

        let capacity = self.capacity();
        if self.entry_count + self.removed_count >= self.alpha.max_load(capacity) {
            // Plenty of tombstones: rebuild in place rather than grow.
            let delta_log2 = if self.removed_count >= capacity >> 2 { 0 } else { 1 };
            match self.change_table(delta_log2) {
                Ok(()) => {
                    if delta_log2 == 0 {
                        meter!(self.meter, compresses);
                    } else {
                        meter!(self.meter, grows);
                    }
                    probe = self.search(key, key_hash, true);
                }
                Err(e) => {
                    // Keep going in the old storage unless it is nearly full.
                    // At least one slot stays free so probes terminate.
                    let reserve = (capacity >> 5).max(1);
                    if self.entry_count + self.removed_count >= capacity - reserve {
                        meter!(self.meter, add_failures);
                        return Err(e);
                    }
                }
            }
        }

        let index = match probe {
            Probe::Miss(index) => index,
            // Rebuilding cannot make a missing key appear.
            Probe::Hit(index) => return Ok(index),
        };

        let mut entry = O::Entry::default();
        if !self.ops.init_entry(&self.ctx, &mut entry, key) {
            meter!(self.meter, add_failures);
            log::trace!("dhash: init_entry rejected key for slot {index}");
            return Err(AddError::InitRejected);
        }

        if self.store[index].is_removed() {
            meter!(self.meter, add_over_removed);
            self.removed_count -= 1;
        } else {
            meter!(self.meter, add_misses);
        }
        self.store[index] = Slot::Live { key_hash, entry };
        self.entry_count += 1;
        Ok(index)
    }

    /// Remove the entry for `key`, shrinking if the table became underloaded.
    pub(crate) fn remove(&mut self, key: &O::Key) -> bool {
        let key_hash = self.key_hash_of(key);
        let Probe::Hit(index) = self.search(key, key_hash, false) else {
            meter!(self.meter, remove_misses);
            return false;
        };
        meter!(self.meter, remove_hits);
        self.raw_remove(index);

        let capacity = self.capacity();
        if capacity > MIN_SIZE
            && self.entry_count < self.alpha.min_load(capacity)
            && self.change_table(-1).is_ok()
        {
            meter!(self.meter, shrinks);
        }
        true
    }

    /// Turn the live slot at `index` into a tombstone and clear its entry.
    /// Returns false if the slot is not live. Never resizes.
    pub(crate) fn raw_remove(&mut self, index: usize) -> bool {
        if !self.store.get(index).is_some_and(Slot::is_live) {
            return false;
        }
        // Unlink before calling out so `clear_entry` sees a consistent table.
        let Slot::Live { entry, .. } = mem::replace(&mut self.store[index], Slot::Removed) else {
            unreachable!()
        };
        self.removed_count += 1;
        self.entry_count -= 1;
        self.ops.clear_entry(&self.ctx, entry);
        true
    }

    /// After an enumeration removed entries, rebuild storage sized for the
    /// survivors if tombstones or underload warrant it.
    pub(crate) fn compact_after_enumerate(&mut self) {
        let capacity = self.capacity();
        let underloaded = capacity > MIN_SIZE && self.entry_count <= self.alpha.min_load(capacity);
        if self.removed_count < capacity >> 2 && !underloaded {
            return;
        }
        let wanted = (self.entry_count + (self.entry_count >> 1)).max(MIN_SIZE);
        let delta_log2 = ceiling_log2(wanted) as i32 - self.size_log2() as i32;
        if self.change_table(delta_log2).is_ok() {
            meter!(self.meter, enum_shrinks);
        }
    }

    /// Probe-sequence length from `key_hash`'s home slot to `index`, and the
    /// home slot itself.
    #[cfg(feature = "stats")]
    pub(crate) fn chain_len(&self, key_hash: u32, index: usize) -> (u32, u32) {
        let home = hash1(key_hash, self.hash_shift);
        let mut h1 = home;
        let mut len = 1;
        let size_log2 = self.size_log2();
        let h2 = hash2(key_hash, size_log2, self.hash_shift);
        let mask = (1u32 << size_log2) - 1;
        while h1 as usize != index {
            h1 = h1.wrapping_sub(h2) & mask;
            len += 1;
        }
        (home, len)
    }

    /// Run `finalize`, clear every live entry, and hand storage back.
    pub(crate) fn teardown(&mut self) {
        self.ops.finalize(&mut self.ctx);
        let mut store = mem::take(&mut self.store);
        for slot in store.iter_mut() {
            if let Slot::Live { entry, .. } = mem::replace(slot, Slot::Free) {
                self.ops.clear_entry(&self.ctx, entry);
            }
        }
        self.entry_count = 0;
        self.removed_count = 0;
        self.ops.free_table(&self.ctx, store);
    }
}
