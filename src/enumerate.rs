//! Mutation-aware enumeration of live entries.
//!
//! `DHashTable::enumerate` hands each live entry to a callback in storage
//! order. The callback's `EnumFlags` can remove the entry or stop the walk.
//! Entries removed with `REMOVE` may make the table rebuild smaller storage
//! once the walk ends; `Visit::raw_remove` removes without that.

use crate::ops::TableOps;
use crate::table::{DHashTable, EntryHandle};
use crate::meter::meter;
use crate::slot::Slot;
use core::ops::{BitOr, BitOrAssign};

/// What to do after visiting an entry. Combine with `|`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumFlags(u8);

impl EnumFlags {
    /// Keep going.
    pub const NEXT: EnumFlags = EnumFlags(0);
    /// Remove the entry just visited.
    pub const REMOVE: EnumFlags = EnumFlags(1 << 0);
    /// Stop after the entry just visited.
    pub const STOP: EnumFlags = EnumFlags(1 << 1);

    #[inline]
    pub fn contains(self, other: EnumFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for EnumFlags {
    type Output = EnumFlags;

    #[inline]
    fn bitor(self, rhs: EnumFlags) -> EnumFlags {
        EnumFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for EnumFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: EnumFlags) {
        self.0 |= rhs.0;
    }
}

/// The entry currently being visited.
pub struct Visit<'a, E> {
    entry: &'a mut E,
    ordinal: u32,
    handle: EntryHandle,
    raw_removed: bool,
}

impl<E> Visit<'_, E> {
    pub fn entry(&self) -> &E {
        self.entry
    }

    pub fn entry_mut(&mut self) -> &mut E {
        self.entry
    }

    /// Zero-based position among the live entries visited so far.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Handle of the entry, valid until the walk removes anything or the
    /// table next resizes.
    pub fn handle(&self) -> EntryHandle {
        self.handle
    }

    /// Remove this entry once the callback returns, without letting the
    /// walk rebuild storage on its account.
    pub fn raw_remove(&mut self) {
        self.raw_removed = true;
    }
}

impl<'o, O: TableOps> DHashTable<'o, O> {
    /// Visit every live entry in storage order and return how many were
    /// visited. With `STOP` that is the count up to and including the
    /// stopping entry.
    ///
    /// If any callback returned `REMOVE`, storage is rebuilt afterwards
    /// when tombstones fill a quarter of it or the table fell to its
    /// minimum load; the rebuild sizes the table for the survivors and
    /// advances the generation.
    pub fn enumerate<F>(&mut self, mut f: F) -> u32
    where
        F: FnMut(&mut Visit<'_, O::Entry>) -> EnumFlags,
    {
        let _g = self.access.enter_mut();
        let raw = &mut self.raw;
        let generation = raw.generation();
        let capacity = raw.capacity() as usize;
        let mut ordinal = 0u32;
        let mut did_remove = false;

        for index in 0..capacity {
            let Some(Slot::Live { key_hash, entry }) = raw.slot_mut(index) else {
                continue;
            };
            let mut visit = Visit {
                handle: EntryHandle::new(index, generation, *key_hash),
                entry,
                ordinal,
                raw_removed: false,
            };
            let flags = f(&mut visit);
            let raw_removed = visit.raw_removed;
            ordinal += 1;

            if flags.contains(EnumFlags::REMOVE) {
                meter!(raw.meter, remove_enums);
                did_remove = true;
                raw.raw_remove(index);
            } else if raw_removed {
                raw.raw_remove(index);
            }
            if flags.contains(EnumFlags::STOP) {
                break;
            }
        }

        if did_remove {
            raw.compact_after_enumerate();
        }
        ordinal
    }
}
