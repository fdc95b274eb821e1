//! Slot storage and the multiplicative key-hash arithmetic.
//!
//! A table's storage is a vector of `Slot`s whose length is always a power
//! of two. Each slot is free, a tombstone left by a removal, or live. Live
//! slots keep the scrambled key hash next to the entry so that resizing
//! never calls back into `hash_key`.

/// Number of bits in a key hash.
pub const HASH_BITS: u32 = 32;

/// 2^32 divided by the golden ratio, rounded to an odd integer.
pub const GOLDEN_RATIO: u32 = 0x9E37_79B9;

/// Smallest gross capacity of a table. Must be a power of two.
pub const MIN_SIZE: u32 = 16;

/// Exclusive upper bound on gross capacity.
pub const SIZE_LIMIT: u32 = 1 << 24;

/// Header value of a free slot.
pub const FREE_KEY_HASH: u32 = 0;

/// Header value of a removed slot.
pub const REMOVED_KEY_HASH: u32 = 1;

const _: () = assert!(MIN_SIZE.is_power_of_two());

/// One fixed-size cell of table storage.
#[derive(Debug, Default)]
pub enum Slot<E> {
    /// Never used since the last rebuild. Terminates a probe.
    #[default]
    Free,
    /// Held an entry that has since been removed. Probes continue past it.
    Removed,
    /// Holds an entry.
    Live {
        /// Scrambled hash of the entry's key, always `>= 2`.
        key_hash: u32,
        /// The caller's entry.
        entry: E,
    },
}

impl<E> Slot<E> {
    /// Allocates `capacity` free slots, or `None` if the allocation fails.
    pub fn alloc_free(capacity: usize) -> Option<Vec<Slot<E>>> {
        let mut store = Vec::new();
        store.try_reserve_exact(capacity).ok()?;
        store.resize_with(capacity, || Slot::Free);
        Some(store)
    }

    /// Header encoding of this slot: 0 when free, 1 when removed, the
    /// stored key hash otherwise.
    #[inline]
    pub fn key_hash(&self) -> u32 {
        match self {
            Slot::Free => FREE_KEY_HASH,
            Slot::Removed => REMOVED_KEY_HASH,
            Slot::Live { key_hash, .. } => *key_hash,
        }
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, Slot::Free)
    }

    /// Free or removed slots are not busy.
    #[inline]
    pub fn is_busy(&self) -> bool {
        !self.is_free()
    }

    #[inline]
    pub fn is_removed(&self) -> bool {
        matches!(self, Slot::Removed)
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self, Slot::Live { .. })
    }

    #[inline]
    pub fn entry(&self) -> Option<&E> {
        match self {
            Slot::Live { entry, .. } => Some(entry),
            _ => None,
        }
    }

    #[inline]
    pub fn entry_mut(&mut self) -> Option<&mut E> {
        match self {
            Slot::Live { entry, .. } => Some(entry),
            _ => None,
        }
    }
}

/// Spreads a caller hash across all 32 bits and moves it off the free and
/// removed header values.
#[inline]
pub fn scramble(raw_hash: u32) -> u32 {
    let key_hash = raw_hash.wrapping_mul(GOLDEN_RATIO);
    if key_hash < 2 {
        2
    } else {
        key_hash
    }
}

/// Home slot of `key_hash`: its top `log2(capacity)` bits.
#[inline]
pub(crate) fn hash1(key_hash: u32, hash_shift: u32) -> u32 {
    key_hash >> hash_shift
}

/// Probe stride of `key_hash`. The low bits left over from `hash1`, forced
/// odd so every slot of a power-of-two table is eventually visited.
#[inline]
pub(crate) fn hash2(key_hash: u32, size_log2: u32, hash_shift: u32) -> u32 {
    (key_hash.wrapping_shl(size_log2) >> hash_shift) | 1
}

/// Smallest `n` with `2^n >= value`.
#[inline]
pub(crate) fn ceiling_log2(value: u32) -> u32 {
    if value <= 1 {
        0
    } else {
        HASH_BITS - (value - 1).leading_zeros()
    }
}
