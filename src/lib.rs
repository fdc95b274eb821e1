//! dhash-table: a generic open-addressing hash table using double hashing,
//! with entries stored inline and all key knowledge supplied by an ops
//! trait.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one table implementation that serves any entry type, where the
//!   caller decides how keys hash and match, how entries are initialized,
//!   moved and cleared, and where storage comes from.
//! - Layers:
//!   - `Slot<E>`: a storage cell that is free, a tombstone, or a live
//!     entry tagged with its scrambled key hash.
//!   - `RawTable`: probing, resizing and load accounting over a slot
//!     vector. Assumes exclusive access.
//!   - `DHashTable`: the public surface. Takes the access guard on every
//!     entry point, hands out generation-checked `EntryHandle`s, and owns
//!     the per-table context passed to every `TableOps` hook.
//!   - `enumerate`: a callback walk over live entries that can remove or
//!     stop, and compacts storage afterwards when removals left it sparse.
//!
//! Hashing
//! - `TableOps::hash_key` produces any 32-bit value. The table multiplies
//!   it by the golden ratio and keeps the high bits for the home slot
//!   (`hash1`); the low bits form an odd stride (`hash2`), so every probe
//!   sequence visits every slot of a power-of-two table.
//! - Stored key hashes are never 0 or 1; those values mark free and
//!   removed slots in the encoded form exposed by `Slot::key_hash`.
//!
//! Sizing
//! - Capacity is a power of two between 16 and 2^23. An add that misses
//!   grows the table (or rebuilds it in place when tombstones fill a
//!   quarter of it) once live entries plus tombstones reach the maximum
//!   load. A remove that leaves the table under its minimum load shrinks
//!   it by half. Every rebuild advances the generation.
//!
//! Reentrancy
//! - Hooks must not call back into the table that invoked them. Each
//!   entry point enters an `AccessGuard`; a nested entry panics. Tables
//!   marked immutable panic on mutation and skip the check on reads.
//!
//! Threading
//! - No internal synchronization. A table is `Send` when its parts are
//!   and never `Sync`.
//!
//! Notes
//! - Counters for searches, probe steps and resizes are compiled in with
//!   the `stats` feature, together with `DHashTable::dump_meter`.

pub mod alpha;
mod enumerate;
mod error;
mod meter;
pub mod ops;
mod raw;
mod reentrancy;
pub mod slot;
mod table;
mod table_proptest;

// Public surface
pub use alpha::{
    capacity_for, default_capacity, min_alpha_for, AlphaBounds, TableConfig, DEFAULT_MAX_ALPHA,
    DEFAULT_MIN_ALPHA,
};
pub use enumerate::{EnumFlags, Visit};
pub use error::{AddError, AlphaBoundsError, InitError};
#[cfg(feature = "stats")]
pub use meter::{ChainStats, TableStats};
pub use ops::{EntryStub, MapEntry, MapOps, StubOps, TableOps, STUB_OPS};
pub use reentrancy::{AccessGuard, Entered};
pub use slot::{scramble, Slot, GOLDEN_RATIO, HASH_BITS, MIN_SIZE, SIZE_LIMIT};
pub use table::{DHashTable, EntryHandle, Iter, Operation};
