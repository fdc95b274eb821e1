//! Exclusive-access guard for table entry points.
//!
//! Every public table method enters the guard before touching storage.
//! Entering while another entry is active means an ops callback found its
//! way back into the table it was called from, which panics. A table marked
//! immutable panics on any mutating entry instead, and stops tracking reads.

use core::cell::Cell;

/// Per-table access tracker. Embed it next to the guarded state and start
/// each entry point with `let _g = self.access.enter();` or `enter_mut()`.
#[derive(Debug)]
pub struct AccessGuard {
    depth: Cell<u32>,
    immutable: Cell<bool>,
}

impl AccessGuard {
    pub const fn new() -> Self {
        Self {
            depth: Cell::new(0),
            immutable: Cell::new(false),
        }
    }

    /// Enter a read-only section.
    #[inline]
    pub fn enter(&self) -> Entered<'_> {
        if self.immutable.get() {
            return Entered { owner: None };
        }
        self.push()
    }

    /// Enter a section that may mutate the table.
    #[inline]
    pub fn enter_mut(&self) -> Entered<'_> {
        assert!(!self.immutable.get(), "mutation of a table marked immutable");
        self.push()
    }

    /// Forbid mutation for the rest of the guard's life.
    pub fn mark_immutable(&self) {
        debug_assert_eq!(self.depth.get(), 0);
        self.immutable.set(true);
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable.get()
    }

    fn push(&self) -> Entered<'_> {
        let d = self.depth.get();
        assert!(d == 0, "reentrancy detected: nested entry into hash table");
        self.depth.set(d + 1);
        Entered { owner: Some(self) }
    }
}

impl Default for AccessGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII token returned by `AccessGuard::enter` and `enter_mut`.
pub struct Entered<'a> {
    owner: Option<&'a AccessGuard>,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        if let Some(owner) = self.owner {
            let d = owner.depth.get();
            debug_assert!(d > 0);
            owner.depth.set(d - 1);
        }
    }
}
