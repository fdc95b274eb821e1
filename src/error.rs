//! Error types returned by table construction, insertion and sizing.

use core::fmt;

/// Why `DHashTable` construction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// `TableOps::alloc_table` returned no storage.
    AllocFailed,
    /// The requested capacity reaches `SIZE_LIMIT`.
    CapacityOverflow,
    /// The configured alpha bounds are invalid.
    Alpha(AlphaBoundsError),
}

/// Why an add did not produce an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddError {
    /// The table needed to grow, storage could not be allocated, and the
    /// current storage is too full to take another entry.
    AllocFailed,
    /// The table needed to grow past `SIZE_LIMIT` and is too full to take
    /// another entry.
    CapacityOverflow,
    /// `TableOps::init_entry` refused the key.
    InitRejected,
}

/// Why `set_alpha_bounds` refused a pair of load factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaBoundsError {
    /// `max_alpha` is below 0.5, not below 1, or not a number.
    MaxOutOfRange,
    /// A minimum-size table at `max_alpha` would have no free slot left.
    MaxLeavesNoFreeSlot,
    /// `min_alpha` is negative or not a number.
    MinOutOfRange,
    /// `min_alpha` is not below `max_alpha / 2`, so one add followed by one
    /// remove could grow and then shrink the table.
    MinNotBelowHalfMax,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::AllocFailed => f.write_str("failed to allocate table storage"),
            InitError::CapacityOverflow => f.write_str("requested capacity exceeds the size limit"),
            InitError::Alpha(e) => write!(f, "invalid alpha bounds: {e}"),
        }
    }
}

impl fmt::Display for AddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddError::AllocFailed => f.write_str("failed to allocate storage while growing"),
            AddError::CapacityOverflow => f.write_str("table cannot grow past the size limit"),
            AddError::InitRejected => f.write_str("entry initialization rejected the key"),
        }
    }
}

impl fmt::Display for AlphaBoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlphaBoundsError::MaxOutOfRange => f.write_str("max alpha must be in [0.5, 1)"),
            AlphaBoundsError::MaxLeavesNoFreeSlot => {
                f.write_str("max alpha leaves no free slot in a minimum-size table")
            }
            AlphaBoundsError::MinOutOfRange => f.write_str("min alpha must not be negative"),
            AlphaBoundsError::MinNotBelowHalfMax => {
                f.write_str("min alpha must be below half of max alpha")
            }
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::Alpha(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for AddError {}

impl std::error::Error for AlphaBoundsError {}

impl From<AlphaBoundsError> for InitError {
    fn from(e: AlphaBoundsError) -> Self {
        InitError::Alpha(e)
    }
}
