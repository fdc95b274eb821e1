//! Load-factor bounds, initial sizing and table configuration.

use crate::error::{AlphaBoundsError, InitError};
use crate::slot::{MIN_SIZE, SIZE_LIMIT};

/// Default fraction of slots that may be busy before an add grows the table.
pub const DEFAULT_MAX_ALPHA: f64 = 0.75;

/// Default fraction of slots below which a remove shrinks the table.
pub const DEFAULT_MIN_ALPHA: f64 = 0.25;

/// Validated pair of load factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaBounds {
    max: f64,
    min: f64,
}

impl AlphaBounds {
    /// 0.75 / 0.25.
    pub const DEFAULT: AlphaBounds = AlphaBounds {
        max: DEFAULT_MAX_ALPHA,
        min: DEFAULT_MIN_ALPHA,
    };

    /// Checks `0.5 <= max < 1`, that a minimum-size table keeps at least one
    /// free slot at `max`, and `0 <= min < max / 2`.
    pub fn new(max: f64, min: f64) -> Result<Self, AlphaBoundsError> {
        if !(0.5..1.0).contains(&max) {
            return Err(AlphaBoundsError::MaxOutOfRange);
        }
        let min_size = f64::from(MIN_SIZE);
        if min_size - max * min_size < 1.0 {
            return Err(AlphaBoundsError::MaxLeavesNoFreeSlot);
        }
        if min.is_nan() || min < 0.0 {
            return Err(AlphaBoundsError::MinOutOfRange);
        }
        if min >= max / 2.0 {
            return Err(AlphaBoundsError::MinNotBelowHalfMax);
        }
        Ok(AlphaBounds { max, min })
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Busy-slot count at which a table of `capacity` slots must resize
    /// before taking a new entry.
    #[inline]
    pub fn max_load(&self, capacity: u32) -> u32 {
        (f64::from(capacity) * self.max) as u32
    }

    /// Live-entry count below which a table of `capacity` slots shrinks.
    #[inline]
    pub fn min_load(&self, capacity: u32) -> u32 {
        (f64::from(capacity) * self.min) as u32
    }
}

impl Default for AlphaBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Smallest capacity hint for which `entry_count` adds right after
/// construction never reallocate, at load bound `max_alpha`.
pub fn capacity_for(entry_count: u32, max_alpha: f64) -> u32 {
    let cap = (f64::from(entry_count) / max_alpha) as u32;
    if ((f64::from(cap) * max_alpha) as u32) < entry_count {
        cap.saturating_add(1)
    } else {
        cap
    }
}

/// `capacity_for` at the default maximum alpha.
pub fn default_capacity(entry_count: u32) -> u32 {
    capacity_for(entry_count, DEFAULT_MAX_ALPHA)
}

/// Lowest load factor at which double hashing still uses less memory than
/// chaining, for entries of `entry_words` pointer-sized words when chaining
/// would waste `k` words per entry.
pub fn min_alpha_for(entry_words: usize, k: usize) -> f64 {
    if entry_words == 0 {
        return 0.0;
    }
    (entry_words - 1) as f64 / (entry_words + k) as f64
}

/// Construction parameters for a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    /// Number of entries the table should hold without reallocating.
    pub capacity_hint: u32,
    pub max_alpha: f64,
    pub min_alpha: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            capacity_hint: 0,
            max_alpha: DEFAULT_MAX_ALPHA,
            min_alpha: DEFAULT_MIN_ALPHA,
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity_hint(mut self, capacity_hint: u32) -> Self {
        self.capacity_hint = capacity_hint;
        self
    }

    pub fn alpha_bounds(mut self, max_alpha: f64, min_alpha: f64) -> Self {
        self.max_alpha = max_alpha;
        self.min_alpha = min_alpha;
        self
    }

    pub(crate) fn bounds(&self) -> Result<AlphaBounds, AlphaBoundsError> {
        AlphaBounds::new(self.max_alpha, self.min_alpha)
    }

    /// Power-of-two slot count for the hint, at least `MIN_SIZE`.
    pub(crate) fn initial_capacity(&self, bounds: &AlphaBounds) -> Result<u32, InitError> {
        let wanted = capacity_for(self.capacity_hint, bounds.max()).max(MIN_SIZE);
        match wanted.checked_next_power_of_two() {
            Some(capacity) if capacity < SIZE_LIMIT => Ok(capacity),
            _ => Err(InitError::CapacityOverflow),
        }
    }
}
