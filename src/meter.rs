//! Operation counters, compiled in with the `stats` feature.

#[cfg(feature = "stats")]
use core::cell::Cell;
#[cfg(feature = "stats")]
use core::fmt;

/// Bump a meter counter. Expands to nothing without the `stats` feature.
macro_rules! meter {
    ($meter:expr, $field:ident) => {{
        #[cfg(feature = "stats")]
        {
            $meter.$field.set($meter.$field.get().wrapping_add(1));
        }
    }};
    ($meter:expr, $field:ident, $n:expr) => {{
        #[cfg(feature = "stats")]
        {
            $meter.$field.set($meter.$field.get().wrapping_add($n));
        }
    }};
}
pub(crate) use meter;

macro_rules! counters {
    ($($field:ident: $doc:literal,)*) => {
        /// Live counters. Cells so read-only lookups can count too.
        #[cfg(feature = "stats")]
        #[derive(Debug, Default)]
        pub(crate) struct Meter {
            $(pub(crate) $field: Cell<u32>,)*
        }

        /// Snapshot of a table's operation counters.
        #[cfg(feature = "stats")]
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct TableStats {
            $(#[doc = $doc] pub $field: u32,)*
        }

        #[cfg(feature = "stats")]
        impl Meter {
            pub(crate) fn snapshot(&self) -> TableStats {
                TableStats {
                    $($field: self.$field.get(),)*
                }
            }
        }

        #[cfg(feature = "stats")]
        impl fmt::Display for TableStats {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                $(writeln!(f, "{:>18}: {}", stringify!($field), self.$field)?;)*
                Ok(())
            }
        }
    };
}

counters! {
    searches: "Table searches.",
    steps: "Probe steps past the home slot.",
    hits: "Searches that found the key.",
    misses: "Searches that did not find the key.",
    lookups: "Lookup operations.",
    add_misses: "Adds that claimed a new slot.",
    add_over_removed: "Adds that reused a tombstone.",
    add_hits: "Adds that found an existing entry.",
    add_failures: "Adds that failed to grow or initialize.",
    remove_hits: "Removes that found the key.",
    remove_misses: "Removes that did not find the key.",
    remove_enums: "Removes requested by an enumerator.",
    grows: "Table expansions.",
    shrinks: "Table contractions.",
    compresses: "Same-size rebuilds dropping tombstones.",
    enum_shrinks: "Rebuilds after an enumeration removed entries.",
}

/// Probe-chain lengths of every live entry, as computed by `dump_meter`.
#[cfg(feature = "stats")]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ChainStats {
    /// Longest probe sequence needed to reach a live entry.
    pub max_chain_len: u32,
    /// Home slot index of the longest chain.
    pub max_chain_hash1: u32,
    pub mean_chain_len: f64,
    pub sigma: f64,
}

#[cfg(feature = "stats")]
impl ChainStats {
    pub(crate) fn from_lengths(lengths: &[(u32, u32)]) -> Self {
        let mut stats = ChainStats::default();
        if lengths.is_empty() {
            return stats;
        }
        let n = lengths.len() as f64;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for &(hash1, len) in lengths {
            let l = f64::from(len);
            sum += l;
            sum_sq += l * l;
            if len > stats.max_chain_len {
                stats.max_chain_len = len;
                stats.max_chain_hash1 = hash1;
            }
        }
        stats.mean_chain_len = sum / n;
        let variance = (sum_sq / n) - stats.mean_chain_len * stats.mean_chain_len;
        stats.sigma = variance.max(0.0).sqrt();
        stats
    }
}
