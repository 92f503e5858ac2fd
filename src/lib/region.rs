//! Genomic region descriptors used to partition calling work.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named genomic interval with 0-based half-open coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Chromosome or contig name
    pub name: String,
    /// 0-based inclusive start
    pub start: u64,
    /// 0-based exclusive end
    pub end: u64,
}

impl Region {
    /// Creates a region from a name and 0-based half-open coordinates.
    #[must_use]
    pub fn new(name: impl Into<String>, start: u64, end: u64) -> Self {
        Self { name: name.into(), start, end }
    }

    /// Renders the region as a filesystem-safe identifier (`chr1_0_1000`).
    ///
    /// Used to namespace per-region output files so concurrently executing
    /// work units never collide.
    #[must_use]
    pub fn to_safe_str(&self) -> String {
        format!("{}_{}_{}", self.name, self.start, self.end)
    }

    /// Renders the region in the 1-based inclusive form external tools expect
    /// (`chr1:1-1000`).
    #[must_use]
    pub fn to_tool_str(&self) -> String {
        format!("{}:{}-{}", self.name, self.start + 1, self.end)
    }

    /// True when the interval overlaps the given 0-based half-open range on
    /// the same contig.
    #[must_use]
    pub fn overlaps(&self, name: &str, start: u64, end: u64) -> bool {
        self.name == name && self.start < end && start < self.end
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.name, self.start, self.end)
    }
}
