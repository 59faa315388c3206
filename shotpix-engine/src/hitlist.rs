//! Record of accepted event indices.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Set of event indices accepted as hits.
///
/// Populated during normal discrimination, or preloaded from a persisted
/// list to replay accept/reject decisions deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitRecord {
    indices: BTreeSet<u64>,
}

impl HitRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an event index as a hit.
    pub fn insert(&mut self, index: u64) {
        self.indices.insert(index);
    }

    /// True if the event index was recorded as a hit.
    #[must_use]
    pub fn contains(&self, index: u64) -> bool {
        self.indices.contains(&index)
    }

    /// Number of recorded hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True if no hit was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterates over the recorded indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.indices.iter().copied()
    }
}

impl FromIterator<u64> for HitRecord {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}
