//! Set difference between two snapshots.
//!
//! Snapshots are compared as sets of distinct records. Duplicate rows
//! collapse, and a reordering with the same records is not a change.

use std::collections::HashSet;

use crate::types::{Record, Snapshot};

/// Records added and removed between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Present in the new snapshot only, in the new snapshot's order.
    pub added: Vec<Record>,
    /// Present in the old snapshot only, in the old snapshot's order.
    pub removed: Vec<Record>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute the records added and removed going from `old` to `new`.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Diff {
    let old_set: HashSet<&Record> = old.records().iter().collect();
    let new_set: HashSet<&Record> = new.records().iter().collect();

    Diff {
        added: only_in(new.records(), &old_set),
        removed: only_in(old.records(), &new_set),
    }
}

/// Records of `records` missing from `other`, first occurrence only.
fn only_in(records: &[Record], other: &HashSet<&Record>) -> Vec<Record> {
    let mut seen: HashSet<&Record> = HashSet::new();
    records
        .iter()
        .filter(|r| !other.contains(r) && seen.insert(*r))
        .cloned()
        .collect()
}
