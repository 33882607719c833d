//! Duplicate index: buckets objects by fingerprint and picks a canonical survivor per bucket

use crate::error::DedupError;
use crate::fingerprint::{fingerprint, ContentDigest, Fingerprint};
use crate::object::Reference;
use crate::store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Objects grouped by fingerprint.
///
/// Buckets keep first-occurrence order, and references within a bucket keep
/// insertion order, so the first member of a bucket is the first object the
/// store enumerated with that fingerprint.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    positions: HashMap<Fingerprint, usize>,
    buckets: Vec<(Fingerprint, Vec<Reference>)>,
}

impl DuplicateIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint every present object of the store, in enumeration order.
    /// Reserved slots are skipped.
    pub fn group(store: &dyn ObjectStore, aggressive: bool) -> Result<Self, DedupError> {
        let mut index = Self::new();
        for (reference, object) in store.enumerate() {
            let Some(object) = object else { continue };
            index.insert(fingerprint(object, aggressive)?, reference);
        }
        Ok(index)
    }

    /// Add a reference to the bucket for `fp`
    pub fn insert(&mut self, fp: Fingerprint, reference: Reference) {
        match self.positions.get(&fp) {
            Some(&pos) => self.buckets[pos].1.push(reference),
            None => {
                self.positions.insert(fp.clone(), self.buckets.len());
                self.buckets.push((fp, vec![reference]));
            }
        }
    }

    /// Members of the bucket for `fp`, in insertion order
    pub fn bucket(&self, fp: &Fingerprint) -> Option<&[Reference]> {
        self.positions.get(fp).map(|&pos| self.buckets[pos].1.as_slice())
    }

    /// Number of distinct fingerprints
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of indexed objects
    pub fn object_count(&self) -> usize {
        self.buckets.iter().map(|(_, refs)| refs.len()).sum()
    }

    /// Buckets with more than one member, as duplicate groups
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        self.buckets
            .iter()
            .filter(|(_, refs)| refs.len() > 1)
            .map(|(fp, refs)| DuplicateGroup {
                digest: fp.digest(),
                canonical: refs[0],
                duplicates: refs[1..].to_vec(),
            })
            .collect()
    }

    /// Map every non-first member of every multi-member bucket to the
    /// bucket's first member.
    pub fn build(&self) -> ReplacementMap {
        let mut map = ReplacementMap::default();
        for (_, refs) in self.buckets.iter().filter(|(_, refs)| refs.len() > 1) {
            let canonical = refs[0];
            for duplicate in &refs[1..] {
                map.entries.insert(*duplicate, canonical);
            }
        }
        map
    }

    /// Groups and replacement map together
    pub fn plan(&self) -> DedupPlan {
        DedupPlan {
            groups: self.duplicate_groups(),
            replacements: self.build(),
        }
    }
}

/// One bucket of structurally identical objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Digest of the shared fingerprint
    pub digest: ContentDigest,
    /// Surviving object
    pub canonical: Reference,
    /// Objects to be replaced by `canonical`
    pub duplicates: Vec<Reference>,
}

/// Duplicate → canonical reference mapping.
///
/// Targets are always canonical, and canonical references never appear as
/// keys, so a single lookup yields the final target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementMap {
    entries: HashMap<Reference, Reference>,
}

impl ReplacementMap {
    /// Canonical replacement for a reference, if it is a duplicate
    pub fn resolve(&self, reference: &Reference) -> Option<Reference> {
        self.entries.get(reference).copied()
    }

    /// Number of duplicates
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is to be replaced
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate (duplicate, canonical) pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&Reference, &Reference)> {
        self.entries.iter()
    }

    /// References scheduled for deletion, ordered
    pub fn removal_set(&self) -> BTreeSet<Reference> {
        self.entries.keys().copied().collect()
    }
}

/// Result of the grouping phase: what a run would merge.
#[derive(Debug, Clone, Default)]
pub struct DedupPlan {
    /// Multi-member buckets in first-occurrence order
    pub groups: Vec<DuplicateGroup>,
    /// Mapping used by the rewriter
    pub replacements: ReplacementMap,
}

impl DedupPlan {
    /// Number of objects that would be removed
    pub fn duplicate_count(&self) -> usize {
        self.replacements.len()
    }
}
