//! Garbage collection engine using mark-and-sweep from the document root.
//! Reclaims objects no longer reachable through the trailer.

use crate::error::DedupError;
use crate::object::{Dictionary, Object, Reference};
use crate::store::ObjectStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Statistics from a garbage collection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcStats {
    /// Number of objects scanned during this cycle.
    pub objects_scanned: usize,
    /// Number of objects reclaimed (removed) in this cycle.
    pub objects_reclaimed: usize,
}

/// Configuration for the garbage collector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Sweep even when the trailer names no root. Every object is then
    /// unreachable and the table is emptied.
    pub sweep_without_root: bool,
}

/// Reachability sweep invoked after duplicates are removed.
pub trait GarbageCollector {
    /// Remove every object unreachable from the references in `trailer`.
    fn collect_garbage(
        &mut self,
        store: &mut dyn ObjectStore,
        trailer: &Dictionary,
    ) -> Result<GcStats, DedupError>;
}

/// Garbage collection engine using mark-and-sweep.
pub struct GcEngine {
    config: GcConfig,
    /// Objects marked as reachable in the current GC cycle.
    reachable: HashSet<Reference>,
}

impl Default for GcEngine {
    fn default() -> Self {
        Self::new(GcConfig::default())
    }
}

impl GcEngine {
    /// Create a new GC engine with the given configuration.
    pub fn new(config: GcConfig) -> Self {
        Self {
            config,
            reachable: HashSet::new(),
        }
    }

    /// Clear all marks for the next GC cycle.
    pub fn clear_marks(&mut self) {
        self.reachable.clear();
    }

    /// Check if an object is marked as reachable.
    pub fn is_marked(&self, reference: &Reference) -> bool {
        self.reachable.contains(reference)
    }

    /// Mark everything reachable from `roots`. Unlike fingerprinting, marking
    /// has to cross reference edges, so it keeps a visited set.
    pub fn mark(&mut self, store: &dyn ObjectStore, roots: &[Reference]) {
        let mut pending: Vec<Reference> = roots.to_vec();
        while let Some(reference) = pending.pop() {
            if !self.reachable.insert(reference) {
                continue;
            }
            if let Some(object) = store.get(reference) {
                collect_references(object, &mut pending);
            }
        }
        debug!(marked = self.reachable.len(), "Marked reachable objects");
    }

    /// Sweep: remove every present object that is not marked.
    pub fn sweep(&mut self, store: &mut dyn ObjectStore) -> Result<GcStats, DedupError> {
        let mut scanned = 0;
        let mut doomed = Vec::new();
        for (reference, object) in store.enumerate() {
            if object.is_none() {
                continue;
            }
            scanned += 1;
            if !self.reachable.contains(&reference) {
                doomed.push(reference);
            }
        }
        for reference in &doomed {
            store.remove(*reference)?;
        }

        debug!(scanned, reclaimed = doomed.len(), "GC sweep complete");

        Ok(GcStats {
            objects_scanned: scanned,
            objects_reclaimed: doomed.len(),
        })
    }

    /// Run a complete GC cycle: clear marks, mark from roots, then sweep.
    pub fn run_cycle(
        &mut self,
        store: &mut dyn ObjectStore,
        roots: &[Reference],
    ) -> Result<GcStats, DedupError> {
        self.clear_marks();
        self.mark(&*store, roots);
        self.sweep(store)
    }
}

impl GarbageCollector for GcEngine {
    fn collect_garbage(
        &mut self,
        store: &mut dyn ObjectStore,
        trailer: &Dictionary,
    ) -> Result<GcStats, DedupError> {
        let roots = trailer_roots(trailer);
        if roots.is_empty() && !self.config.sweep_without_root {
            debug!("No document root; skipping GC sweep");
            return Ok(GcStats {
                objects_scanned: store.len(),
                objects_reclaimed: 0,
            });
        }
        self.run_cycle(store, &roots)
    }
}

/// Every reference held anywhere in the trailer.
pub fn trailer_roots(trailer: &Dictionary) -> Vec<Reference> {
    let mut roots = Vec::new();
    for (_, value) in trailer.iter() {
        collect_references(value, &mut roots);
    }
    roots
}

fn collect_references(object: &Object, out: &mut Vec<Reference>) {
    match object {
        Object::Reference(r) => out.push(*r),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, v)| collect_references(v, out)),
        Object::Stream(stream) => stream.dict.iter().for_each(|(_, v)| collect_references(v, out)),
        _ => {}
    }
}
