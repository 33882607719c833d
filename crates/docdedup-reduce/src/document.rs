//! In-memory document: object table, trailer and collector bound together.

use crate::config::DedupConfig;
use crate::dedupe::DedupPlan;
use crate::engine::{DedupReport, Deduplicator};
use crate::error::DedupError;
use crate::gc::{GarbageCollector, GcEngine, GcStats};
use crate::metrics::MetricsHandle;
use crate::object::{Dictionary, Object, Reference};
use crate::store::{ObjectStore, ObjectTable};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// JSON interchange form of a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Top-level objects in reference order
    pub objects: Vec<SnapshotEntry>,
    /// Trailer dictionary
    #[serde(default)]
    pub trailer: Dictionary,
}

/// One top-level object of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Where the object lives
    pub reference: Reference,
    /// The object
    pub object: Object,
}

/// A document graph and the collaborators deduplication needs.
pub struct Document {
    objects: ObjectTable,
    trailer: Dictionary,
    gc: GcEngine,
    config: DedupConfig,
    metrics: MetricsHandle,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with default configuration
    pub fn new() -> Self {
        Self::with_config(DedupConfig::default())
    }

    /// Empty document with the given configuration
    pub fn with_config(config: DedupConfig) -> Self {
        Self {
            objects: ObjectTable::new(),
            trailer: Dictionary::new(),
            gc: GcEngine::new(config.gc.clone()),
            config,
            metrics: MetricsHandle::new(),
        }
    }

    /// The object table
    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    /// The object table, for construction and edits
    pub fn objects_mut(&mut self) -> &mut ObjectTable {
        &mut self.objects
    }

    /// The trailer dictionary
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// The trailer dictionary, for edits
    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    /// Point the trailer's `Root` entry at `reference`
    pub fn set_root(&mut self, reference: Reference) {
        self.trailer.insert("Root", reference);
    }

    /// The document root, if the trailer names one
    pub fn root(&self) -> Option<Reference> {
        self.trailer.get("Root").and_then(Object::as_reference)
    }

    /// Metrics accumulated by this document's runs
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Merge structurally identical objects, then collect garbage.
    ///
    /// With `aggressive` set, stream payloads take part in the comparison.
    pub fn deduplicate_objects(&mut self, aggressive: bool) -> Result<(), DedupError> {
        self.deduplicate_with_report(aggressive).map(|_| ())
    }

    /// [`deduplicate_objects`](Self::deduplicate_objects) with the configured
    /// aggressiveness
    pub fn deduplicate_objects_default(&mut self) -> Result<(), DedupError> {
        self.deduplicate_objects(self.config.aggressive)
    }

    /// Deduplicate and return what happened
    pub fn deduplicate_with_report(&mut self, aggressive: bool) -> Result<DedupReport, DedupError> {
        let config = DedupConfig {
            aggressive,
            ..self.config.clone()
        };
        Deduplicator::new(config)
            .with_metrics(self.metrics.metrics())
            .run(&mut self.objects, &mut self.trailer, &mut self.gc)
    }

    /// Describe what a run would merge without changing anything
    pub fn plan(&self, aggressive: bool) -> Result<DedupPlan, DedupError> {
        let config = DedupConfig {
            aggressive,
            ..self.config.clone()
        };
        Deduplicator::new(config).plan(&self.objects)
    }

    /// Remove every object unreachable from the trailer
    pub fn collect_garbage(&mut self) -> Result<GcStats, DedupError> {
        self.gc.collect_garbage(&mut self.objects, &self.trailer)
    }

    /// Build from a snapshot
    pub fn from_snapshot(snapshot: DocumentSnapshot, config: DedupConfig) -> Result<Self, DedupError> {
        let mut doc = Self::with_config(config);
        for entry in snapshot.objects {
            doc.objects.insert(entry.reference, entry.object)?;
        }
        doc.trailer = snapshot.trailer;
        Ok(doc)
    }

    /// Capture as a snapshot
    pub fn to_snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            objects: self
                .objects
                .iter()
                .map(|(reference, object)| SnapshotEntry {
                    reference,
                    object: object.clone(),
                })
                .collect(),
            trailer: self.trailer.clone(),
        }
    }

    /// Parse a JSON snapshot
    pub fn from_json_slice(bytes: &[u8], config: DedupConfig) -> Result<Self, DedupError> {
        let snapshot: DocumentSnapshot =
            serde_json::from_slice(bytes).map_err(|e| DedupError::Snapshot(e.to_string()))?;
        Self::from_snapshot(snapshot, config)
    }

    /// Serialize as a JSON snapshot. Fails on NaN or infinite reals, which
    /// JSON cannot carry.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, DedupError> {
        for (reference, object) in self.objects.iter() {
            if has_non_finite_real(object) {
                return Err(DedupError::Snapshot(format!(
                    "object {} holds a non-finite real",
                    reference
                )));
            }
        }
        if self.trailer.iter().any(|(_, value)| has_non_finite_real(value)) {
            return Err(DedupError::Snapshot("trailer holds a non-finite real".to_string()));
        }
        serde_json::to_vec_pretty(&self.to_snapshot()).map_err(|e| DedupError::Snapshot(e.to_string()))
    }

    /// Load a JSON snapshot from disk
    pub fn load(path: &Path, config: DedupConfig) -> Result<Self, DedupError> {
        let bytes = std::fs::read(path)?;
        Self::from_json_slice(&bytes, config)
    }

    /// Write a JSON snapshot to disk
    pub fn save(&self, path: &Path) -> Result<(), DedupError> {
        std::fs::write(path, self.to_json_vec()?)?;
        Ok(())
    }

    /// Number of present objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

fn has_non_finite_real(object: &Object) -> bool {
    match object {
        Object::Real(v) => !v.is_finite(),
        Object::Array(items) => items.iter().any(has_non_finite_real),
        Object::Dictionary(dict) => dict.iter().any(|(_, v)| has_non_finite_real(v)),
        Object::Stream(stream) => stream.dict.iter().any(|(_, v)| has_non_finite_real(v)),
        _ => false,
    }
}
