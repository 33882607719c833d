//! Deduplication run: fingerprint → group → rewrite → delete → collect

use crate::{
    config::DedupConfig,
    dedupe::{DedupPlan, DuplicateIndex},
    error::DedupError,
    gc::{GarbageCollector, GcStats},
    metrics::DedupMetrics,
    object::Dictionary,
    rewrite,
    store::ObjectStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupReport {
    /// Present objects before the run
    pub objects_before: usize,
    /// Buckets with more than one member
    pub duplicate_groups: usize,
    /// Duplicates removed
    pub objects_merged: usize,
    /// Reference fields redirected, trailer included
    pub references_rewritten: usize,
    /// Garbage collection outcome
    pub gc: GcStats,
    /// Present objects after the run
    pub objects_after: usize,
}

/// Collapses structurally identical objects into one canonical instance.
///
/// Assumes exclusive, single-threaded access to the store for the whole run.
/// There is no rollback: a collaborator error leaves the store in whatever
/// state it reached.
pub struct Deduplicator {
    config: DedupConfig,
    metrics: Option<Arc<DedupMetrics>>,
}

impl Deduplicator {
    /// Create with the given configuration
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Record every completed run into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<DedupMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Fingerprint and group without mutating anything.
    pub fn plan(&self, store: &dyn ObjectStore) -> Result<DedupPlan, DedupError> {
        Ok(DuplicateIndex::group(store, self.config.aggressive)?.plan())
    }

    /// Run the full sequence against `store`, rewriting `trailer` alongside.
    #[instrument(skip_all, fields(aggressive = self.config.aggressive))]
    pub fn run(
        &self,
        store: &mut dyn ObjectStore,
        trailer: &mut Dictionary,
        gc: &mut dyn GarbageCollector,
    ) -> Result<DedupReport, DedupError> {
        let objects_before = store.len();
        let plan = self.plan(&*store)?;
        for group in &plan.groups {
            debug!(
                digest = %group.digest,
                canonical = %group.canonical,
                duplicates = group.duplicates.len(),
                "Duplicate group"
            );
        }

        let mut references_rewritten = rewrite::apply(store, &plan.replacements)?;
        if !plan.replacements.is_empty() {
            references_rewritten += rewrite::rewrite_dictionary(trailer, &plan.replacements);
        }

        let removals = plan.replacements.removal_set();
        for reference in &removals {
            store.remove(*reference)?;
        }

        let gc_stats = gc.collect_garbage(store, trailer)?;

        let report = DedupReport {
            objects_before,
            duplicate_groups: plan.groups.len(),
            objects_merged: removals.len(),
            references_rewritten,
            gc: gc_stats,
            objects_after: store.len(),
        };
        info!(
            before = report.objects_before,
            groups = report.duplicate_groups,
            merged = report.objects_merged,
            rewritten = report.references_rewritten,
            reclaimed = report.gc.objects_reclaimed,
            after = report.objects_after,
            "Deduplication complete"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_run(&report);
        }
        Ok(report)
    }
}
