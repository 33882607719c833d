//! Prometheus-compatible metrics for deduplication runs.
//!
//! Counters accumulate across runs of one [`Deduplicator`](crate::engine::Deduplicator)
//! and can be shared with a reporting thread through [`MetricsHandle`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::DedupReport;

/// The type of metric: counter or gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up or down.
    Gauge,
}

/// The value of a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A counter value.
    Counter(u64),
    /// A gauge value.
    Gauge(f64),
}

/// A single metric with metadata and value.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupMetric {
    /// The metric name.
    pub name: String,
    /// Help text describing the metric.
    pub help: String,
    /// The kind of metric.
    pub kind: MetricKind,
    /// The metric value.
    pub value: MetricValue,
}

/// Thread-safe counters for deduplication runs.
pub struct DedupMetrics {
    runs: AtomicU64,
    objects_scanned: AtomicU64,
    duplicate_groups: AtomicU64,
    objects_merged: AtomicU64,
    references_rewritten: AtomicU64,
    gc_cycles: AtomicU64,
    gc_objects_reclaimed: AtomicU64,
}

impl DedupMetrics {
    /// Create a new DedupMetrics with all counters initialized to zero.
    #[inline]
    pub fn new() -> Self {
        Self {
            runs: AtomicU64::new(0),
            objects_scanned: AtomicU64::new(0),
            duplicate_groups: AtomicU64::new(0),
            objects_merged: AtomicU64::new(0),
            references_rewritten: AtomicU64::new(0),
            gc_cycles: AtomicU64::new(0),
            gc_objects_reclaimed: AtomicU64::new(0),
        }
    }

    /// Record a completed run.
    pub fn record_run(&self, report: &DedupReport) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.objects_scanned
            .fetch_add(report.objects_before as u64, Ordering::Relaxed);
        self.duplicate_groups
            .fetch_add(report.duplicate_groups as u64, Ordering::Relaxed);
        self.objects_merged
            .fetch_add(report.objects_merged as u64, Ordering::Relaxed);
        self.references_rewritten
            .fetch_add(report.references_rewritten as u64, Ordering::Relaxed);
        self.gc_cycles.fetch_add(1, Ordering::Relaxed);
        self.gc_objects_reclaimed
            .fetch_add(report.gc.objects_reclaimed as u64, Ordering::Relaxed);
    }

    /// Fraction of scanned objects removed as duplicates.
    ///
    /// Returns 0.0 if nothing has been scanned.
    pub fn merge_ratio(&self) -> f64 {
        let scanned = self.objects_scanned.load(Ordering::Relaxed);
        let merged = self.objects_merged.load(Ordering::Relaxed);
        if scanned == 0 {
            0.0
        } else {
            merged as f64 / scanned as f64
        }
    }

    /// Collect all metrics with Prometheus-style names and help text.
    pub fn collect(&self) -> Vec<DedupMetric> {
        let counter = |name: &str, help: &str, v: &AtomicU64| DedupMetric {
            name: name.to_string(),
            help: help.to_string(),
            kind: MetricKind::Counter,
            value: MetricValue::Counter(v.load(Ordering::Relaxed)),
        };
        vec![
            counter("docdedup_runs_total", "Total deduplication runs completed", &self.runs),
            counter(
                "docdedup_objects_scanned_total",
                "Total objects fingerprinted",
                &self.objects_scanned,
            ),
            counter(
                "docdedup_duplicate_groups_total",
                "Total buckets with more than one member",
                &self.duplicate_groups,
            ),
            counter(
                "docdedup_objects_merged_total",
                "Total duplicate objects removed",
                &self.objects_merged,
            ),
            counter(
                "docdedup_references_rewritten_total",
                "Total reference fields redirected to a canonical object",
                &self.references_rewritten,
            ),
            counter("docdedup_gc_cycles_total", "Total garbage collection cycles", &self.gc_cycles),
            counter(
                "docdedup_gc_objects_reclaimed_total",
                "Total objects reclaimed by garbage collection",
                &self.gc_objects_reclaimed,
            ),
            DedupMetric {
                name: "docdedup_merge_ratio".to_string(),
                help: "Duplicate objects removed per object scanned".to_string(),
                kind: MetricKind::Gauge,
                value: MetricValue::Gauge(self.merge_ratio()),
            },
        ]
    }

    /// Render in Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        for metric in self.collect() {
            let (kind, value) = match metric.value {
                MetricValue::Counter(v) => ("counter", v.to_string()),
                MetricValue::Gauge(v) => ("gauge", v.to_string()),
            };
            out.push_str(&format!("# HELP {} {}\n", metric.name, metric.help));
            out.push_str(&format!("# TYPE {} {}\n", metric.name, kind));
            out.push_str(&format!("{} {}\n", metric.name, value));
        }
        out
    }
}

impl Default for DedupMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A shareable handle to `DedupMetrics`.
#[derive(Clone, Default)]
pub struct MetricsHandle {
    inner: Arc<DedupMetrics>,
}

impl MetricsHandle {
    /// Create a new MetricsHandle with fresh metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a reference to the underlying metrics.
    pub fn metrics(&self) -> Arc<DedupMetrics> {
        Arc::clone(&self.inner)
    }

    /// Take a point-in-time snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::from_metrics(&self.inner)
    }
}

/// A point-in-time snapshot of all metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Runs completed.
    pub runs: u64,
    /// Objects fingerprinted.
    pub objects_scanned: u64,
    /// Duplicate groups found.
    pub duplicate_groups: u64,
    /// Duplicate objects removed.
    pub objects_merged: u64,
    /// Reference fields rewritten.
    pub references_rewritten: u64,
    /// GC cycles run.
    pub gc_cycles: u64,
    /// Objects reclaimed by GC.
    pub gc_objects_reclaimed: u64,
    /// Merged / scanned.
    pub merge_ratio: f64,
}

impl MetricsSnapshot {
    fn from_metrics(metrics: &DedupMetrics) -> Self {
        Self {
            runs: metrics.runs.load(Ordering::Relaxed),
            objects_scanned: metrics.objects_scanned.load(Ordering::Relaxed),
            duplicate_groups: metrics.duplicate_groups.load(Ordering::Relaxed),
            objects_merged: metrics.objects_merged.load(Ordering::Relaxed),
            references_rewritten: metrics.references_rewritten.load(Ordering::Relaxed),
            gc_cycles: metrics.gc_cycles.load(Ordering::Relaxed),
            gc_objects_reclaimed: metrics.gc_objects_reclaimed.load(Ordering::Relaxed),
            merge_ratio: metrics.merge_ratio(),
        }
    }
}
