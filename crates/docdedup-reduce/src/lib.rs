#![warn(missing_docs)]

//! docdedup reduction subsystem: structural object deduplication for document graphs
//!
//! Run: Objects → Fingerprint → Group → Rewrite references → Delete duplicates → Collect garbage

pub mod compression;
pub mod config;
pub mod dedupe;
pub mod document;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod gc;
pub mod metrics;
pub mod object;
pub mod rewrite;
pub mod store;

pub use compression::StreamFilter;
pub use config::DedupConfig;
pub use dedupe::{DedupPlan, DuplicateGroup, DuplicateIndex, ReplacementMap};
pub use document::{Document, DocumentSnapshot, SnapshotEntry};
pub use engine::{DedupReport, Deduplicator};
pub use error::DedupError;
pub use fingerprint::{fingerprint, ContentDigest, Fingerprint};
pub use gc::{GarbageCollector, GcConfig, GcEngine, GcStats};
pub use metrics::{DedupMetric, DedupMetrics, MetricKind, MetricValue, MetricsHandle, MetricsSnapshot};
pub use object::{Dictionary, Name, Object, Reference, Stream};
pub use store::{ObjectStore, ObjectTable};
