//! Error types for the docdedup-reduce subsystem

use crate::object::Reference;

/// All errors that can occur while deduplicating a document graph
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    /// Stream payload could not be decoded into its plain bytes
    #[error("Stream decode failed: {0}")]
    StreamDecodeFailed(String),
    /// Stream payload could not be encoded with the requested filter
    #[error("Stream encode failed: {0}")]
    StreamEncodeFailed(String),
    /// The graph store rejected an operation
    #[error("Object store error: {0}")]
    Store(String),
    /// Object slot is already occupied
    #[error("Object {0} already exists")]
    DuplicateReference(Reference),
    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Document snapshot could not be read or written
    #[error("Snapshot error: {0}")]
    Snapshot(String),
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
