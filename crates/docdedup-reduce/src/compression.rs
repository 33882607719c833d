//! Stream payload encodings (LZ4/Zstd) and their decoders
//!
//! A stream object stores its payload encoded; aggressive fingerprinting
//! compares the decoded bytes, so two streams with the same content but
//! different filters still merge.

use crate::error::DedupError;
use serde::{Deserialize, Serialize};

/// Encoding applied to a stream payload, the analogue of a document's
/// `/Filter` entry. Only affects storage; never part of a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StreamFilter {
    /// Stored as plain bytes
    #[default]
    None,
    /// LZ4 block with prepended size
    Lz4,
    /// Zstandard frame
    Zstd {
        /// Compression level (1=fastest, 19=best ratio)
        level: i32,
    },
}

/// Encode plain bytes with the given filter.
pub fn encode(data: &[u8], filter: StreamFilter) -> Result<Vec<u8>, DedupError> {
    match filter {
        StreamFilter::None => Ok(data.to_vec()),
        StreamFilter::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
        StreamFilter::Zstd { level } => {
            zstd::encode_all(data, level).map_err(|e| DedupError::StreamEncodeFailed(e.to_string()))
        }
    }
}

/// Decode a stored payload back to its plain bytes.
pub fn decode(data: &[u8], filter: StreamFilter) -> Result<Vec<u8>, DedupError> {
    match filter {
        StreamFilter::None => Ok(data.to_vec()),
        StreamFilter::Lz4 => lz4_flex::decompress_size_prepended(data)
            .map_err(|e| DedupError::StreamDecodeFailed(format!("lz4 payload of {} bytes: {}", data.len(), e))),
        StreamFilter::Zstd { .. } => zstd::decode_all(data)
            .map_err(|e| DedupError::StreamDecodeFailed(format!("zstd payload of {} bytes: {}", data.len(), e))),
    }
}
