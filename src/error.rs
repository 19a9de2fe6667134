//! Error types for bundle decoding

use thiserror::Error;

/// Errors raised while decoding bundles, the bundle index or the path table
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The decompressor rejected a block or produced the wrong number of bytes
    #[error("Corrupt block {block}: {reason}")]
    CorruptBlock { block: usize, reason: String },

    /// Redundant header fields disagree in a way that implies truncation
    #[error("Header mismatch: {0}")]
    HeaderMismatch(String),

    /// The container declares more bytes than the input holds
    #[error(
        "Truncated stream at offset {offset} (block {block:?}): needed {needed} bytes, {available} available"
    )]
    TruncatedStream {
        block: Option<usize>,
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The decompressed index ended inside the named section
    #[error("Truncated index while reading {section} at offset {offset}")]
    TruncatedIndex { section: &'static str, offset: usize },

    /// A path table region violates the command stream grammar. `offset` is measured from the
    /// start of the decompressed path table.
    #[error("Malformed path table in region {region} at offset {offset}: {reason}")]
    MalformedPathTable {
        region: usize,
        offset: usize,
        reason: &'static str,
    },

    #[error("Range {offset}+{len} is outside of the {size} byte bundle")]
    RangeOutOfBounds { offset: usize, len: usize, size: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
