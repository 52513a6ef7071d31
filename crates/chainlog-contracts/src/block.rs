//! Sealed blocks and the artifacts that carry them to the sink.

use serde::{Deserialize, Serialize};

/// A sealed block, as read back from its rendered text.
///
/// Produced by `chainlog_block::chain::parse_block`. Fields hold the text
/// exactly as rendered; nothing is re-normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain, starting at 1.
    pub block_number: u64,

    /// Content hash of the preceding block, or `"root"` for block 1.
    pub previous_hash: String,

    /// Creation time as rendered in the header (`yyyy-MM-dd HH:mm:ss`).
    pub created_at: String,

    /// One `|`-joined line per event, in drain order.
    pub event_lines: Vec<String>,

    /// Lowercase hex SHA-512 over the header and event lines.
    pub content_hash: String,
}

/// One emitted output unit per sealed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockArtifact {
    /// `"block_" + block_number`.
    pub filename: String,

    /// Always [`BlockArtifact::CONTENT_TYPE`].
    pub content_type: String,

    /// Gzip-compressed block text, including the trailing digest line.
    pub bytes: Vec<u8>,
}

impl BlockArtifact {
    pub const CONTENT_TYPE: &'static str = "application/gzip";
    pub const FILENAME_PREFIX: &'static str = "block_";

    pub fn new(block_number: u64, bytes: Vec<u8>) -> Self {
        Self {
            filename: Self::filename_for(block_number),
            content_type: Self::CONTENT_TYPE.to_string(),
            bytes,
        }
    }

    pub fn filename_for(block_number: u64) -> String {
        format!("{}{}", Self::FILENAME_PREFIX, block_number)
    }

    /// Inverse of [`BlockArtifact::filename_for`]. Returns `None` for names
    /// that are not block artifacts.
    pub fn block_number_of(filename: &str) -> Option<u64> {
        filename
            .strip_prefix(Self::FILENAME_PREFIX)
            .and_then(|n| n.parse().ok())
    }
}
