//! Hash-chain primitives: sealing, parsing, and chain verification.
//!
//! A block's digest is SHA-512 over exactly the bytes produced by
//! [`crate::serializer::render`], so it commits to the previous block's
//! hash, the creation time, and every event line. The digest does not
//! cover itself; it is appended as the final line:
//!
//! ```text
//! <header and event lines>
//! <128 lowercase hex chars>
//! ```

use sha2::{Digest, Sha512};

use chainlog_contracts::{
    block::Block,
    error::{ChainlogError, ChainlogResult},
    state::ChainState,
};

use crate::serializer::{CREATED_AT_PREFIX, PREVIOUS_HASH_PREFIX};

/// Length of a hex-encoded SHA-512 digest.
pub const DIGEST_HEX_LEN: usize = 128;

/// The output of [`seal`]: the new chain head and the full block text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlock {
    /// Lowercase hex SHA-512 of the rendered content.
    pub digest_hex: String,
    /// Rendered content followed by `digest_hex` and a newline.
    pub bytes: Vec<u8>,
}

/// Lowercase hex SHA-512 of `content`.
pub fn hash_content(content: &[u8]) -> String {
    hex::encode(Sha512::digest(content))
}

/// Digest `content` and append the digest line.
pub fn seal(content: Vec<u8>) -> SealedBlock {
    let digest_hex = hash_content(&content);
    let mut bytes = content;
    bytes.reserve(DIGEST_HEX_LEN + 1);
    bytes.extend_from_slice(digest_hex.as_bytes());
    bytes.push(b'\n');
    SealedBlock { digest_hex, bytes }
}

/// Parse the text of a sealed block back into its parts.
///
/// Only the layout is checked here; digest correctness and linkage are
/// checked by [`verify_block`] and [`verify_chain`].
pub fn parse_block(block_number: u64, bytes: &[u8]) -> ChainlogResult<Block> {
    let malformed = |reason: &str| ChainlogError::ChainIntegrity {
        block_number,
        reason: reason.to_string(),
    };

    let text = std::str::from_utf8(bytes).map_err(|_| malformed("block is not valid UTF-8"))?;
    let body = text
        .strip_suffix('\n')
        .ok_or_else(|| malformed("block does not end with a newline"))?;

    let mut lines: Vec<&str> = body.split('\n').collect();
    if lines.len() < 3 {
        return Err(malformed("block is shorter than header plus digest"));
    }

    let content_hash = lines.pop().unwrap_or_default().to_string();
    let previous_hash = lines[0]
        .strip_prefix(PREVIOUS_HASH_PREFIX)
        .ok_or_else(|| malformed("missing previous-hash header"))?
        .to_string();
    let created_at = lines[1]
        .strip_prefix(CREATED_AT_PREFIX)
        .ok_or_else(|| malformed("missing created-at header"))?
        .to_string();
    let event_lines = lines[2..].iter().map(|l| l.to_string()).collect();

    Ok(Block {
        block_number,
        previous_hash,
        created_at,
        event_lines,
        content_hash,
    })
}

/// Rebuild the exact bytes the digest of `block` was computed over.
pub fn content_bytes(block: &Block) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(PREVIOUS_HASH_PREFIX);
    out.push_str(&block.previous_hash);
    out.push('\n');
    out.push_str(CREATED_AT_PREFIX);
    out.push_str(&block.created_at);
    out.push('\n');
    for line in &block.event_lines {
        out.push_str(line);
        out.push('\n');
    }
    out.into_bytes()
}

/// Check that a single block is non-empty and that its stored digest
/// matches the one recomputed from its content.
pub fn verify_block(block: &Block) -> ChainlogResult<()> {
    if block.event_lines.is_empty() {
        return Err(ChainlogError::ChainIntegrity {
            block_number: block.block_number,
            reason: "block contains no events".to_string(),
        });
    }

    let recomputed = hash_content(&content_bytes(block));
    if recomputed != block.content_hash {
        return Err(ChainlogError::ChainIntegrity {
            block_number: block.block_number,
            reason: format!(
                "content hash mismatch: stored {}, recomputed {}",
                block.content_hash, recomputed
            ),
        });
    }

    Ok(())
}

/// Verify a chain of blocks starting from genesis.
///
/// The chain is valid when, for every block in order:
///
/// 1. **Numbering**: block `i` (zero-based) has `block_number == i + 1`.
/// 2. **Linkage**: `previous_hash` equals the preceding block's
///    `content_hash`, or `"root"` for the first block.
/// 3. **Digest**: [`verify_block`] passes.
///
/// Returns the first violation found. An empty chain is valid.
pub fn verify_chain(blocks: &[Block]) -> ChainlogResult<()> {
    let mut expected_prev = ChainState::GENESIS_HASH.to_string();

    for (idx, block) in blocks.iter().enumerate() {
        let expected_number = idx as u64 + 1;
        if block.block_number != expected_number {
            return Err(ChainlogError::ChainIntegrity {
                block_number: block.block_number,
                reason: format!("expected block number {}", expected_number),
            });
        }

        if block.previous_hash != expected_prev {
            return Err(ChainlogError::ChainIntegrity {
                block_number: block.block_number,
                reason: format!(
                    "previous hash {} does not match preceding block {}",
                    block.previous_hash, expected_prev
                ),
            });
        }

        verify_block(block)?;

        expected_prev = block.content_hash.clone();
    }

    Ok(())
}
