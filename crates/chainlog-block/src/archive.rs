//! Gzip container for emitted blocks.
//!
//! Compression writes into an owned buffer and the encoder is finished
//! before the buffer is returned, so a caller either gets a complete gzip
//! stream or an error, never a partial one.

use std::io::{Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use chainlog_contracts::error::{ChainlogError, ChainlogResult};

/// Gzip `bytes` into a fresh buffer.
pub fn compress(bytes: &[u8]) -> ChainlogResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
    encoder
        .write_all(bytes)
        .and_then(|()| encoder.finish())
        .map_err(|e| ChainlogError::OutputEmit {
            reason: format!("gzip compression failed: {}", e),
        })
}

/// Inflate a gzip stream produced by [`compress`].
pub fn decompress(block_number: u64, bytes: &[u8]) -> ChainlogResult<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| ChainlogError::ChainIntegrity {
            block_number,
            reason: format!("gzip decompression failed: {}", e),
        })?;
    Ok(out)
}
