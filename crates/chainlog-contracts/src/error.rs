//! Runtime error types for the chainlog block pipeline.
//!
//! All fallible operations in chainlog return `ChainlogResult<T>`.
//! Error variants carry enough context to be logged and surfaced as-is.

use thiserror::Error;

/// The unified error type for chainlog.
#[derive(Debug, Error)]
pub enum ChainlogError {
    /// The chain state store could not be read, or its contents are corrupt.
    ///
    /// Fatal for the invocation; no state mutation is attempted.
    #[error("chain state load failed: {reason}")]
    StateLoad { reason: String },

    /// The chain state store could not be written.
    ///
    /// The invocation's in-memory state advance is discarded.
    #[error("chain state save failed: {reason}")]
    StateSave { reason: String },

    /// A compare-and-set against the store observed a different value than
    /// the one loaded at the start of the invocation.
    #[error("chain state conflict: {reason}")]
    StateConflict { reason: String },

    /// The block artifact could not be compressed or delivered to the sink.
    #[error("block output emit failed: {reason}")]
    OutputEmit { reason: String },

    /// The host's event spool could not be read, parsed, or rewritten.
    #[error("event source error: {reason}")]
    EventSource { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A sealed block, or the chain formed by several of them, failed
    /// verification.
    #[error("chain integrity violation at block {block_number}: {reason}")]
    ChainIntegrity { block_number: u64, reason: String },
}

/// Convenience alias used throughout the chainlog crates.
pub type ChainlogResult<T> = Result<T, ChainlogError>;
