//! What one controller invocation did.

use serde::{Deserialize, Serialize};

use crate::event::EpochMillis;

/// The outcome of a single block controller invocation.
///
/// Callers pattern-match on this to decide what to report:
/// - `Skipped` → neither trigger fired; nothing was read or written
/// - `EmptyUpdate` → a trigger fired but the source was empty; only the
///   execution time advanced
/// - `Sealed` → a block was emitted and the chain advanced by one
///
/// Failures are not outcomes; they are returned as `ChainlogError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvocationOutcome {
    /// The trigger did not fire. Equivalent to yielding the scheduler slot.
    Skipped,

    /// The trigger fired with nothing to drain.
    EmptyUpdate {
        /// The execution time now stored.
        last_execution_time: EpochMillis,
    },

    /// A block was sealed, emitted, and the chain state persisted.
    Sealed {
        block_number: u64,
        /// Lowercase hex SHA-512; the new `last_hash`.
        content_hash: String,
        event_count: usize,
        filename: String,
    },
}
