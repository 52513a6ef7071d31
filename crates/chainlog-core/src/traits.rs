//! Collaborator trait definitions for the block controller.
//!
//! These three traits define the complete boundary of the core:
//!
//! - `EventSource`     (upstream queue the events are drained from)
//! - `BlockSink`       (where sealed, gzipped blocks are delivered)
//! - `ChainStateStore` (durable home of the chain cursor)
//!
//! The controller wires them together in a fixed order. Implementations
//! for tests and for the file-backed CLI host live in `chainlog-store`.

use chainlog_contracts::{
    block::BlockArtifact,
    error::{ChainlogError, ChainlogResult},
    event::Event,
    state::StateMap,
};

/// A queue-like source of audit events.
///
/// The controller reads `pending_count()` once to evaluate the trigger and
/// then calls `take()` until it returns `None`.
pub trait EventSource: Send + Sync {
    /// Approximate number of events waiting. Used only for the size trigger.
    fn pending_count(&self) -> u64;

    /// Remove and return the next event, or `None` if nothing is waiting.
    ///
    /// Must not block. Events are returned in arrival order.
    fn take(&self) -> Option<Event>;
}

/// The destination of sealed blocks.
///
/// Exactly one artifact is emitted per sealed block. A failed `emit` must
/// leave nothing visible for that artifact.
///
/// The controller only emits the block that follows the stored chain head.
/// An artifact already held under the same filename was therefore left by
/// an invocation that died before persisting, and `emit` replaces it.
pub trait BlockSink: Send + Sync {
    /// Deliver one artifact, replacing any orphan of the same name.
    ///
    /// Errors are reported as `ChainlogError::OutputEmit`.
    fn emit(&self, artifact: &BlockArtifact) -> ChainlogResult<()>;

    /// Withdraw an artifact previously accepted by `emit`.
    ///
    /// Called only when the chain state could not be persisted after the
    /// artifact was emitted, so the block is not left orphaned ahead of the
    /// stored chain head.
    fn retract(&self, filename: &str) -> ChainlogResult<()>;
}

/// A durable, single-map key/value store holding the chain cursor.
///
/// The controller assumes it is the only writer. Deployments that cannot
/// guarantee that should implement `compare_and_set` and enable it in the
/// block configuration.
pub trait ChainStateStore: Send + Sync {
    /// Read the whole map, or `None` if nothing was ever stored.
    ///
    /// Errors are reported as `ChainlogError::StateLoad`.
    fn get(&self) -> ChainlogResult<Option<StateMap>>;

    /// Replace the whole map. Errors are reported as `ChainlogError::StateSave`.
    fn set(&self, state: StateMap) -> ChainlogResult<()>;

    /// Replace the map only if it currently equals `expected`.
    ///
    /// Returns `Ok(false)` when the stored map differs. Stores without
    /// conditional writes keep the default, which refuses.
    fn compare_and_set(&self, expected: Option<&StateMap>, state: StateMap) -> ChainlogResult<bool> {
        let _ = (expected, state);
        Err(ChainlogError::StateSave {
            reason: "store does not support compare-and-set".to_string(),
        })
    }
}
