//! In-memory implementations of the collaborator traits.
//!
//! All three keep their data behind `Arc<Mutex<_>>`. Clones share the same
//! data, so a test or host can hand one clone to the controller and keep
//! another to feed events or inspect what was written.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::debug;

use chainlog_contracts::{
    block::BlockArtifact,
    error::{ChainlogError, ChainlogResult},
    event::Event,
    state::StateMap,
};
use chainlog_core::traits::{BlockSink, ChainStateStore, EventSource};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, String> {
    mutex
        .lock()
        .map_err(|e| format!("{} lock poisoned: {}", what, e))
}

// ── Event source ──────────────────────────────────────────────────────────────

/// A FIFO queue of events.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSource {
    queue: Arc<Mutex<VecDeque<Event>>>,
}

impl InMemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(events.into_iter().collect())),
        }
    }

    /// Append an event at the back of the queue.
    pub fn push(&self, event: Event) -> ChainlogResult<()> {
        let mut queue = lock(&self.queue, "event source")
            .map_err(|reason| ChainlogError::EventSource { reason })?;
        queue.push_back(event);
        Ok(())
    }

    /// Events still waiting, front first, without removing them.
    pub fn snapshot(&self) -> Vec<Event> {
        self.queue
            .lock()
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl EventSource for InMemoryEventSource {
    fn pending_count(&self) -> u64 {
        self.queue.lock().map(|q| q.len() as u64).unwrap_or(0)
    }

    fn take(&self) -> Option<Event> {
        self.queue.lock().ok().and_then(|mut q| q.pop_front())
    }
}

// ── Block sink ────────────────────────────────────────────────────────────────

/// Collects emitted artifacts in emission order. Emitting a filename that
/// is already held replaces the earlier artifact.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlockSink {
    artifacts: Arc<Mutex<Vec<BlockArtifact>>>,
}

impl InMemoryBlockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All artifacts currently held, oldest first.
    pub fn artifacts(&self) -> Vec<BlockArtifact> {
        self.artifacts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

impl BlockSink for InMemoryBlockSink {
    fn emit(&self, artifact: &BlockArtifact) -> ChainlogResult<()> {
        let mut artifacts = lock(&self.artifacts, "block sink")
            .map_err(|reason| ChainlogError::OutputEmit { reason })?;
        artifacts.retain(|a| a.filename != artifact.filename);
        artifacts.push(artifact.clone());
        debug!(filename = %artifact.filename, bytes = artifact.bytes.len(), "block held in memory");
        Ok(())
    }

    fn retract(&self, filename: &str) -> ChainlogResult<()> {
        let mut artifacts = lock(&self.artifacts, "block sink")
            .map_err(|reason| ChainlogError::OutputEmit { reason })?;
        artifacts.retain(|a| a.filename != filename);
        Ok(())
    }
}

// ── State store ───────────────────────────────────────────────────────────────

/// A single string map held in memory, with atomic compare-and-set.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    map: Arc<Mutex<Option<StateMap>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `map`.
    pub fn with_map(map: StateMap) -> Self {
        Self {
            map: Arc::new(Mutex::new(Some(map))),
        }
    }
}

impl ChainStateStore for InMemoryStateStore {
    fn get(&self) -> ChainlogResult<Option<StateMap>> {
        let map = lock(&self.map, "state store").map_err(|reason| ChainlogError::StateLoad { reason })?;
        Ok(map.clone())
    }

    fn set(&self, state: StateMap) -> ChainlogResult<()> {
        let mut map = lock(&self.map, "state store").map_err(|reason| ChainlogError::StateSave { reason })?;
        *map = Some(state);
        Ok(())
    }

    fn compare_and_set(&self, expected: Option<&StateMap>, state: StateMap) -> ChainlogResult<bool> {
        let mut map = lock(&self.map, "state store").map_err(|reason| ChainlogError::StateSave { reason })?;
        if map.as_ref() != expected {
            return Ok(false);
        }
        *map = Some(state);
        Ok(true)
    }
}
