//! The block controller: one size-or-time gated sealing pass per call.
//!
//! Each invocation moves through:
//!
//!   Evaluating → (Skipped | Draining) → (EmptyUpdate | Sealing) → Persisted
//!
//! The chain state is staged in memory for the whole invocation. The stored
//! cursor only changes in the final persist step, and the artifact is only
//! left in the sink if that persist succeeds. A failed invocation therefore
//! leaves the store exactly as it was loaded.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use chainlog_block::{archive, chain, serializer, trigger};
use chainlog_contracts::{
    block::BlockArtifact,
    config::BlockConfig,
    error::{ChainlogError, ChainlogResult},
    event::EpochMillis,
    outcome::InvocationOutcome,
    state::{ChainState, StateMap},
};

use crate::{
    collector,
    traits::{BlockSink, ChainStateStore, EventSource},
};

/// Drives block creation against a state store and an output sink.
///
/// The controller holds no configuration and no chain state between calls;
/// both are supplied or reloaded on every invocation, so a restarted
/// process resumes from whatever the store holds.
pub struct BlockController {
    store: Box<dyn ChainStateStore>,
    sink: Box<dyn BlockSink>,
}

impl BlockController {
    pub fn new(store: Box<dyn ChainStateStore>, sink: Box<dyn BlockSink>) -> Self {
        Self { store, sink }
    }

    /// Load the stored chain cursor, falling back to genesis defaults when
    /// the store is empty.
    ///
    /// Returns the raw map alongside the decoded state so a later save can
    /// preserve foreign keys and, with compare-and-set, detect other writers.
    pub fn load_state(&self) -> ChainlogResult<(Option<StateMap>, ChainState)> {
        let raw = self.store.get().inspect_err(|e| {
            error!(error = %e, "could not read chain state");
        })?;
        let state = ChainState::from_map(raw.as_ref()).inspect_err(|e| {
            error!(error = %e, "stored chain state is corrupt");
        })?;
        Ok((raw, state))
    }

    /// Run one invocation using the wall clock.
    pub fn on_trigger_now(
        &self,
        source: &dyn EventSource,
        config: &BlockConfig,
    ) -> ChainlogResult<InvocationOutcome> {
        self.on_trigger(source, config, Utc::now().timestamp_millis())
    }

    /// Run one invocation at time `now`.
    ///
    /// # Pipeline
    ///
    /// 1. Load the chain state (`StateLoad` on failure, nothing else touched)
    /// 2. Evaluate the trigger; if it does not fire return `Skipped` without
    ///    taking any event
    /// 3. Refuse with `StateLoad` if the stored block number cannot be
    ///    incremented, then drain the source
    /// 4. Empty batch: store `last_execution_time = now` only, return
    ///    `EmptyUpdate`
    /// 5. Render, seal, and gzip the block against the loaded `last_hash`
    /// 6. Emit the artifact (`OutputEmit` on failure)
    /// 7. Persist the advanced state; on failure retract the artifact and
    ///    return the save error
    ///
    /// # Errors
    ///
    /// Any error leaves the stored chain state unchanged. Events drained
    /// before the error are not returned to the source.
    pub fn on_trigger(
        &self,
        source: &dyn EventSource,
        config: &BlockConfig,
        now: EpochMillis,
    ) -> ChainlogResult<InvocationOutcome> {
        let (raw, state) = self.load_state()?;

        // ── Evaluating ───────────────────────────────────────────────────────
        let pending = source.pending_count();
        if !trigger::should_seal_with(config, pending, state.last_execution_time, now) {
            debug!(
                pending,
                block_size = config.block_size(),
                last_execution = state.last_execution_time,
                now,
                "no trigger fired, skipping cycle"
            );
            return Ok(InvocationOutcome::Skipped);
        }

        let Some(next_block_number) = state.block_number.checked_add(1) else {
            error!(
                block_number = state.block_number,
                "stored block number cannot be advanced"
            );
            return Err(ChainlogError::StateLoad {
                reason: format!("blockNumber overflow: {} is the largest storable value", state.block_number),
            });
        };

        // ── Draining ─────────────────────────────────────────────────────────
        let events = collector::drain(source);

        if events.is_empty() {
            let next = ChainState {
                last_execution_time: now,
                ..state
            };
            self.persist(raw.as_ref(), &next, config)?;

            info!(
                block_number = next.block_number,
                last_execution = now,
                "trigger fired with no events, execution time updated"
            );
            return Ok(InvocationOutcome::EmptyUpdate {
                last_execution_time: now,
            });
        }

        // ── Sealing ──────────────────────────────────────────────────────────
        let event_count = events.len();
        let content = serializer::render(&state.last_hash, now, &events, config.timezone());
        drop(events);
        let sealed = chain::seal(content);

        let next = ChainState {
            last_execution_time: now,
            block_number: next_block_number,
            last_hash: sealed.digest_hex,
        };

        let gz = archive::compress(&sealed.bytes).inspect_err(|e| {
            error!(
                block_number = next.block_number,
                event_count,
                error = %e,
                "could not compress block, chain state not advanced"
            );
        })?;
        let artifact = BlockArtifact::new(next.block_number, gz);

        self.sink.emit(&artifact).inspect_err(|e| {
            error!(
                block_number = next.block_number,
                filename = %artifact.filename,
                event_count,
                error = %e,
                "could not emit block, chain state not advanced"
            );
        })?;

        // ── Persisted ────────────────────────────────────────────────────────
        if let Err(e) = self.persist(raw.as_ref(), &next, config) {
            if let Err(retract_err) = self.sink.retract(&artifact.filename) {
                warn!(
                    filename = %artifact.filename,
                    error = %retract_err,
                    "could not retract block after failed state save"
                );
            }
            return Err(e);
        }

        info!(
            block_number = next.block_number,
            content_hash = %next.last_hash,
            previous_hash = %state.last_hash,
            event_count,
            filename = %artifact.filename,
            "block sealed"
        );

        Ok(InvocationOutcome::Sealed {
            block_number: next.block_number,
            content_hash: next.last_hash,
            event_count,
            filename: artifact.filename,
        })
    }

    /// Write `next` over the map loaded at the start of the invocation.
    fn persist(
        &self,
        loaded: Option<&StateMap>,
        next: &ChainState,
        config: &BlockConfig,
    ) -> ChainlogResult<()> {
        let map = next.to_map(loaded);

        let result = if config.compare_and_swap() {
            match self.store.compare_and_set(loaded, map) {
                Ok(true) => Ok(()),
                Ok(false) => Err(ChainlogError::StateConflict {
                    reason: format!(
                        "stored chain state changed since it was loaded; block {} not committed",
                        next.block_number
                    ),
                }),
                Err(e) => Err(e),
            }
        } else {
            self.store.set(map)
        };

        result.inspect_err(|e| {
            error!(
                block_number = next.block_number,
                last_hash = %next.last_hash,
                error = %e,
                "could not persist chain state"
            );
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use chainlog_contracts::{
        block::BlockArtifact,
        config::BlockConfig,
        error::{ChainlogError, ChainlogResult},
        event::Event,
        outcome::InvocationOutcome,
        state::{ChainState, StateMap},
    };
    use sha2::{Digest, Sha512};

    use crate::traits::{BlockSink, ChainStateStore, EventSource};

    use super::BlockController;

    const FIFTEEN_MIN: i64 = 15 * 60_000;
    const NOW: i64 = 1_700_000_000_000;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    struct MockSource {
        queue: Mutex<VecDeque<Event>>,
        /// Overrides the reported pending count when set.
        reported: Option<u64>,
    }

    impl MockSource {
        fn with_tokens(tokens: &[&str]) -> Self {
            let queue = tokens
                .iter()
                .enumerate()
                .map(|(i, t)| Event {
                    arrival_timestamp: NOW - 1000 + i as i64,
                    source_id: Some("couchdb".to_string()),
                    document_id: Some(format!("doc-{}", i)),
                    document_revision: Some("1-abc".to_string()),
                    sequence_token: Some(t.to_string()),
                })
                .collect();
            Self {
                queue: Mutex::new(queue),
                reported: None,
            }
        }

        fn remaining(&self) -> usize {
            self.queue.lock().unwrap().len()
        }
    }

    impl EventSource for MockSource {
        fn pending_count(&self) -> u64 {
            self.reported
                .unwrap_or_else(|| self.queue.lock().unwrap().len() as u64)
        }

        fn take(&self) -> Option<Event> {
            self.queue.lock().unwrap().pop_front()
        }
    }

    /// A store whose map can be inspected and whose writes can be failed.
    #[derive(Default)]
    struct MockStore {
        map: Arc<Mutex<Option<StateMap>>>,
        fail_get: bool,
        fail_set: bool,
    }

    impl ChainStateStore for MockStore {
        fn get(&self) -> ChainlogResult<Option<StateMap>> {
            if self.fail_get {
                return Err(ChainlogError::StateLoad {
                    reason: "store offline".to_string(),
                });
            }
            Ok(self.map.lock().unwrap().clone())
        }

        fn set(&self, state: StateMap) -> ChainlogResult<()> {
            if self.fail_set {
                return Err(ChainlogError::StateSave {
                    reason: "store read-only".to_string(),
                });
            }
            *self.map.lock().unwrap() = Some(state);
            Ok(())
        }

        fn compare_and_set(
            &self,
            expected: Option<&StateMap>,
            state: StateMap,
        ) -> ChainlogResult<bool> {
            let mut current = self.map.lock().unwrap();
            if current.as_ref() != expected {
                return Ok(false);
            }
            *current = Some(state);
            Ok(true)
        }
    }

    /// A sink recording every emitted artifact.
    #[derive(Default)]
    struct MockSink {
        emitted: Arc<Mutex<Vec<BlockArtifact>>>,
        retracted: Arc<Mutex<Vec<String>>>,
        fail_emit: bool,
        fail_retract: bool,
    }

    impl BlockSink for MockSink {
        fn emit(&self, artifact: &BlockArtifact) -> ChainlogResult<()> {
            if self.fail_emit {
                return Err(ChainlogError::OutputEmit {
                    reason: "sink closed".to_string(),
                });
            }
            self.emitted.lock().unwrap().push(artifact.clone());
            Ok(())
        }

        fn retract(&self, filename: &str) -> ChainlogResult<()> {
            if self.fail_retract {
                return Err(ChainlogError::OutputEmit {
                    reason: "sink closed".to_string(),
                });
            }
            self.retracted.lock().unwrap().push(filename.to_string());
            self.emitted.lock().unwrap().retain(|a| a.filename != filename);
            Ok(())
        }
    }

    fn config(interval: u64, block_size: u64) -> BlockConfig {
        BlockConfig::new(interval, block_size, chrono_tz::Tz::UTC).unwrap()
    }

    fn stored(map: &Arc<Mutex<Option<StateMap>>>) -> ChainState {
        ChainState::from_map(map.lock().unwrap().as_ref()).unwrap()
    }

    fn block_text(artifact: &BlockArtifact) -> String {
        let bytes = chainlog_block::decompress(1, &artifact.bytes).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    // ── Test cases ───────────────────────────────────────────────────────────

    /// Three events over a threshold of two seal a single genesis block.
    #[test]
    fn test_seals_first_block_from_genesis() {
        let store = MockStore::default();
        let map = store.map.clone();
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(store), Box::new(sink));

        let source = MockSource::with_tokens(&["1-a", "2-b", "3-c"]);
        let outcome = controller.on_trigger(&source, &config(15, 2), NOW).unwrap();

        let digest = match outcome {
            InvocationOutcome::Sealed {
                block_number,
                content_hash,
                event_count,
                filename,
            } => {
                assert_eq!(block_number, 1);
                assert_eq!(event_count, 3);
                assert_eq!(filename, "block_1");
                content_hash
            }
            other => panic!("expected Sealed, got {:?}", other),
        };

        assert_eq!(source.remaining(), 0, "every event must be drained");

        let artifacts = emitted.lock().unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].filename, "block_1");
        assert_eq!(artifacts[0].content_type, "application/gzip");

        let text = block_text(&artifacts[0]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Hash of previous block : root");
        assert_eq!(lines[1], "Block created at 2023-11-14 22:13:20");
        assert!(lines[2].ends_with("|1"));
        assert!(lines[3].ends_with("|2"));
        assert!(lines[4].ends_with("|3"));
        assert_eq!(lines[5], digest);
        assert_eq!(digest.len(), 128);

        let state = stored(&map);
        assert_eq!(state.block_number, 1);
        assert_eq!(state.last_hash, digest);
        assert_eq!(state.last_execution_time, NOW);
    }

    /// The stored hash is SHA-512 over everything but the digest line.
    #[test]
    fn test_digest_covers_header_and_events_only() {
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(MockStore::default()), Box::new(sink));

        controller
            .on_trigger(&MockSource::with_tokens(&["1-a", "2-b"]), &config(15, 1), NOW)
            .unwrap();

        let text = block_text(&emitted.lock().unwrap()[0]);
        let body = text.strip_suffix('\n').unwrap();
        let (content, digest) = body.rsplit_once('\n').unwrap();
        let recomputed = hex::encode(Sha512::digest(format!("{}\n", content).as_bytes()));
        assert_eq!(recomputed, digest);
    }

    /// Consecutive invocations link each block to the previous digest and
    /// number them without gaps.
    #[test]
    fn test_blocks_chain_across_invocations() {
        let store = MockStore::default();
        let map = store.map.clone();
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(store), Box::new(sink));
        let cfg = config(15, 1);

        let mut hashes = vec!["root".to_string()];
        for round in 0..3 {
            let source = MockSource::with_tokens(&["1-a", "2-b"]);
            let outcome = controller.on_trigger(&source, &cfg, NOW + round).unwrap();
            match outcome {
                InvocationOutcome::Sealed {
                    block_number,
                    content_hash,
                    ..
                } => {
                    assert_eq!(block_number, round as u64 + 1);
                    hashes.push(content_hash);
                }
                other => panic!("expected Sealed, got {:?}", other),
            }
        }

        let artifacts = emitted.lock().unwrap();
        let blocks: Vec<_> = artifacts
            .iter()
            .enumerate()
            .map(|(i, a)| chainlog_block::parse_block(i as u64 + 1, block_text(a).as_bytes()).unwrap())
            .collect();
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.previous_hash, hashes[i]);
            assert_eq!(block.content_hash, hashes[i + 1]);
        }
        assert!(chainlog_block::verify_chain(&blocks).is_ok());

        let state = stored(&map);
        assert_eq!(state.block_number, 3);
        assert_eq!(&state.last_hash, hashes.last().unwrap());
    }

    /// Neither trigger fires: nothing is drained and nothing is written.
    #[test]
    fn test_skip_leaves_everything_untouched() {
        let store = MockStore::default();
        let map = store.map.clone();
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(store), Box::new(sink));

        let source = MockSource::with_tokens(&["1-a", "2-b"]);
        // pending == threshold and elapsed == interval: both strict, neither fires.
        let outcome = controller.on_trigger(&source, &config(15, 2), FIFTEEN_MIN).unwrap();

        assert_eq!(outcome, InvocationOutcome::Skipped);
        assert_eq!(source.remaining(), 2);
        assert!(emitted.lock().unwrap().is_empty());
        assert!(map.lock().unwrap().is_none(), "skip must not persist state");
    }

    /// Time trigger with an empty queue only advances the execution time.
    #[test]
    fn test_empty_drain_updates_execution_time_only() {
        let store = MockStore::default();
        let map = store.map.clone();
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(store), Box::new(sink));

        let now = FIFTEEN_MIN + 1;
        let outcome = controller
            .on_trigger(&MockSource::with_tokens(&[]), &config(15, 1000), now)
            .unwrap();

        assert_eq!(
            outcome,
            InvocationOutcome::EmptyUpdate {
                last_execution_time: now
            }
        );
        assert!(emitted.lock().unwrap().is_empty());

        let state = stored(&map);
        assert_eq!(state.last_execution_time, now);
        assert_eq!(state.block_number, 0);
        assert_eq!(state.last_hash, "root");
    }

    /// Source reports pending events but hands out none.
    #[test]
    fn test_reported_but_drained_elsewhere_is_empty_update() {
        let controller =
            BlockController::new(Box::new(MockStore::default()), Box::new(MockSink::default()));
        let source = MockSource {
            queue: Mutex::new(VecDeque::new()),
            reported: Some(50),
        };

        let outcome = controller.on_trigger(&source, &config(15, 10), 0).unwrap();
        assert_eq!(
            outcome,
            InvocationOutcome::EmptyUpdate {
                last_execution_time: 0
            }
        );
    }

    /// An emit failure must leave the stored state exactly as loaded.
    #[test]
    fn test_emit_failure_does_not_advance_state() {
        let store = MockStore::default();
        let before = ChainState {
            last_execution_time: 42,
            block_number: 7,
            last_hash: "abc123".to_string(),
        };
        *store.map.lock().unwrap() = Some(before.to_map(None));
        let map = store.map.clone();

        let sink = MockSink {
            fail_emit: true,
            ..MockSink::default()
        };
        let controller = BlockController::new(Box::new(store), Box::new(sink));

        let result = controller.on_trigger(&MockSource::with_tokens(&["1-a", "2-b"]), &config(15, 1), NOW);

        assert!(matches!(result, Err(ChainlogError::OutputEmit { .. })));
        assert_eq!(stored(&map), before);
    }

    /// A save failure after emit retracts the artifact and reports the error.
    #[test]
    fn test_save_failure_retracts_emitted_block() {
        let store = MockStore {
            fail_set: true,
            ..MockStore::default()
        };
        let map = store.map.clone();
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let retracted = sink.retracted.clone();
        let controller = BlockController::new(Box::new(store), Box::new(sink));

        let result = controller.on_trigger(&MockSource::with_tokens(&["1-a", "2-b"]), &config(15, 1), NOW);

        assert!(matches!(result, Err(ChainlogError::StateSave { .. })));
        assert!(emitted.lock().unwrap().is_empty(), "no block may remain emitted");
        assert_eq!(*retracted.lock().unwrap(), vec!["block_1".to_string()]);
        assert!(map.lock().unwrap().is_none());
    }

    /// A retract that also fails is logged; the caller still sees the save
    /// error and the stored state is untouched.
    #[test]
    fn test_save_error_wins_over_retract_failure() {
        let store = MockStore {
            fail_set: true,
            ..MockStore::default()
        };
        let map = store.map.clone();
        let sink = MockSink {
            fail_retract: true,
            ..MockSink::default()
        };
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(store), Box::new(sink));

        let result = controller.on_trigger(&MockSource::with_tokens(&["1-a", "2-b"]), &config(15, 1), NOW);

        match result {
            Err(ChainlogError::StateSave { reason }) => assert_eq!(reason, "store read-only"),
            other => panic!("expected StateSave, got {:?}", other),
        }
        assert_eq!(emitted.lock().unwrap().len(), 1, "the failed retract leaves the block in place");
        assert!(map.lock().unwrap().is_none());
    }

    /// A block number that cannot be incremented is a load error, reported
    /// before any event is drained.
    #[test]
    fn test_block_number_overflow_is_a_load_error() {
        let store = MockStore::default();
        let exhausted = ChainState {
            last_execution_time: 0,
            block_number: u64::MAX,
            last_hash: "e".repeat(128),
        };
        *store.map.lock().unwrap() = Some(exhausted.to_map(None));
        let map = store.map.clone();
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(store), Box::new(sink));

        let source = MockSource::with_tokens(&["1-a", "2-b"]);
        let result = controller.on_trigger(&source, &config(15, 1), NOW);

        match result {
            Err(ChainlogError::StateLoad { reason }) => assert!(reason.contains("overflow"), "got: {reason}"),
            other => panic!("expected StateLoad, got {:?}", other),
        }
        assert_eq!(source.remaining(), 2);
        assert!(emitted.lock().unwrap().is_empty());
        assert_eq!(stored(&map), exhausted);
    }

    /// An unreadable store aborts before the source is touched.
    #[test]
    fn test_load_failure_is_fatal_and_touches_nothing() {
        let store = MockStore {
            fail_get: true,
            ..MockStore::default()
        };
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(store), Box::new(sink));

        let source = MockSource::with_tokens(&["1-a", "2-b", "3-c"]);
        let result = controller.on_trigger(&source, &config(15, 1), NOW);

        assert!(matches!(result, Err(ChainlogError::StateLoad { .. })));
        assert_eq!(source.remaining(), 3);
        assert!(emitted.lock().unwrap().is_empty());
    }

    /// Corrupt stored values are a load error, not a silent reset to genesis.
    #[test]
    fn test_corrupt_state_is_a_load_error() {
        let store = MockStore::default();
        let mut corrupt = StateMap::new();
        corrupt.insert("blockNumber".to_string(), "not-a-number".to_string());
        *store.map.lock().unwrap() = Some(corrupt);
        let controller = BlockController::new(Box::new(store), Box::new(MockSink::default()));

        let result = controller.on_trigger(&MockSource::with_tokens(&["1-a"]), &config(15, 1), NOW);
        assert!(matches!(result, Err(ChainlogError::StateLoad { .. })));
    }

    /// A restart resumes from the stored cursor.
    #[test]
    fn test_resumes_from_stored_state() {
        let store = MockStore::default();
        let resumed = ChainState {
            last_execution_time: NOW - 10,
            block_number: 41,
            last_hash: "f".repeat(128),
        };
        *store.map.lock().unwrap() = Some(resumed.to_map(None));
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(store), Box::new(sink));

        let outcome = controller
            .on_trigger(&MockSource::with_tokens(&["9-z", "10-y"]), &config(15, 1), NOW)
            .unwrap();

        assert!(matches!(outcome, InvocationOutcome::Sealed { block_number: 42, .. }));
        let artifacts = emitted.lock().unwrap();
        assert_eq!(artifacts[0].filename, "block_42");
        assert!(block_text(&artifacts[0]).starts_with(&format!("Hash of previous block : {}\n", "f".repeat(128))));
    }

    /// Unknown keys in the stored map survive a save.
    #[test]
    fn test_foreign_state_keys_are_preserved() {
        let store = MockStore::default();
        let mut initial = StateMap::new();
        initial.insert("owner".to_string(), "node-a".to_string());
        *store.map.lock().unwrap() = Some(initial);
        let map = store.map.clone();
        let controller = BlockController::new(Box::new(store), Box::new(MockSink::default()));

        controller
            .on_trigger(&MockSource::with_tokens(&["1-a", "2-b"]), &config(15, 1), NOW)
            .unwrap();

        let saved = map.lock().unwrap().clone().unwrap();
        assert_eq!(saved.get("owner").map(String::as_str), Some("node-a"));
        assert_eq!(saved.get("blockNumber").map(String::as_str), Some("1"));
    }

    /// With compare-and-set enabled, a concurrent writer causes a conflict
    /// and the block is withdrawn.
    #[test]
    fn test_compare_and_swap_detects_other_writer() {
        struct RacingStore {
            inner: MockStore,
        }

        impl ChainStateStore for RacingStore {
            fn get(&self) -> ChainlogResult<Option<StateMap>> {
                let loaded = self.inner.get()?;
                // Another writer advances the chain right after our read.
                let other = ChainState {
                    last_execution_time: 1,
                    block_number: 1,
                    last_hash: "other-writer".to_string(),
                };
                *self.inner.map.lock().unwrap() = Some(other.to_map(None));
                Ok(loaded)
            }

            fn set(&self, state: StateMap) -> ChainlogResult<()> {
                self.inner.set(state)
            }

            fn compare_and_set(
                &self,
                expected: Option<&StateMap>,
                state: StateMap,
            ) -> ChainlogResult<bool> {
                self.inner.compare_and_set(expected, state)
            }
        }

        let inner = MockStore::default();
        let map = inner.map.clone();
        let sink = MockSink::default();
        let emitted = sink.emitted.clone();
        let controller = BlockController::new(Box::new(RacingStore { inner }), Box::new(sink));

        let cfg = config(15, 1).with_compare_and_swap(true);
        let result = controller.on_trigger(&MockSource::with_tokens(&["1-a", "2-b"]), &cfg, NOW);

        assert!(matches!(result, Err(ChainlogError::StateConflict { .. })));
        assert!(emitted.lock().unwrap().is_empty());
        assert_eq!(stored(&map).last_hash, "other-writer");
    }

    /// Stores that do not implement compare-and-set refuse when it is enabled.
    #[test]
    fn test_compare_and_swap_unsupported_store_fails_save() {
        struct BlindStore;

        impl ChainStateStore for BlindStore {
            fn get(&self) -> ChainlogResult<Option<StateMap>> {
                Ok(None)
            }

            fn set(&self, _state: StateMap) -> ChainlogResult<()> {
                Ok(())
            }
        }

        let controller = BlockController::new(Box::new(BlindStore), Box::new(MockSink::default()));
        let cfg = config(15, 1).with_compare_and_swap(true);
        let result = controller.on_trigger(&MockSource::with_tokens(&["1-a", "2-b"]), &cfg, NOW);

        assert!(matches!(result, Err(ChainlogError::StateSave { .. })));
    }
}
