//! File-backed chain state store and block sink.
//!
//! Both write through a sibling temp file and `rename`, so a reader sees
//! either the previous file or the complete new one.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, info, warn};

use chainlog_contracts::{
    block::BlockArtifact,
    error::{ChainlogError, ChainlogResult},
    state::StateMap,
};
use chainlog_core::traits::{BlockSink, ChainStateStore};

use crate::write_atomically;

// ── State store ───────────────────────────────────────────────────────────────

/// Chain state kept as a JSON object of strings in a single file.
///
/// ```json
/// {
///   "blockNumber": "3",
///   "lastExecution": "1700000000000",
///   "lastHash": "9b71d224bd62f378..."
/// }
/// ```
///
/// A missing file reads as "never stored". Compare-and-set is atomic with
/// respect to other users of the same `JsonFileStateStore` value only; it
/// does not lock the file against other processes.
#[derive(Debug)]
pub struct JsonFileStateStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> ChainlogResult<Option<StateMap>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ChainlogError::StateLoad {
                    reason: format!("failed to read state file '{}': {}", self.path.display(), e),
                })
            }
        };

        let map = serde_json::from_str(&contents).map_err(|e| ChainlogError::StateLoad {
            reason: format!("failed to parse state file '{}': {}", self.path.display(), e),
        })?;
        Ok(Some(map))
    }

    fn write(&self, state: &StateMap) -> ChainlogResult<()> {
        let json = serde_json::to_vec_pretty(state).map_err(|e| ChainlogError::StateSave {
            reason: format!("failed to encode chain state: {}", e),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ChainlogError::StateSave {
                reason: format!("failed to create '{}': {}", parent.display(), e),
            })?;
        }

        write_atomically(&self.path, &json).map_err(|e| ChainlogError::StateSave {
            reason: format!("failed to write state file '{}': {}", self.path.display(), e),
        })?;

        debug!(path = %self.path.display(), "chain state written");
        Ok(())
    }
}

impl ChainStateStore for JsonFileStateStore {
    fn get(&self) -> ChainlogResult<Option<StateMap>> {
        self.read()
    }

    fn set(&self, state: StateMap) -> ChainlogResult<()> {
        self.write(&state)
    }

    fn compare_and_set(&self, expected: Option<&StateMap>, state: StateMap) -> ChainlogResult<bool> {
        let _held = self.guard.lock().map_err(|e| ChainlogError::StateSave {
            reason: format!("state file lock poisoned: {}", e),
        })?;

        let current = self.read().map_err(|e| ChainlogError::StateSave {
            reason: format!("could not re-read state before compare-and-set: {}", e),
        })?;
        if current.as_ref() != expected {
            return Ok(false);
        }

        self.write(&state)?;
        Ok(true)
    }
}

// ── Block sink ────────────────────────────────────────────────────────────────

/// Writes each artifact as `<dir>/<filename>`.
///
/// An existing `block_N` is an orphan from an invocation that emitted but
/// never persisted its chain state, and is replaced by the rename. The
/// sink assumes it is the only writer to `dir`; with several writers the
/// replacement could clobber a block another writer has committed.
#[derive(Debug, Clone)]
pub struct DirectoryBlockSink {
    dir: PathBuf,
}

impl DirectoryBlockSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Block artifacts present in the directory, sorted by block number.
    pub fn list(&self) -> ChainlogResult<Vec<(u64, PathBuf)>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| ChainlogError::ChainIntegrity {
            block_number: 0,
            reason: format!("failed to list '{}': {}", self.dir.display(), e),
        })?;

        let mut blocks: Vec<(u64, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                BlockArtifact::block_number_of(name.to_str()?).map(|n| (n, entry.path()))
            })
            .collect();
        blocks.sort_by_key(|(n, _)| *n);
        Ok(blocks)
    }
}

impl BlockSink for DirectoryBlockSink {
    fn emit(&self, artifact: &BlockArtifact) -> ChainlogResult<()> {
        let emit_err = |what: &str, e: std::io::Error| ChainlogError::OutputEmit {
            reason: format!("{} '{}': {}", what, artifact.filename, e),
        };

        fs::create_dir_all(&self.dir).map_err(|e| emit_err("failed to create output directory for", e))?;

        let target = self.dir.join(&artifact.filename);
        if target.exists() {
            warn!(path = %target.display(), "replacing block left by an uncommitted invocation");
        }

        write_atomically(&target, &artifact.bytes).map_err(|e| emit_err("failed to write", e))?;

        info!(
            path = %target.display(),
            content_type = %artifact.content_type,
            bytes = artifact.bytes.len(),
            "block written"
        );
        Ok(())
    }

    fn retract(&self, filename: &str) -> ChainlogResult<()> {
        match fs::remove_file(self.dir.join(filename)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ChainlogError::OutputEmit {
                reason: format!("failed to remove '{}': {}", filename, e),
            }),
        }
    }
}
