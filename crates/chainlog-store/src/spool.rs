//! A JSON Lines file used as the event queue by the CLI host.
//!
//! Each non-blank line is one [`Event`] in its camelCase JSON form. The
//! spool is read fully into memory; after an invocation the host calls
//! [`SpoolEventSource::persist_remaining`] to rewrite the file with
//! whatever the controller did not take.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::debug;

use chainlog_contracts::{
    error::{ChainlogError, ChainlogResult},
    event::Event,
};
use chainlog_core::traits::EventSource;

use crate::{memory::InMemoryEventSource, write_atomically};

#[derive(Debug)]
pub struct SpoolEventSource {
    path: PathBuf,
    queue: InMemoryEventSource,
}

impl SpoolEventSource {
    /// Load every event in `path`. A missing file is an empty spool.
    pub fn open(path: impl Into<PathBuf>) -> ChainlogResult<Self> {
        let path = path.into();
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(ChainlogError::EventSource {
                    reason: format!("failed to read spool '{}': {}", path.display(), e),
                })
            }
        };

        let mut events = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event: Event = serde_json::from_str(line).map_err(|e| ChainlogError::EventSource {
                reason: format!("{}:{}: {}", path.display(), idx + 1, e),
            })?;
            events.push(event);
        }

        debug!(path = %path.display(), events = events.len(), "spool loaded");
        Ok(Self {
            path,
            queue: InMemoryEventSource::from_events(events),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the spool with the events not yet taken.
    ///
    /// Goes through a temp file and a rename, so an interrupted rewrite
    /// leaves the previous spool intact.
    pub fn persist_remaining(&self) -> ChainlogResult<()> {
        let mut out = String::new();
        for event in self.queue.snapshot() {
            let line = serde_json::to_string(&event).map_err(|e| ChainlogError::EventSource {
                reason: format!("failed to encode event: {}", e),
            })?;
            out.push_str(&line);
            out.push('\n');
        }

        write_atomically(&self.path, out.as_bytes()).map_err(|e| ChainlogError::EventSource {
            reason: format!("failed to rewrite spool '{}': {}", self.path.display(), e),
        })
    }
}

impl EventSource for SpoolEventSource {
    fn pending_count(&self) -> u64 {
        self.queue.pending_count()
    }

    fn take(&self) -> Option<Event> {
        self.queue.take()
    }
}
