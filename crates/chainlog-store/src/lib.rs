//! # chainlog-store
//!
//! Collaborator adapters for the chainlog block controller.
//!
//! | Adapter                | Trait             | Backing               |
//! |------------------------|-------------------|-----------------------|
//! | `InMemoryEventSource`  | `EventSource`     | `VecDeque` in memory  |
//! | `SpoolEventSource`     | `EventSource`     | JSON Lines file       |
//! | `InMemoryBlockSink`    | `BlockSink`       | `Vec` in memory       |
//! | `DirectoryBlockSink`   | `BlockSink`       | one file per block    |
//! | `InMemoryStateStore`   | `ChainStateStore` | map in memory         |
//! | `JsonFileStateStore`   | `ChainStateStore` | JSON object file      |
//!
//! The in-memory adapters are cheap to clone and share their contents, which
//! is how tests feed and inspect a controller that owns boxed adapters.

use std::{
    fs,
    path::{Path, PathBuf},
};

pub mod file;
pub mod memory;
pub mod spool;

pub use file::{DirectoryBlockSink, JsonFileStateStore};
pub use memory::{InMemoryBlockSink, InMemoryEventSource, InMemoryStateStore};
pub use spool::SpoolEventSource;

/// Write `bytes` to `path` via `<path>.tmp` and a rename, so a reader sees
/// either the previous file or the complete new one. An existing file at
/// `path` is replaced.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
