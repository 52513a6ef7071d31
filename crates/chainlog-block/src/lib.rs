//! # chainlog-block
//!
//! Pure building blocks of the chainlog audit ledger: the size-or-time
//! trigger, deterministic block rendering, SHA-512 hash chaining, and the
//! gzip container blocks are emitted in.
//!
//! ## Overview
//!
//! Each sealed block starts with the content hash of the block before it
//! (`"root"` for the first one) and ends with the SHA-512 of everything
//! above its last line. Changing any byte of any block breaks its own
//! digest and every later `previous_hash`, which `verify_chain` detects.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chainlog_block::{render, seal, compress};
//!
//! let content = render(&state.last_hash, now, &events, config.timezone());
//! let sealed = seal(content);
//! let gz = compress(&sealed.bytes)?;
//! ```
//!
//! None of these functions touch the outside world; the controller in
//! `chainlog-core` wires them to a source, a sink, and a state store.

pub mod archive;
pub mod chain;
pub mod serializer;
pub mod trigger;

pub use archive::{compress, decompress};
pub use chain::{hash_content, parse_block, seal, verify_block, verify_chain, SealedBlock};
pub use serializer::{format_timestamp, render, render_event_line};
pub use trigger::{should_seal, should_seal_with};

// ── Tests ─────────────────────────────────────────────────────────────────────
