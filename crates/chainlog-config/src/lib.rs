//! # chainlog-config
//!
//! TOML-driven configuration for chainlog hosts.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use chainlog_config::ChainlogSettings;
//!
//! let settings = ChainlogSettings::from_file(Path::new("chainlog.toml"))?;
//! let config = settings.block_config()?;
//! // Pass `config` to every `BlockController::on_trigger` call.
//! ```
//!
//! Every key is optional. Missing keys take the defaults `interval = 15`,
//! `blocksize = 1000`, `timezone = "UTC"`, `compare_and_swap = false`.

pub mod settings;

pub use settings::{BlockSection, ChainlogSettings, StorageSection};

// ── Tests ─────────────────────────────────────────────────────────────────────
