//! # chainlog-core
//!
//! The block-creation controller for the chainlog audit ledger.
//!
//! This crate provides:
//! - The three collaborator traits (`EventSource`, `BlockSink`, `ChainStateStore`)
//! - The batch collector that drains a source
//! - The `BlockController` that gates, seals, emits, and persists
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chainlog_core::BlockController;
//!
//! let controller = BlockController::new(Box::new(store), Box::new(sink));
//! match controller.on_trigger_now(&source, &config)? {
//!     InvocationOutcome::Sealed { block_number, .. } => { /* ... */ }
//!     _ => {}
//! }
//! ```

pub mod collector;
pub mod controller;
pub mod traits;

pub use controller::BlockController;
