//! # chainlog-contracts
//!
//! Shared types, configuration values, and errors for the chainlog audit
//! ledger.
//!
//! All crates in the workspace import from here. No block logic lives in
//! this crate, only data definitions, their string encodings, and the error
//! type.

pub mod block;
pub mod config;
pub mod error;
pub mod event;
pub mod outcome;
pub mod state;
