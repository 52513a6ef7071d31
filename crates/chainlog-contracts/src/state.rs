//! The durable chain cursor and its key/value encoding.
//!
//! `ChainState` is the only mutable entity in chainlog. It is stored as a
//! flat string map so any key/value backend can hold it:
//!
//! | key             | value                               |
//! |-----------------|-------------------------------------|
//! | `lastExecution` | epoch millis of the last triggered run |
//! | `blockNumber`   | count of blocks sealed so far       |
//! | `lastHash`      | content hash of the newest block    |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ChainlogError, ChainlogResult},
    event::EpochMillis,
};

/// The raw form a chain state store reads and writes.
pub type StateMap = BTreeMap<String, String>;

/// Resume point of the hash chain.
///
/// Invariants maintained by the block controller:
/// - `last_hash` is the content hash of the most recently sealed block, or
///   [`ChainState::GENESIS_HASH`] when none has been sealed.
/// - `block_number` equals the number of blocks sealed so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub last_execution_time: EpochMillis,
    pub block_number: u64,
    pub last_hash: String,
}

impl ChainState {
    /// The `previous_hash` of the first block ever sealed.
    pub const GENESIS_HASH: &'static str = "root";

    pub const LAST_EXECUTION_KEY: &'static str = "lastExecution";
    pub const BLOCK_NUMBER_KEY: &'static str = "blockNumber";
    pub const LAST_HASH_KEY: &'static str = "lastHash";

    /// Decode a state from the store's map.
    ///
    /// `None` and missing keys fall back to the defaults. A key that is
    /// present but does not parse is a `StateLoad` error: the stored cursor
    /// is corrupt and must not be silently reset.
    pub fn from_map(map: Option<&StateMap>) -> ChainlogResult<Self> {
        let mut state = Self::default();
        let Some(map) = map else {
            return Ok(state);
        };

        if let Some(raw) = map.get(Self::LAST_EXECUTION_KEY) {
            state.last_execution_time = raw.parse().map_err(|e| ChainlogError::StateLoad {
                reason: format!("invalid {} '{}': {}", Self::LAST_EXECUTION_KEY, raw, e),
            })?;
        }
        if let Some(raw) = map.get(Self::BLOCK_NUMBER_KEY) {
            state.block_number = raw.parse().map_err(|e| ChainlogError::StateLoad {
                reason: format!("invalid {} '{}': {}", Self::BLOCK_NUMBER_KEY, raw, e),
            })?;
        }
        if let Some(raw) = map.get(Self::LAST_HASH_KEY) {
            state.last_hash = raw.clone();
        }

        Ok(state)
    }

    /// Encode this state on top of `base`, keeping any keys chainlog does
    /// not own.
    pub fn to_map(&self, base: Option<&StateMap>) -> StateMap {
        let mut map = base.cloned().unwrap_or_default();
        map.insert(
            Self::LAST_EXECUTION_KEY.to_string(),
            self.last_execution_time.to_string(),
        );
        map.insert(Self::BLOCK_NUMBER_KEY.to_string(), self.block_number.to_string());
        map.insert(Self::LAST_HASH_KEY.to_string(), self.last_hash.clone());
        map
    }
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            last_execution_time: 0,
            block_number: 0,
            last_hash: Self::GENESIS_HASH.to_string(),
        }
    }
}
