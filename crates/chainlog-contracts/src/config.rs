//! The per-invocation block configuration value.
//!
//! A `BlockConfig` is built once by the host (usually from TOML via
//! `chainlog-config`) and handed to every controller invocation. The
//! controller never stores it.

use chrono_tz::Tz;

use crate::error::{ChainlogError, ChainlogResult};

/// Size, time, and rendering settings for sealing blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockConfig {
    interval_minutes: u64,
    block_size: u64,
    timezone: Tz,
    compare_and_swap: bool,
}

impl BlockConfig {
    pub const DEFAULT_INTERVAL_MINUTES: u64 = 15;
    pub const DEFAULT_BLOCK_SIZE: u64 = 1000;

    /// Build a config, rejecting a zero interval or block size.
    pub fn new(interval_minutes: u64, block_size: u64, timezone: Tz) -> ChainlogResult<Self> {
        if interval_minutes == 0 {
            return Err(ChainlogError::ConfigError {
                reason: "interval must be a positive number of minutes".to_string(),
            });
        }
        if block_size == 0 {
            return Err(ChainlogError::ConfigError {
                reason: "blocksize must be a positive integer".to_string(),
            });
        }
        Ok(Self {
            interval_minutes,
            block_size,
            timezone,
            compare_and_swap: false,
        })
    }

    /// Persist chain state with compare-and-set instead of a blind write.
    pub fn with_compare_and_swap(mut self, enabled: bool) -> Self {
        self.compare_and_swap = enabled;
        self
    }

    /// Elapsed-time trigger threshold, in minutes.
    pub fn interval_minutes(&self) -> u64 {
        self.interval_minutes
    }

    /// Elapsed-time trigger threshold, in milliseconds.
    pub fn interval_millis(&self) -> i64 {
        Self::minutes_to_millis(self.interval_minutes)
    }

    /// `minutes` in milliseconds, saturating at `i64::MAX`.
    pub fn minutes_to_millis(minutes: u64) -> i64 {
        i64::try_from(minutes.saturating_mul(60_000)).unwrap_or(i64::MAX)
    }

    /// Pending-count trigger threshold.
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Zone used to render every timestamp in a block.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn compare_and_swap(&self) -> bool {
        self.compare_and_swap
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            interval_minutes: Self::DEFAULT_INTERVAL_MINUTES,
            block_size: Self::DEFAULT_BLOCK_SIZE,
            timezone: Tz::UTC,
            compare_and_swap: false,
        }
    }
}
