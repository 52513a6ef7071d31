//! Configuration schema and loading.
//!
//! `ChainlogSettings` is deserialized from TOML and validated immediately,
//! so a bad `interval`, `blocksize`, or `timezone` is rejected when the
//! file is loaded rather than on the first invocation.
//!
//! ```toml
//! [block]
//! interval = 15
//! blocksize = 1000
//! timezone = "UTC"
//! compare_and_swap = false
//!
//! [storage]
//! state_file = "state.json"
//! output_dir = "blocks"
//! ```

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chainlog_contracts::{
    config::BlockConfig,
    error::{ChainlogError, ChainlogResult},
};

/// `[block]`: when to seal and how to render.
///
/// Integers are read signed so that a negative value produces a clear
/// "must be positive" error instead of a TOML type error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlockSection {
    /// Minutes after the last run at which a block is sealed regardless of size.
    pub interval: i64,

    /// Pending-event count above which a block is sealed immediately.
    pub blocksize: i64,

    /// IANA zone name for rendered timestamps.
    pub timezone: String,

    /// Persist chain state with compare-and-set.
    pub compare_and_swap: bool,
}

impl Default for BlockSection {
    fn default() -> Self {
        Self {
            interval: BlockConfig::DEFAULT_INTERVAL_MINUTES as i64,
            blocksize: BlockConfig::DEFAULT_BLOCK_SIZE as i64,
            timezone: "UTC".to_string(),
            compare_and_swap: false,
        }
    }
}

/// `[storage]`: where the CLI host keeps its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub state_file: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from("state.json"),
            output_dir: PathBuf::from("blocks"),
        }
    }
}

/// The top-level structure deserialized from a chainlog TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainlogSettings {
    pub block: BlockSection,
    pub storage: StorageSection,
}

impl ChainlogSettings {
    /// Parse and validate `s`.
    ///
    /// Returns `ChainlogError::ConfigError` if the TOML is malformed, has
    /// unknown keys, or holds invalid block settings.
    pub fn from_toml_str(s: &str) -> ChainlogResult<Self> {
        let settings: Self = toml::from_str(s).map_err(|e| ChainlogError::ConfigError {
            reason: format!("failed to parse chainlog TOML: {}", e),
        })?;
        settings.block_config()?;
        Ok(settings)
    }

    /// Read and validate the file at `path`.
    ///
    /// Relative storage paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> ChainlogResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ChainlogError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut settings = Self::from_toml_str(&contents)?;

        if let Some(base) = path.parent() {
            settings.storage.state_file = base.join(&settings.storage.state_file);
            settings.storage.output_dir = base.join(&settings.storage.output_dir);
        }

        debug!(
            path = %path.display(),
            interval = settings.block.interval,
            blocksize = settings.block.blocksize,
            timezone = %settings.block.timezone,
            "configuration loaded"
        );
        Ok(settings)
    }

    /// Build the validated per-invocation block configuration.
    pub fn block_config(&self) -> ChainlogResult<BlockConfig> {
        let interval = positive(self.block.interval, "interval")?;
        let blocksize = positive(self.block.blocksize, "blocksize")?;
        let timezone: Tz = self
            .block
            .timezone
            .parse()
            .map_err(|e| ChainlogError::ConfigError {
                reason: format!("unknown timezone '{}': {}", self.block.timezone, e),
            })?;

        Ok(BlockConfig::new(interval, blocksize, timezone)?
            .with_compare_and_swap(self.block.compare_and_swap))
    }
}

fn positive(value: i64, name: &str) -> ChainlogResult<u64> {
    u64::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| ChainlogError::ConfigError {
            reason: format!("{} must be a positive integer, got {}", name, value),
        })
}
