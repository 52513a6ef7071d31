//! Size-or-time gate deciding whether an invocation seals a block.

use chainlog_contracts::{config::BlockConfig, event::EpochMillis};

/// Return `true` when a block should be sealed now.
///
/// Fires when `pending_count` exceeds `block_size_threshold`, or when more
/// than `interval_minutes` have elapsed since `last_execution_time`. Both
/// comparisons are strict: a queue holding exactly the threshold, or an
/// elapsed time of exactly the interval, does not fire.
pub fn should_seal(
    pending_count: u64,
    block_size_threshold: u64,
    last_execution_time: EpochMillis,
    interval_minutes: u64,
    now: EpochMillis,
) -> bool {
    let interval_millis = BlockConfig::minutes_to_millis(interval_minutes);
    pending_count > block_size_threshold || now.saturating_sub(last_execution_time) > interval_millis
}

/// [`should_seal`] with thresholds taken from `config`.
pub fn should_seal_with(
    config: &BlockConfig,
    pending_count: u64,
    last_execution_time: EpochMillis,
    now: EpochMillis,
) -> bool {
    should_seal(
        pending_count,
        config.block_size(),
        last_execution_time,
        config.interval_minutes(),
        now,
    )
}
