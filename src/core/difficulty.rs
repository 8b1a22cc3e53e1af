use crate::core::Block;
use log::info;

/// Seconds expected between two blocks
pub const BLOCK_GENERATION_INTERVAL: i64 = 10;
/// Blocks between two retargets
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

/// Difficulty adjustment algorithm for maintaining consistent block times
pub struct DifficultyAdjustment;

impl DifficultyAdjustment {
    /// Difficulty required of the block that would follow `chain`.
    ///
    /// Retargets on every multiple of the adjustment interval and otherwise
    /// keeps the latest block's difficulty.
    pub fn compute_difficulty(chain: &[Block]) -> u32 {
        let latest = match chain.last() {
            Some(block) => block,
            None => return 0,
        };
        if latest.get_index() % DIFFICULTY_ADJUSTMENT_INTERVAL == 0 && latest.get_index() != 0 {
            Self::retarget(latest, chain)
        } else {
            latest.get_difficulty()
        }
    }

    /// Compares the time taken by the last window of `chain` with the expected time.
    ///
    /// The window always comes from `chain` itself, so a candidate chain is judged
    /// on its own history.
    pub fn retarget(latest: &Block, chain: &[Block]) -> u32 {
        let window = DIFFICULTY_ADJUSTMENT_INTERVAL as usize;
        if chain.len() < window {
            return latest.get_difficulty();
        }
        let start = &chain[chain.len() - window];
        let time_expected = BLOCK_GENERATION_INTERVAL * DIFFICULTY_ADJUSTMENT_INTERVAL as i64;
        let time_taken = latest.get_timestamp().saturating_sub(start.get_timestamp());

        let adjusted = Self::adjust_difficulty(start.get_difficulty(), time_taken, time_expected);
        info!(
            "Difficulty adjustment at block {}: {} -> {adjusted} (actual: {time_taken}s, expected: {time_expected}s)",
            latest.get_index(),
            start.get_difficulty()
        );
        adjusted
    }

    fn adjust_difficulty(current: u32, time_taken: i64, time_expected: i64) -> u32 {
        if time_taken < time_expected / 2 {
            current.saturating_add(1)
        } else if time_taken > time_expected * 2 {
            current.saturating_sub(1)
        } else {
            current
        }
    }

    /// Σ 2^difficulty over `chain`, saturating at u128::MAX
    pub fn accumulated_difficulty(chain: &[Block]) -> u128 {
        chain.iter().fold(0u128, |acc, block| {
            let work = 1u128.checked_shl(block.get_difficulty()).unwrap_or(u128::MAX);
            acc.saturating_add(work)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Blocks only need index, timestamp and difficulty for these rules
    fn block(index: u64, timestamp: i64, difficulty: u32) -> Block {
        Block::new(index, "", timestamp, vec![], difficulty, 0)
    }

    fn chain_with_spacing(len: u64, spacing: i64, difficulty: u32) -> Vec<Block> {
        (0..len)
            .map(|i| block(i, 1_000 + i as i64 * spacing, difficulty))
            .collect()
    }

    #[test]
    fn test_no_retarget_between_intervals() {
        let chain = chain_with_spacing(6, 1, 3);
        assert_eq!(DifficultyAdjustment::compute_difficulty(&chain), 3);
    }

    #[test]
    fn test_fast_window_increases_difficulty() {
        // 11 blocks, latest index 10, window start at index 1: 9s elapsed
        let chain = chain_with_spacing(11, 1, 3);
        assert_eq!(DifficultyAdjustment::compute_difficulty(&chain), 4);
    }

    #[test]
    fn test_slow_window_decreases_difficulty() {
        let chain = chain_with_spacing(11, 30, 3);
        assert_eq!(DifficultyAdjustment::compute_difficulty(&chain), 2);
    }

    #[test]
    fn test_on_schedule_window_keeps_difficulty() {
        let chain = chain_with_spacing(11, 11, 3);
        assert_eq!(DifficultyAdjustment::compute_difficulty(&chain), 3);
    }

    #[test]
    fn test_retarget_uses_window_start_difficulty() {
        let mut chain = chain_with_spacing(11, 1, 2);
        chain[10] = block(10, chain[10].get_timestamp(), 7);
        assert_eq!(DifficultyAdjustment::compute_difficulty(&chain), 3);
    }

    #[test]
    fn test_difficulty_never_goes_below_zero() {
        let chain = chain_with_spacing(11, 100, 0);
        assert_eq!(DifficultyAdjustment::compute_difficulty(&chain), 0);
    }

    #[test]
    fn test_genesis_only_and_empty_chain() {
        assert_eq!(DifficultyAdjustment::compute_difficulty(&[block(0, 0, 0)]), 0);
        assert_eq!(DifficultyAdjustment::compute_difficulty(&[]), 0);
    }

    #[test]
    fn test_short_chain_keeps_latest_difficulty() {
        let latest = block(10, 5, 6);
        assert_eq!(DifficultyAdjustment::retarget(&latest, &[latest.clone()]), 6);
    }

    #[test]
    fn test_accumulated_difficulty() {
        let chain = vec![block(0, 0, 0), block(1, 0, 3), block(2, 0, 3)];
        assert_eq!(DifficultyAdjustment::accumulated_difficulty(&chain), 1 + 8 + 8);
        let huge = vec![block(0, 0, 200), block(1, 0, 127)];
        assert_eq!(DifficultyAdjustment::accumulated_difficulty(&huge), u128::MAX);
    }
}
