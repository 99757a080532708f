//! Difficulty adjustment
//!
//! The controller measures the wall-clock duration of the last recalc
//! window and scales difficulty proportionally toward the configured block
//! interval, clamped to a factor of 4 per adjustment to blunt timestamp
//! games and measurement noise.

use crate::core::{Chain, Target};
use crate::error::Result;
use std::time::Duration;
use tracing::debug;

/// Maximum factor by which one recalculation may shift the difficulty
pub const CONFINE_FACTOR: f64 = 4.0;

/// Difficulty floor; targets are undefined below it
pub const MIN_DIFFICULTY: f64 = 1.0;

/// Outcome of a recalculation, for telemetry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recalc {
    /// Measured average seconds per block over the window
    pub actual_avg_secs: f64,
    /// Difficulty before the adjustment
    pub previous: f64,
    /// Difficulty after the adjustment
    pub difficulty: f64,
}

/// Holds the current difficulty and the adjustment parameters
#[derive(Debug, Clone)]
pub struct DifficultyController {
    difficulty: f64,
    target_dur: Duration,
    recalc_period: usize,
}

impl DifficultyController {
    pub fn new(initial_difficulty: f64, target_dur: Duration, recalc_period: usize) -> Self {
        Self {
            difficulty: initial_difficulty.max(MIN_DIFFICULTY),
            target_dur,
            recalc_period,
        }
    }

    /// Current difficulty
    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    /// Adopt a difficulty learned from a peer at bootstrap
    pub fn set_difficulty(&mut self, difficulty: f64) {
        self.difficulty = difficulty.max(MIN_DIFFICULTY);
    }

    /// Blocks between adjustments
    pub fn recalc_period(&self) -> usize {
        self.recalc_period
    }

    /// Whether a chain of this length lands on a recalculation boundary
    pub fn is_boundary(&self, chain_len: usize) -> bool {
        chain_len > 1 && (chain_len - 1) % self.recalc_period == 0
    }

    /// Mining target for the current difficulty
    pub fn target(&self) -> Result<Target> {
        Target::from_difficulty(self.difficulty)
    }

    /// Recalculate difficulty from the chain's last window.
    ///
    /// Returns None when the chain holds fewer solves than the window
    /// requires; the caller treats that as a no-op.
    pub fn recalc(&mut self, chain: &Chain) -> Option<Recalc> {
        let actual_avg = chain.avg_block_dur(self.recalc_period)?;
        let actual_avg_secs = actual_avg.num_nanoseconds()? as f64 / 1e9;

        let previous = self.difficulty;
        self.difficulty = calc_difficulty(self.target_dur, actual_avg_secs, previous);

        debug!(
            window_avg_secs = actual_avg_secs,
            previous, difficulty = self.difficulty, "difficulty recalculated"
        );

        Some(Recalc {
            actual_avg_secs,
            previous,
            difficulty: self.difficulty,
        })
    }
}

/// Scale difficulty by target/actual, confined and floored
fn calc_difficulty(target_dur: Duration, actual_secs: f64, current: f64) -> f64 {
    let adjustment = confine(target_dur.as_secs_f64() / actual_secs);
    (current * adjustment).max(MIN_DIFFICULTY)
}

/// Restrict an adjustment to [1/CONFINE_FACTOR, CONFINE_FACTOR]
fn confine(adjustment: f64) -> f64 {
    adjustment.clamp(1.0 / CONFINE_FACTOR, CONFINE_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Block, Sha256Hasher, Target};
    use chrono::{TimeZone, Utc};

    fn chain_with_timestamps(secs: &[f64]) -> Chain {
        let hasher = Sha256Hasher;
        let mut blocks = vec![Block::genesis(&hasher)];
        for &s in secs {
            let prev_hash = blocks.last().unwrap().hash;
            let mut block = Block::new(&hasher, prev_hash, vec![], 0, Target::MAX, "m");
            let nanos = (s * 1e9).round() as i64;
            block.timestamp = Utc.timestamp_nanos(nanos);
            blocks.push(block);
        }
        Chain::from_blocks(blocks)
    }

    fn controller(target_secs: f64, period: usize, difficulty: f64) -> DifficultyController {
        DifficultyController::new(difficulty, Duration::from_secs_f64(target_secs), period)
    }

    #[test]
    fn test_exact_duration_keeps_difficulty() {
        // Genesis at epoch, one block at t=100s with a 100s target
        let chain = chain_with_timestamps(&[100.0]);
        let mut ctrl = controller(100.0, 1, 100.0);
        let recalc = ctrl.recalc(&chain).unwrap();
        assert_eq!(recalc.difficulty, 100.0);
        assert_eq!(ctrl.difficulty(), 100.0);
    }

    #[test]
    fn test_half_duration_doubles_difficulty() {
        let chain = chain_with_timestamps(&[50.0]);
        let mut ctrl = controller(100.0, 1, 100.0);
        assert_eq!(ctrl.recalc(&chain).unwrap().difficulty, 200.0);
    }

    #[test]
    fn test_double_duration_halves_difficulty() {
        let chain = chain_with_timestamps(&[200.0]);
        let mut ctrl = controller(100.0, 1, 1024.0);
        assert_eq!(ctrl.recalc(&chain).unwrap().difficulty, 512.0);
    }

    #[test]
    fn test_slow_solve_confined_to_quarter() {
        // 1000s for a 100s target computes x0.1 but is clamped to x0.25
        let chain = chain_with_timestamps(&[1000.0]);
        let mut ctrl = controller(100.0, 1, 1024.0);
        assert_eq!(ctrl.recalc(&chain).unwrap().difficulty, 256.0);
    }

    #[test]
    fn test_fast_solve_confined_to_quadruple() {
        let chain = chain_with_timestamps(&[10.0]);
        let mut ctrl = controller(100.0, 1, 1024.0);
        assert_eq!(ctrl.recalc(&chain).unwrap().difficulty, 4096.0);
    }

    #[test]
    fn test_window_average_over_three_blocks() {
        // 307s over 3 blocks against a 100s target: x(300/307)
        let chain = chain_with_timestamps(&[100.0, 199.0, 307.0]);
        let mut ctrl = controller(100.0, 3, 100.0);
        let got = ctrl.recalc(&chain).unwrap().difficulty;
        assert!((got - 97.71986970715871).abs() < 1e-9);
    }

    #[test]
    fn test_sub_second_window() {
        let chain = chain_with_timestamps(&[0.05]);
        let mut ctrl = controller(0.1, 1, 1000.0);
        assert_eq!(ctrl.recalc(&chain).unwrap().difficulty, 2000.0);
    }

    #[test]
    fn test_insufficient_history_is_noop() {
        let chain = chain_with_timestamps(&[10.0]);
        let mut ctrl = controller(100.0, 3, 100.0);
        assert_eq!(ctrl.recalc(&chain), None);
        assert_eq!(ctrl.difficulty(), 100.0);
    }

    #[test]
    fn test_difficulty_floor() {
        let chain = chain_with_timestamps(&[1000.0]);
        let mut ctrl = controller(100.0, 1, 1.0);
        assert_eq!(ctrl.recalc(&chain).unwrap().difficulty, MIN_DIFFICULTY);
    }

    #[test]
    fn test_confine_bounds() {
        assert_eq!(confine(1.0), 1.0);
        assert_eq!(confine(0.5), 0.5);
        assert_eq!(confine(2.0), 2.0);
        assert_eq!(confine(5.0), 4.0);
        assert_eq!(confine(0.2), 0.25);
    }

    #[test]
    fn test_boundary_predicate() {
        let ctrl = controller(10.0, 10, 1.0);
        assert!(!ctrl.is_boundary(1)); // genesis only
        assert!(!ctrl.is_boundary(10));
        assert!(ctrl.is_boundary(11)); // 10 solves
        assert!(ctrl.is_boundary(21));

        let every = controller(10.0, 1, 1.0);
        assert!(every.is_boundary(2));
        assert!(every.is_boundary(3));
    }

    #[test]
    fn test_recalc_reports_window_and_previous() {
        let chain = chain_with_timestamps(&[50.0]);
        let mut ctrl = controller(100.0, 1, 100.0);
        let recalc = ctrl.recalc(&chain).unwrap();
        assert_eq!(recalc.actual_avg_secs, 50.0);
        assert_eq!(recalc.previous, 100.0);
    }
}
