//! Match configuration.
//!
//! Rule knobs that vary between formats live here rather than in the state
//! machine. Defaults follow the pocket format: 7-card opening hands, three
//! bench slots, first to three points.

use serde::{Deserialize, Serialize};

/// Complete match configuration.
///
/// ```
/// use rust_tcg::core::MatchConfig;
///
/// let config = MatchConfig::new(7).with_skip_first_draw(true);
/// assert_eq!(config.opening_hand_size, 7);
/// assert!(config.skip_first_draw);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Seed for every random decision in the match.
    pub seed: u64,

    /// Cards drawn into each opening hand.
    pub opening_hand_size: usize,

    /// Maximum number of benched cards per player.
    pub bench_slots: usize,

    /// Points needed to win.
    pub points_to_win: u32,

    /// Points the opponent gains per knockout.
    pub points_per_knockout: u32,

    /// The first player skips the draw on turn 1.
    pub skip_first_draw: bool,

    /// The first player receives energy on turn 1.
    pub first_turn_energy: bool,

    /// Extra damage dealt to a defender weak to the attacker's type.
    pub weakness_bonus: i64,
}

impl MatchConfig {
    /// Default configuration with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            opening_hand_size: 7,
            bench_slots: 3,
            points_to_win: 3,
            points_per_knockout: 1,
            skip_first_draw: false,
            first_turn_energy: false,
            weakness_bonus: 20,
        }
    }

    #[must_use]
    pub fn with_opening_hand_size(mut self, size: usize) -> Self {
        self.opening_hand_size = size;
        self
    }

    /// Set the bench size. Panics on zero.
    #[must_use]
    pub fn with_bench_slots(mut self, slots: usize) -> Self {
        assert!(slots > 0, "Bench needs at least one slot");
        self.bench_slots = slots;
        self
    }

    /// Set the winning point total. Panics on zero.
    #[must_use]
    pub fn with_points_to_win(mut self, points: u32) -> Self {
        assert!(points > 0, "Points to win must be positive");
        self.points_to_win = points;
        self
    }

    #[must_use]
    pub fn with_points_per_knockout(mut self, points: u32) -> Self {
        self.points_per_knockout = points;
        self
    }

    #[must_use]
    pub fn with_skip_first_draw(mut self, skip: bool) -> Self {
        self.skip_first_draw = skip;
        self
    }

    #[must_use]
    pub fn with_first_turn_energy(mut self, energy: bool) -> Self {
        self.first_turn_energy = energy;
        self
    }

    #[must_use]
    pub fn with_weakness_bonus(mut self, bonus: i64) -> Self {
        self.weakness_bonus = bonus;
        self
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
