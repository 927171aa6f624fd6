use bluff_core::model::phase::GamePhase;

/// Per-action weights in `ActionType::ORDERED` order:
/// Shuffle, Push, Pull, Wiggle, Spread, Close.
pub type WeightRow = [f32; 6];

/// Tunable parameters for the bluff decision model, target selection and
/// scheduler pacing.
///
/// Ranges are `(min, max)`; float ranges are inclusive, integer budgets are
/// half-open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BluffParams {
    // === Act chance ===
    /// Starting probability of acting on a tick (default: 0.8)
    pub base_act_chance: f32,

    /// Lower clamp for the act chance (default: 0.35)
    pub min_act_chance: f32,

    /// Upper clamp for the act chance (default: 0.95)
    pub max_act_chance: f32,

    /// Early-phase adjustment (default: +0.15)
    pub early_act_bonus: f32,

    /// Late-phase adjustment (default: -0.10)
    pub late_act_bonus: f32,

    /// Emotion adjustments (defaults: 0.15 / 0.12 / 0.08 / 0.10)
    pub frustrated_act_bonus: f32,
    pub pleased_act_bonus: f32,
    pub anticipating_act_bonus: f32,
    pub hurt_act_bonus: f32,

    /// Pressure above which the high bonus applies (default: 2.0, +0.15)
    pub pressure_high: f32,
    pub pressure_high_bonus: f32,

    /// Pressure above which the elevated bonus applies (default: 1.5, +0.10)
    pub pressure_elevated: f32,
    pub pressure_elevated_bonus: f32,

    /// Pressure below which the composure bonus applies (default: 0.5, +0.05)
    pub pressure_low: f32,
    pub pressure_low_bonus: f32,

    /// Opponent bluffed since our last action (default: +0.20)
    pub opponent_recent_bonus: f32,

    /// We hold the Joker (default: +0.10)
    pub joker_act_bonus: f32,

    // === Base weights ===
    pub early_weights: WeightRow,
    pub mid_weights: WeightRow,
    /// Mid-phase Push weight while holding the Joker (default: 3.5)
    pub mid_joker_push: f32,
    pub late_weights: WeightRow,
    pub late_joker_weights: WeightRow,

    // === Mid-phase signal bonuses ===
    pub mid_frustrated_wiggle: f32,
    pub mid_frustrated_push: f32,
    pub mid_pleased_spread: f32,
    pub mid_pleased_shuffle: f32,
    /// Anticipating or Hurt: hide the hand (defaults: Close +1.0, Pull +0.8)
    pub mid_guarded_close: f32,
    pub mid_guarded_pull: f32,
    pub mid_pressure_shuffle: f32,
    pub mid_pressure_wiggle: f32,

    // === Late-phase endgame escalation ===
    /// Opponent hand size at or below which the taunt escalates (default: 3)
    pub endgame_opponent_cards: usize,
    pub endgame_push: f32,
    pub endgame_wiggle: f32,
    /// Shuffle weight is replaced, not increased (default: 0.3)
    pub endgame_shuffle: f32,

    // === Counter-play ===
    pub counter_shuffle: f32,
    pub counter_spread_close: f32,
    pub counter_spread_shuffle: f32,

    /// Multiplier on the weight of our own previous action (default: 0.5)
    pub repeat_penalty: f32,

    // === Target selection ===
    /// Draws spent trying to land off the Joker in the early phase (default: 5)
    pub early_avoid_attempts: u32,
    /// Chance to point at the Joker in the mid phase (default: 0.5)
    pub mid_joker_target_chance: f32,
    /// Chance to point at the Joker in the late phase (default: 0.95)
    pub late_joker_target_chance: f32,

    // === Scheduler pacing ===
    pub initial_delay_early: (f32, f32),
    pub initial_delay_later: (f32, f32),
    pub budget_early: (u32, u32),
    pub budget_mid: (u32, u32),
    pub budget_late: (u32, u32),
    pub cooldown_early: (f32, f32),
    pub cooldown_mid: (f32, f32),
    pub cooldown_late: (f32, f32),

    /// Minimum gap between two player bluffs (default: 1.0)
    pub player_cooldown: f32,
}

impl Default for BluffParams {
    fn default() -> Self {
        Self {
            base_act_chance: 0.8,
            min_act_chance: 0.35,
            max_act_chance: 0.95,
            early_act_bonus: 0.15,
            late_act_bonus: -0.10,
            frustrated_act_bonus: 0.15,
            pleased_act_bonus: 0.12,
            anticipating_act_bonus: 0.08,
            hurt_act_bonus: 0.10,
            pressure_high: 2.0,
            pressure_high_bonus: 0.15,
            pressure_elevated: 1.5,
            pressure_elevated_bonus: 0.10,
            pressure_low: 0.5,
            pressure_low_bonus: 0.05,
            opponent_recent_bonus: 0.20,
            joker_act_bonus: 0.10,

            early_weights: [4.0, 1.5, 0.8, 1.2, 0.7, 0.3],
            mid_weights: [1.5, 2.0, 1.2, 2.0, 0.7, 0.5],
            mid_joker_push: 3.5,
            late_weights: [0.8, 2.0, 2.5, 2.5, 0.3, 0.5],
            late_joker_weights: [0.8, 5.0, 0.8, 4.0, 0.3, 1.5],

            mid_frustrated_wiggle: 2.5,
            mid_frustrated_push: 2.0,
            mid_pleased_spread: 1.2,
            mid_pleased_shuffle: 0.8,
            mid_guarded_close: 1.0,
            mid_guarded_pull: 0.8,
            mid_pressure_shuffle: 1.0,
            mid_pressure_wiggle: 0.8,

            endgame_opponent_cards: 3,
            endgame_push: 3.0,
            endgame_wiggle: 2.5,
            endgame_shuffle: 0.3,

            counter_shuffle: 2.0,
            counter_spread_close: 1.5,
            counter_spread_shuffle: 1.0,

            repeat_penalty: 0.5,

            early_avoid_attempts: 5,
            mid_joker_target_chance: 0.5,
            late_joker_target_chance: 0.95,

            initial_delay_early: (1.0, 2.5),
            initial_delay_later: (1.5, 4.0),
            budget_early: (6, 10),
            budget_mid: (4, 7),
            budget_late: (2, 5),
            cooldown_early: (1.0, 2.0),
            cooldown_mid: (1.5, 3.0),
            cooldown_late: (3.0, 4.5),

            player_cooldown: 1.0,
        }
    }
}

impl BluffParams {
    /// Initial delay keys off "early or not" only; mid and late share a range.
    pub fn initial_delay(&self, phase: GamePhase) -> (f32, f32) {
        match phase {
            GamePhase::Early => self.initial_delay_early,
            GamePhase::Mid | GamePhase::Late => self.initial_delay_later,
        }
    }

    pub fn budget(&self, phase: GamePhase) -> (u32, u32) {
        match phase {
            GamePhase::Early => self.budget_early,
            GamePhase::Mid => self.budget_mid,
            GamePhase::Late => self.budget_late,
        }
    }

    pub fn cooldown(&self, phase: GamePhase) -> (f32, f32) {
        match phase {
            GamePhase::Early => self.cooldown_early,
            GamePhase::Mid => self.cooldown_mid,
            GamePhase::Late => self.cooldown_late,
        }
    }
}
