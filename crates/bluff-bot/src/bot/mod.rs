mod params;
mod scheduler;
mod target;
mod weights;

pub use params::{BluffParams, WeightRow};
pub use scheduler::{
    AiActionOutcome, DecisionScheduler, SchedulerState, TerminationReason, TickInputs,
};
pub use target::TargetSelector;
pub use weights::{WeightModel, WeightTable};

use bluff_core::model::action::ActionType;
use bluff_core::model::phase::{GamePhase, TableCounts};
use bluff_core::model::signal::EmotionalSignal;

/// Environment toggles for the bot crate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BluffFeatures {
    decision_details: bool,
    player_cooldown: Option<f32>,
}

impl BluffFeatures {
    pub const fn new(decision_details: bool) -> Self {
        Self {
            decision_details,
            player_cooldown: None,
        }
    }

    pub fn from_env() -> Self {
        Self::from_reader(|key| std::env::var(key).ok())
    }

    /// Dump the full weight table with every decision event.
    pub const fn decision_details(self) -> bool {
        self.decision_details
    }

    /// Override for the player cooldown, if one was configured.
    pub const fn player_cooldown(self) -> Option<f32> {
        self.player_cooldown
    }

    pub fn with_decision_details(mut self, enabled: bool) -> Self {
        self.decision_details = enabled;
        self
    }

    pub fn with_player_cooldown(mut self, seconds: f32) -> Self {
        self.player_cooldown = Some(seconds);
        self
    }

    pub fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let decision_details = read("BLUFF_DECISION_DETAILS")
            .map(|raw| matches!(raw.trim(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(false);

        let player_cooldown = read("BLUFF_PLAYER_COOLDOWN")
            .and_then(|raw| raw.trim().parse::<f32>().ok())
            .filter(|value| value.is_finite() && *value >= 0.0);

        Self {
            decision_details,
            player_cooldown,
        }
    }

    /// Apply overrides onto a parameter set.
    pub fn apply(self, mut params: BluffParams) -> BluffParams {
        if let Some(cooldown) = self.player_cooldown {
            params.player_cooldown = cooldown;
        }
        params
    }
}

/// Everything the weight model and target selector look at for one decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionContext {
    pub counts: TableCounts,
    /// Slot of the Joker in the AI hand.
    pub joker_index: Option<usize>,
    pub emotion: EmotionalSignal,
    pub pressure: f32,
    /// Opponent bluffed since the AI last acted.
    pub opponent_acted_recently: bool,
    /// Opponent's action, only when it is also the newest history record.
    pub opponent_last_action: Option<ActionType>,
    pub own_last_action: Option<ActionType>,
}

impl DecisionContext {
    pub const fn new(counts: TableCounts) -> Self {
        Self {
            counts,
            joker_index: None,
            emotion: EmotionalSignal::Calm,
            pressure: 0.0,
            opponent_acted_recently: false,
            opponent_last_action: None,
            own_last_action: None,
        }
    }

    pub const fn phase(&self) -> GamePhase {
        self.counts.phase()
    }

    pub const fn total_cards(&self) -> usize {
        self.counts.total()
    }

    pub const fn ai_cards(&self) -> usize {
        self.counts.ai_cards
    }

    pub const fn holds_joker(&self) -> bool {
        self.joker_index.is_some()
    }

    pub fn with_joker(mut self, index: usize) -> Self {
        self.joker_index = Some(index);
        self
    }

    pub fn with_emotion(mut self, emotion: EmotionalSignal) -> Self {
        self.emotion = emotion;
        self
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = pressure;
        self
    }

    pub fn with_own_last(mut self, action: ActionType) -> Self {
        self.own_last_action = Some(action);
        self
    }

    /// Mark the opponent as having bluffed. `newest` is their action when it
    /// is the most recent record; counter-play only reacts to that case.
    pub fn with_opponent(mut self, newest: Option<ActionType>) -> Self {
        self.opponent_acted_recently = true;
        self.opponent_last_action = newest;
        self
    }
}
