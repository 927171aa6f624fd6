mod heuristic;

pub use heuristic::HeuristicBluffPolicy;

use crate::bot::DecisionContext;
use bluff_core::model::action::{ActionTarget, ActionType};
use rand::RngCore;

/// Decision seam for the AI bluff loop. The scheduler owns pacing; a policy
/// only answers "how likely", "which gesture" and "at which card".
pub trait BluffPolicy: Send {
    /// Probability of acting this cycle, already clamped.
    fn act_chance(&self, ctx: &DecisionContext) -> f32;

    fn choose_action(&mut self, ctx: &DecisionContext, rng: &mut dyn RngCore) -> ActionType;

    /// `None` skips the cycle (nothing to point at).
    fn choose_target(
        &mut self,
        action: ActionType,
        ctx: &DecisionContext,
        rng: &mut dyn RngCore,
    ) -> Option<ActionTarget>;
}
