use super::BluffPolicy;
use crate::bot::{BluffFeatures, BluffParams, DecisionContext, TargetSelector, WeightModel};
use bluff_core::model::action::{ActionTarget, ActionType};
use rand::RngCore;
use tracing::{Level, event};

/// Weighted heuristic policy: phase tables, signal bonuses, counter-play and
/// the repetition penalty.
#[derive(Debug, Clone, Default)]
pub struct HeuristicBluffPolicy {
    model: WeightModel,
    targets: TargetSelector,
    features: BluffFeatures,
}

impl HeuristicBluffPolicy {
    pub fn new(params: BluffParams, features: BluffFeatures) -> Self {
        Self {
            model: WeightModel::new(params),
            targets: TargetSelector::new(params),
            features,
        }
    }

    pub fn model(&self) -> &WeightModel {
        &self.model
    }
}

impl BluffPolicy for HeuristicBluffPolicy {
    fn act_chance(&self, ctx: &DecisionContext) -> f32 {
        self.model.act_chance(ctx)
    }

    fn choose_action(&mut self, ctx: &DecisionContext, rng: &mut dyn RngCore) -> ActionType {
        let weights = self.model.weights(ctx);
        let action = weights.sample(rng);
        if self.features.decision_details() {
            log_weights(ctx, &weights.describe(), action);
        }
        action
    }

    fn choose_target(
        &mut self,
        action: ActionType,
        ctx: &DecisionContext,
        rng: &mut dyn RngCore,
    ) -> Option<ActionTarget> {
        self.targets.select(action, ctx, rng)
    }
}

fn log_weights(ctx: &DecisionContext, weights: &str, chosen: ActionType) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    event!(
        target: "bluff_bot::weights",
        Level::INFO,
        phase = ctx.phase().as_str(),
        holds_joker = ctx.holds_joker(),
        own_last = ?ctx.own_last_action,
        opponent_last = ?ctx.opponent_last_action,
        weights = %weights,
        chosen = chosen.as_str(),
    );
}
