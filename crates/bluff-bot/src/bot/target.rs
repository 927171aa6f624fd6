use super::params::BluffParams;
use super::DecisionContext;
use bluff_core::model::action::{ActionTarget, ActionType};
use bluff_core::model::phase::GamePhase;
use rand::Rng;

/// Picks the card a targeted bluff points at.
///
/// Early on the AI steers away from the Joker, mid game it is a coin flip,
/// and late it points at the Joker almost every time as misdirection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetSelector {
    params: BluffParams,
}

impl TargetSelector {
    pub const fn new(params: BluffParams) -> Self {
        Self { params }
    }

    /// `None` means there is nothing to point at and the cycle is skipped.
    pub fn select<R: Rng + ?Sized>(
        &self,
        action: ActionType,
        ctx: &DecisionContext,
        rng: &mut R,
    ) -> Option<ActionTarget> {
        if action.is_global() {
            return Some(ActionTarget::Global);
        }

        let count = ctx.ai_cards();
        if count == 0 {
            return None;
        }

        let joker = ctx.joker_index.filter(|&index| index < count);
        let index = match (ctx.phase(), joker) {
            (_, None) => rng.gen_range(0..count),
            (GamePhase::Early, Some(joker)) => {
                avoid_joker(count, joker, rng, self.params.early_avoid_attempts).0
            }
            (GamePhase::Mid, Some(joker)) => {
                if rng.r#gen::<f32>() < self.params.mid_joker_target_chance {
                    joker
                } else {
                    rng.gen_range(0..count)
                }
            }
            (GamePhase::Late, Some(joker)) => {
                if rng.r#gen::<f32>() < self.params.late_joker_target_chance {
                    joker
                } else {
                    rng.gen_range(0..count)
                }
            }
        };
        Some(ActionTarget::Card(index))
    }
}

/// Draw uniformly until the slot differs from the Joker, giving up after
/// `attempts` draws. Returns the slot and the number of draws used.
fn avoid_joker<R: Rng + ?Sized>(
    count: usize,
    joker: usize,
    rng: &mut R,
    attempts: u32,
) -> (usize, u32) {
    let mut index = rng.gen_range(0..count);
    let mut used = 1;
    while index == joker && used < attempts {
        index = rng.gen_range(0..count);
        used += 1;
    }
    (index, used)
}
