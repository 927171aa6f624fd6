use super::params::{BluffParams, WeightRow};
use super::DecisionContext;
use bluff_core::model::action::ActionType;
use bluff_core::model::phase::GamePhase;
use bluff_core::model::signal::EmotionalSignal;
use rand::Rng;

/// Nonnegative weight per action, indexed in `ActionType::ORDERED` order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightTable([f32; 6]);

impl WeightTable {
    pub fn new(row: WeightRow) -> Self {
        let mut table = Self::default();
        for action in ActionType::ORDERED {
            table.set(action, row[action.index()]);
        }
        table
    }

    pub fn get(&self, action: ActionType) -> f32 {
        self.0[action.index()]
    }

    /// Negative or non-finite weights are stored as zero.
    pub fn set(&mut self, action: ActionType, weight: f32) {
        self.0[action.index()] = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
    }

    pub fn add(&mut self, action: ActionType, delta: f32) {
        self.set(action, self.get(action) + delta);
    }

    pub fn scale(&mut self, action: ActionType, factor: f32) {
        self.set(action, self.get(action) * factor);
    }

    pub fn total(&self) -> f32 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionType, f32)> + '_ {
        ActionType::ORDERED
            .into_iter()
            .map(move |action| (action, self.get(action)))
    }

    pub fn probability(&self, action: ActionType) -> f32 {
        let total = self.total();
        if total <= 0.0 {
            return if action == ActionType::Shuffle { 1.0 } else { 0.0 };
        }
        self.get(action) / total
    }

    /// Map a roll in `[0, total)` to an action by walking cumulative weights
    /// in fixed order. Spill past the last bucket lands on `Close`.
    pub fn resolve(&self, roll: f32) -> ActionType {
        if self.total() <= 0.0 {
            return ActionType::Shuffle;
        }
        let mut cumulative = 0.0;
        for (action, weight) in self.iter() {
            cumulative += weight;
            if roll < cumulative {
                return action;
            }
        }
        ActionType::Close
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ActionType {
        let total = self.total();
        if total <= 0.0 {
            return ActionType::Shuffle;
        }
        self.resolve(rng.r#gen::<f32>() * total)
    }

    /// Heaviest action; ties go to the earlier action in fixed order.
    pub fn dominant(&self) -> ActionType {
        let mut best = ActionType::Shuffle;
        for (action, weight) in self.iter() {
            if weight > self.get(best) {
                best = action;
            }
        }
        best
    }

    pub fn describe(&self) -> String {
        self.iter()
            .map(|(action, weight)| format!("{action}={weight:.2}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Pure scoring half of the decision: how likely the AI is to act, and which
/// gesture it reaches for.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightModel {
    params: BluffParams,
}

impl WeightModel {
    pub const fn new(params: BluffParams) -> Self {
        Self { params }
    }

    pub const fn params(&self) -> &BluffParams {
        &self.params
    }

    pub fn act_chance(&self, ctx: &DecisionContext) -> f32 {
        let p = &self.params;
        let mut chance = p.base_act_chance;

        chance += match ctx.phase() {
            GamePhase::Early => p.early_act_bonus,
            GamePhase::Mid => 0.0,
            GamePhase::Late => p.late_act_bonus,
        };

        chance += match ctx.emotion {
            EmotionalSignal::Frustrated => p.frustrated_act_bonus,
            EmotionalSignal::Pleased => p.pleased_act_bonus,
            EmotionalSignal::Anticipating => p.anticipating_act_bonus,
            EmotionalSignal::Hurt => p.hurt_act_bonus,
            EmotionalSignal::Calm | EmotionalSignal::Relieved => 0.0,
        };

        if ctx.pressure > p.pressure_high {
            chance += p.pressure_high_bonus;
        } else if ctx.pressure > p.pressure_elevated {
            chance += p.pressure_elevated_bonus;
        } else if ctx.pressure < p.pressure_low {
            chance += p.pressure_low_bonus;
        }

        if ctx.opponent_acted_recently {
            chance += p.opponent_recent_bonus;
        }
        if ctx.holds_joker() {
            chance += p.joker_act_bonus;
        }

        if !chance.is_finite() {
            return p.min_act_chance;
        }
        chance.clamp(p.min_act_chance, p.max_act_chance)
    }

    /// Weights before the repetition penalty.
    pub fn base_weights(&self, ctx: &DecisionContext) -> WeightTable {
        let p = &self.params;
        let joker = ctx.holds_joker();

        let mut table = match ctx.phase() {
            GamePhase::Early => WeightTable::new(p.early_weights),
            GamePhase::Mid => {
                let mut table = WeightTable::new(p.mid_weights);
                if joker {
                    table.set(ActionType::Push, p.mid_joker_push);
                }
                self.apply_mid_signals(&mut table, ctx);
                table
            }
            GamePhase::Late => {
                let mut table = if joker {
                    WeightTable::new(p.late_joker_weights)
                } else {
                    WeightTable::new(p.late_weights)
                };
                if ctx.counts.opponent_cards <= p.endgame_opponent_cards {
                    table.add(ActionType::Push, p.endgame_push);
                    table.add(ActionType::Wiggle, p.endgame_wiggle);
                    table.set(ActionType::Shuffle, p.endgame_shuffle);
                }
                table
            }
        };

        if ctx.opponent_acted_recently {
            match ctx.opponent_last_action {
                Some(ActionType::Shuffle) => {
                    table.add(ActionType::Shuffle, p.counter_shuffle);
                }
                Some(ActionType::Spread) => {
                    table.add(ActionType::Close, p.counter_spread_close);
                    table.add(ActionType::Shuffle, p.counter_spread_shuffle);
                }
                _ => {}
            }
        }

        table
    }

    fn apply_mid_signals(&self, table: &mut WeightTable, ctx: &DecisionContext) {
        let p = &self.params;
        match ctx.emotion {
            EmotionalSignal::Frustrated => {
                table.add(ActionType::Wiggle, p.mid_frustrated_wiggle);
                table.add(ActionType::Push, p.mid_frustrated_push);
            }
            EmotionalSignal::Pleased => {
                table.add(ActionType::Spread, p.mid_pleased_spread);
                table.add(ActionType::Shuffle, p.mid_pleased_shuffle);
            }
            EmotionalSignal::Anticipating | EmotionalSignal::Hurt => {
                table.add(ActionType::Close, p.mid_guarded_close);
                table.add(ActionType::Pull, p.mid_guarded_pull);
            }
            EmotionalSignal::Calm | EmotionalSignal::Relieved => {}
        }
        if ctx.pressure > p.pressure_high {
            table.add(ActionType::Shuffle, p.mid_pressure_shuffle);
            table.add(ActionType::Wiggle, p.mid_pressure_wiggle);
        }
    }

    /// Final table the sampler draws from.
    pub fn weights(&self, ctx: &DecisionContext) -> WeightTable {
        let mut table = self.base_weights(ctx);
        if let Some(last) = ctx.own_last_action {
            table.scale(last, self.params.repeat_penalty);
        }
        table
    }

    pub fn choose<R: Rng + ?Sized>(&self, ctx: &DecisionContext, rng: &mut R) -> ActionType {
        self.weights(ctx).sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluff_core::model::phase::TableCounts;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model() -> WeightModel {
        WeightModel::default()
    }

    fn ctx(ai: usize, opp: usize) -> DecisionContext {
        DecisionContext::new(TableCounts::new(ai, opp))
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn act_chance_stays_in_bounds_for_random_inputs() {
        let model = model();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5_000 {
            let mut c = ctx(rng.gen_range(0..20), rng.gen_range(0..20))
                .with_emotion(EmotionalSignal::ALL[rng.gen_range(0..6)])
                .with_pressure(rng.gen_range(-5.0..10.0));
            if rng.gen_bool(0.5) {
                c = c.with_joker(0);
            }
            if rng.gen_bool(0.5) {
                c = c.with_opponent(None);
            }
            let chance = model.act_chance(&c);
            assert!((0.35..=0.95).contains(&chance), "chance {chance} for {c:?}");
        }
    }

    #[test]
    fn early_calm_table_clamps_to_max() {
        let chance = model().act_chance(&ctx(10, 10));
        assert!(approx(chance, 0.95));
    }

    #[test]
    fn late_joker_endgame_chance() {
        // 0.8 - 0.10 + 0.05 + 0.10
        let c = ctx(4, 2).with_joker(1);
        assert!(approx(model().act_chance(&c), 0.85));
    }

    #[test]
    fn relieved_adds_nothing() {
        let base = model().act_chance(&ctx(6, 6).with_pressure(1.0));
        let relieved =
            model().act_chance(&ctx(6, 6).with_pressure(1.0).with_emotion(EmotionalSignal::Relieved));
        assert!(approx(base, 0.8));
        assert!(approx(relieved, base));
    }

    #[test]
    fn pressure_bonuses_are_exclusive() {
        let m = model();
        let mid = |p: f32| m.act_chance(&ctx(6, 6).with_pressure(p));
        assert!(approx(mid(2.5), 0.95));
        assert!(approx(mid(1.8), 0.90));
        assert!(approx(mid(1.0), 0.80));
        assert!(approx(mid(0.2), 0.85));
    }

    #[test]
    fn early_weights_match_table() {
        let table = model().weights(&ctx(10, 10));
        assert_eq!(table, WeightTable::new([4.0, 1.5, 0.8, 1.2, 0.7, 0.3]));
        assert_eq!(table.dominant(), ActionType::Shuffle);
    }

    #[test]
    fn mid_joker_raises_push() {
        let table = model().weights(&ctx(6, 6).with_joker(2));
        assert!(approx(table.get(ActionType::Push), 3.5));
        let table = model().weights(&ctx(6, 6));
        assert!(approx(table.get(ActionType::Push), 2.0));
    }

    #[test]
    fn mid_frustrated_and_pressure_bonuses_stack() {
        let c = ctx(6, 6)
            .with_emotion(EmotionalSignal::Frustrated)
            .with_pressure(3.0);
        let table = model().weights(&c);
        assert!(approx(table.get(ActionType::Wiggle), 2.0 + 2.5 + 0.8));
        assert!(approx(table.get(ActionType::Push), 2.0 + 2.0));
        assert!(approx(table.get(ActionType::Shuffle), 1.5 + 1.0));
    }

    #[test]
    fn mid_guarded_emotions_favor_hiding() {
        for emotion in [EmotionalSignal::Anticipating, EmotionalSignal::Hurt] {
            let table = model().weights(&ctx(6, 6).with_emotion(emotion));
            assert!(approx(table.get(ActionType::Close), 1.5));
            assert!(approx(table.get(ActionType::Pull), 2.0));
        }
    }

    #[test]
    fn emotion_bonuses_do_not_apply_outside_mid() {
        let c = ctx(10, 10).with_emotion(EmotionalSignal::Frustrated);
        assert_eq!(model().weights(&c), model().weights(&ctx(10, 10)));
    }

    #[test]
    fn late_endgame_with_joker_makes_push_dominant() {
        let table = model().weights(&ctx(4, 2).with_joker(0));
        assert!(approx(table.get(ActionType::Push), 8.0));
        assert!(approx(table.get(ActionType::Wiggle), 6.5));
        assert!(approx(table.get(ActionType::Shuffle), 0.3));
        assert_eq!(table.dominant(), ActionType::Push);
    }

    #[test]
    fn late_without_joker_uses_plain_row() {
        let table = model().weights(&ctx(3, 4));
        assert_eq!(table, WeightTable::new([0.8, 2.0, 2.5, 2.5, 0.3, 0.5]));
    }

    #[test]
    fn counter_play_requires_newest_opponent_record() {
        let m = model();
        let plain = m.weights(&ctx(10, 10));

        let countered = m.weights(&ctx(10, 10).with_opponent(Some(ActionType::Spread)));
        assert!(approx(countered.get(ActionType::Close), plain.get(ActionType::Close) + 1.5));
        assert!(approx(countered.get(ActionType::Shuffle), plain.get(ActionType::Shuffle) + 1.0));

        let shuffled = m.weights(&ctx(10, 10).with_opponent(Some(ActionType::Shuffle)));
        assert!(approx(shuffled.get(ActionType::Shuffle), plain.get(ActionType::Shuffle) + 2.0));

        let stale = m.weights(&ctx(10, 10).with_opponent(None));
        assert_eq!(stale, plain);
    }

    #[test]
    fn repetition_penalty_halves_only_last_action() {
        let m = model();
        for last in ActionType::ORDERED {
            let c = ctx(6, 6).with_joker(0).with_own_last(last);
            let base = m.base_weights(&c);
            let penalized = m.weights(&c);
            for action in ActionType::ORDERED {
                let expected = if action == last {
                    base.get(action) * 0.5
                } else {
                    base.get(action)
                };
                assert_eq!(penalized.get(action), expected);
            }
        }
    }

    #[test]
    fn resolve_walks_cumulative_weights() {
        let table = WeightTable::new([1.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        assert_eq!(table.resolve(0.0), ActionType::Shuffle);
        assert_eq!(table.resolve(0.99), ActionType::Shuffle);
        assert_eq!(table.resolve(1.0), ActionType::Push);
        assert_eq!(table.resolve(2.5), ActionType::Wiggle);
        assert_eq!(table.resolve(3.5), ActionType::Close);
        assert_eq!(table.resolve(10.0), ActionType::Close);
    }

    #[test]
    fn zero_total_falls_back_to_shuffle() {
        let table = WeightTable::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(table.sample(&mut rng), ActionType::Shuffle);
        assert_eq!(table.resolve(0.5), ActionType::Shuffle);
        assert_eq!(table.probability(ActionType::Shuffle), 1.0);
    }

    #[test]
    fn negative_weights_are_clamped() {
        let mut table = WeightTable::new([1.0; 6]);
        table.add(ActionType::Pull, -5.0);
        assert_eq!(table.get(ActionType::Pull), 0.0);
        table.set(ActionType::Push, f32::NAN);
        assert_eq!(table.get(ActionType::Push), 0.0);
    }

    #[test]
    fn empirical_frequency_tracks_weights() {
        let m = model();
        let c = ctx(6, 6).with_emotion(EmotionalSignal::Pleased).with_own_last(ActionType::Push);
        let table = m.weights(&c);
        let mut rng = StdRng::seed_from_u64(42);
        let draws = 60_000;
        let mut counts = [0usize; 6];
        for _ in 0..draws {
            counts[m.choose(&c, &mut rng).index()] += 1;
        }
        for action in ActionType::ORDERED {
            let observed = counts[action.index()] as f32 / draws as f32;
            let expected = table.probability(action);
            assert!(
                (observed - expected).abs() < 0.01,
                "{action}: observed {observed}, expected {expected}"
            );
        }
    }
}
