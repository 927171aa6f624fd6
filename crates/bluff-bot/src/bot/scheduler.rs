use super::params::BluffParams;
use super::DecisionContext;
use crate::dispatch::ActionDispatcher;
use crate::hand::{HandCollaborator, SignalSource};
use crate::policy::BluffPolicy;
use bluff_core::model::action::{ActionRecord, ActionSource, ActionType};
use bluff_core::model::phase::{GamePhase, TableCounts};
use rand::{Rng, RngCore};
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    BudgetExhausted,
    TurnEnded,
    Stopped,
    MissingHand,
}

impl TerminationReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            TerminationReason::BudgetExhausted => "budget_exhausted",
            TerminationReason::TurnEnded => "turn_ended",
            TerminationReason::Stopped => "stopped",
            TerminationReason::MissingHand => "missing_hand",
        }
    }
}

/// Every suspension point of the AI bluff loop is a state, so the loop can be
/// stopped or reset between any two ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerState {
    Idle,
    InitialDelay { remaining: f32 },
    Deciding,
    WaitingForHand,
    Cooldown { remaining: f32 },
    Terminated(TerminationReason),
}

impl SchedulerState {
    pub const fn is_running(self) -> bool {
        matches!(
            self,
            SchedulerState::InitialDelay { .. }
                | SchedulerState::Deciding
                | SchedulerState::WaitingForHand
                | SchedulerState::Cooldown { .. }
        )
    }
}

/// Emitted whenever a tick commits an AI bluff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiActionOutcome {
    pub record: ActionRecord,
    pub phase: GamePhase,
    /// Late-game misdirection: the AI pointed at its own Joker.
    pub joker_taunt: bool,
}

/// Borrowed collaborators for one tick.
pub struct TickInputs<'a> {
    pub hand: Option<&'a mut dyn HandCollaborator>,
    pub opponent_cards: usize,
    pub signals: &'a dyn SignalSource,
    pub dispatcher: &'a mut ActionDispatcher,
    pub policy: &'a mut dyn BluffPolicy,
    pub rng: &'a mut dyn RngCore,
}

#[derive(Debug, Clone)]
pub struct DecisionScheduler {
    params: BluffParams,
    state: SchedulerState,
    budget: u32,
    decisions: u32,
    acted: u32,
    last_action: Option<ActionType>,
}

impl DecisionScheduler {
    pub fn new(params: BluffParams) -> Self {
        Self {
            params,
            state: SchedulerState::Idle,
            budget: 0,
            decisions: 0,
            acted: 0,
            last_action: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn decisions(&self) -> u32 {
        self.decisions
    }

    pub fn acted(&self) -> u32 {
        self.acted
    }

    pub fn last_action(&self) -> Option<ActionType> {
        self.last_action
    }

    /// Begin a fresh monitor. A running monitor is restarted.
    pub fn start<R: Rng + ?Sized>(&mut self, counts: TableCounts, rng: &mut R) {
        if self.is_running() {
            self.stop();
        }
        let phase = counts.phase();
        let delay = draw_seconds(self.params.initial_delay(phase), rng);
        self.budget = draw_budget(self.params.budget(phase), rng);
        self.decisions = 0;
        self.acted = 0;
        self.state = SchedulerState::InitialDelay { remaining: delay };

        event!(
            target: "bluff_bot::scheduler",
            Level::DEBUG,
            stage = "started",
            phase = %phase,
            total_cards = counts.total(),
            initial_delay = delay,
            budget = self.budget,
        );
    }

    pub fn stop(&mut self) {
        if self.is_running() {
            self.terminate(TerminationReason::Stopped);
        }
    }

    /// Back to a pristine idle scheduler, forgetting the last action.
    pub fn reset(&mut self) {
        self.state = SchedulerState::Idle;
        self.budget = 0;
        self.decisions = 0;
        self.acted = 0;
        self.last_action = None;
    }

    /// Advance by `dt` seconds. Leftover time after a delay expires is not
    /// carried into the decision.
    pub fn tick(&mut self, dt: f32, now: f32, io: TickInputs<'_>) -> Option<AiActionOutcome> {
        match self.state {
            SchedulerState::Idle | SchedulerState::Terminated(_) => None,
            SchedulerState::InitialDelay { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.state = SchedulerState::InitialDelay { remaining };
                    return None;
                }
                self.state = SchedulerState::Deciding;
                self.decide(now, io)
            }
            SchedulerState::Cooldown { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.state = SchedulerState::Cooldown { remaining };
                    return None;
                }
                self.state = SchedulerState::Deciding;
                self.decide(now, io)
            }
            SchedulerState::Deciding | SchedulerState::WaitingForHand => self.decide(now, io),
        }
    }

    fn decide(&mut self, now: f32, io: TickInputs<'_>) -> Option<AiActionOutcome> {
        let TickInputs {
            hand,
            opponent_cards,
            signals,
            dispatcher,
            policy,
            rng,
        } = io;

        if !signals.turn_state().allows_bluff() {
            self.terminate(TerminationReason::TurnEnded);
            return None;
        }

        let Some(hand) = hand else {
            event!(
                target: "bluff_bot::scheduler",
                Level::WARN,
                stage = "missing_hand",
                "AI hand collaborator is not attached"
            );
            self.terminate(TerminationReason::MissingHand);
            return None;
        };

        if hand.is_busy() {
            self.state = SchedulerState::WaitingForHand;
            return None;
        }
        self.state = SchedulerState::Deciding;

        let counts = TableCounts::new(hand.card_count(), opponent_cards);
        let mut ctx = DecisionContext::new(counts);
        ctx.joker_index = hand.joker_index();
        ctx.emotion = signals.emotion();
        ctx.pressure = signals.pressure();
        ctx.opponent_acted_recently = dispatcher.opponent_acted_recently();
        ctx.opponent_last_action = dispatcher.newest_opponent_action();
        ctx.own_last_action = self.last_action;

        let act_chance = policy.act_chance(&ctx);
        let roll = rng.r#gen::<f32>();
        let mut outcome = None;
        let mut chosen = None;
        let mut target = None;

        if roll < act_chance {
            let action = policy.choose_action(&ctx, rng);
            chosen = Some(action);
            target = policy.choose_target(action, &ctx, rng);
            if let Some(target) = target {
                let record = dispatcher.dispatch_ai(Some(&mut *hand), action, target, now);
                if let Some(record) = record {
                    self.last_action = Some(action);
                    self.acted += 1;
                    dispatcher.clear_opponent_recent();
                    let joker_taunt = ctx.phase() == GamePhase::Late
                        && ctx.joker_index.is_some()
                        && target.card() == ctx.joker_index;
                    outcome = Some(AiActionOutcome {
                        record,
                        phase: ctx.phase(),
                        joker_taunt,
                    });
                }
            }
        }

        log_decision(&ctx, act_chance, roll, chosen, target, outcome.as_ref());

        self.decisions += 1;
        if self.decisions >= self.budget {
            self.terminate(TerminationReason::BudgetExhausted);
        } else {
            let counts = TableCounts::new(hand.card_count(), opponent_cards);
            let cooldown = draw_seconds(self.params.cooldown(counts.phase()), rng);
            self.state = SchedulerState::Cooldown {
                remaining: cooldown,
            };
        }
        outcome
    }

    fn terminate(&mut self, reason: TerminationReason) {
        self.state = SchedulerState::Terminated(reason);
        event!(
            target: "bluff_bot::scheduler",
            Level::DEBUG,
            stage = "terminated",
            reason = reason.as_str(),
            decisions = self.decisions,
            acted = self.acted,
            budget = self.budget,
        );
    }
}

fn draw_seconds<R: Rng + ?Sized>((lo, hi): (f32, f32), rng: &mut R) -> f32 {
    if hi <= lo {
        return lo.max(0.0);
    }
    rng.gen_range(lo..=hi)
}

fn draw_budget<R: Rng + ?Sized>((lo, hi): (u32, u32), rng: &mut R) -> u32 {
    if hi <= lo {
        return lo;
    }
    rng.gen_range(lo..hi)
}

fn log_decision(
    ctx: &DecisionContext,
    act_chance: f32,
    roll: f32,
    chosen: Option<ActionType>,
    target: Option<bluff_core::model::action::ActionTarget>,
    outcome: Option<&AiActionOutcome>,
) {
    if !tracing::enabled!(Level::INFO) {
        return;
    }

    let reason = match (chosen, target, outcome) {
        (None, _, _) => "skipped",
        (Some(_), None, _) => "no_target",
        (Some(_), Some(_), None) => "rejected",
        (Some(_), Some(_), Some(_)) => "acted",
    };
    let action = chosen.map(ActionType::as_str).unwrap_or("-");

    event!(
        target: "bluff_bot::decision",
        Level::INFO,
        source = ActionSource::Ai.as_str(),
        phase = ctx.phase().as_str(),
        total_cards = ctx.total_cards(),
        ai_cards = ctx.ai_cards(),
        opponent_cards = ctx.counts.opponent_cards,
        act_chance,
        roll,
        acted = outcome.is_some(),
        action,
        target_index = target.map(|t| t.index()).unwrap_or(-1),
        holds_joker = ctx.holds_joker(),
        joker_taunt = outcome.is_some_and(|o| o.joker_taunt),
        emotion = ctx.emotion.as_str(),
        pressure = ctx.pressure,
        opponent_recent = ctx.opponent_acted_recently,
        reason,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::StaticSignals;
    use crate::policy::HeuristicBluffPolicy;
    use crate::bot::BluffFeatures;
    use bluff_core::gesture::CardId;
    use bluff_core::model::action::ActionTarget;
    use bluff_core::model::turn::TurnState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Default)]
    struct FakeHand {
        cards: usize,
        joker: Option<usize>,
        busy: bool,
        calls: Vec<(ActionType, Option<usize>)>,
    }

    impl HandCollaborator for FakeHand {
        fn shuffle(&mut self) {
            self.calls.push((ActionType::Shuffle, None));
        }
        fn push(&mut self, index: usize) {
            self.calls.push((ActionType::Push, Some(index)));
        }
        fn pull(&mut self, index: usize) {
            self.calls.push((ActionType::Pull, Some(index)));
        }
        fn wiggle(&mut self, index: usize) {
            self.calls.push((ActionType::Wiggle, Some(index)));
        }
        fn spread_fan(&mut self) {
            self.calls.push((ActionType::Spread, None));
        }
        fn close_fan(&mut self) {
            self.calls.push((ActionType::Close, None));
        }
        fn card_count(&self) -> usize {
            self.cards
        }
        fn joker_index(&self) -> Option<usize> {
            self.joker
        }
        fn is_busy(&self) -> bool {
            self.busy
        }
        fn index_of(&self, card: CardId) -> Option<usize> {
            let index = card as usize;
            (index < self.cards).then_some(index)
        }
    }

    /// Always acts, always the same gesture.
    struct FixedPolicy(ActionType);

    impl BluffPolicy for FixedPolicy {
        fn act_chance(&self, _ctx: &DecisionContext) -> f32 {
            1.0
        }
        fn choose_action(&mut self, _ctx: &DecisionContext, _rng: &mut dyn RngCore) -> ActionType {
            self.0
        }
        fn choose_target(
            &mut self,
            action: ActionType,
            _ctx: &DecisionContext,
            _rng: &mut dyn RngCore,
        ) -> Option<ActionTarget> {
            if action.is_global() {
                Some(ActionTarget::Global)
            } else {
                Some(ActionTarget::Card(0))
            }
        }
    }

    struct Rig {
        scheduler: DecisionScheduler,
        hand: FakeHand,
        signals: StaticSignals,
        dispatcher: ActionDispatcher,
        policy: Box<dyn BluffPolicy>,
        rng: StdRng,
        opponent_cards: usize,
    }

    impl Rig {
        fn new(cards: usize, opponent_cards: usize, policy: Box<dyn BluffPolicy>) -> Self {
            Self {
                scheduler: DecisionScheduler::new(BluffParams::default()),
                hand: FakeHand {
                    cards,
                    ..FakeHand::default()
                },
                signals: StaticSignals::new(TurnState::AiTurnApproach),
                dispatcher: ActionDispatcher::new(1.0),
                policy,
                rng: StdRng::seed_from_u64(21),
                opponent_cards,
            }
        }

        fn start(&mut self) {
            let counts = TableCounts::new(self.hand.cards, self.opponent_cards);
            self.scheduler.start(counts, &mut self.rng);
        }

        fn tick(&mut self, dt: f32, now: f32) -> Option<AiActionOutcome> {
            let io = TickInputs {
                hand: Some(&mut self.hand),
                opponent_cards: self.opponent_cards,
                signals: &self.signals,
                dispatcher: &mut self.dispatcher,
                policy: self.policy.as_mut(),
                rng: &mut self.rng,
            };
            self.scheduler.tick(dt, now, io)
        }

        /// Tick in 0.1s steps until the scheduler stops or `limit` elapses.
        fn run(&mut self, limit: f32) -> Vec<AiActionOutcome> {
            let mut outcomes = Vec::new();
            let mut now = 0.0;
            while now < limit && !matches!(self.scheduler.state(), SchedulerState::Terminated(_)) {
                now += 0.1;
                outcomes.extend(self.tick(0.1, now));
            }
            outcomes
        }
    }

    #[test]
    fn start_draws_delay_and_budget_by_phase() {
        let mut rng = StdRng::seed_from_u64(4);
        let params = BluffParams::default();
        for (counts, budget_range, delay_range) in [
            (TableCounts::new(10, 10), 6..10, (1.0, 2.5)),
            (TableCounts::new(5, 5), 4..7, (1.5, 4.0)),
            (TableCounts::new(3, 2), 2..5, (1.5, 4.0)),
        ] {
            for _ in 0..50 {
                let mut scheduler = DecisionScheduler::new(params);
                scheduler.start(counts, &mut rng);
                assert!(budget_range.contains(&scheduler.budget()));
                let SchedulerState::InitialDelay { remaining } = scheduler.state() else {
                    panic!("expected initial delay");
                };
                assert!(remaining >= delay_range.0 && remaining <= delay_range.1);
            }
        }
    }

    #[test]
    fn budget_bounds_decisions() {
        let mut rig = Rig::new(10, 10, Box::new(FixedPolicy(ActionType::Push)));
        rig.start();
        let budget = rig.scheduler.budget();
        let outcomes = rig.run(200.0);
        assert_eq!(
            rig.scheduler.state(),
            SchedulerState::Terminated(TerminationReason::BudgetExhausted)
        );
        assert_eq!(rig.scheduler.decisions(), budget);
        assert_eq!(outcomes.len() as u32, budget);
        assert_eq!(rig.dispatcher.history().len() as u32, budget);
        assert_eq!(rig.hand.calls.len() as u32, budget);
    }

    #[test]
    fn ineligible_turn_terminates_without_dispatch() {
        let mut rig = Rig::new(10, 10, Box::new(FixedPolicy(ActionType::Shuffle)));
        rig.signals = StaticSignals::new(TurnState::PlayerTurnDraw);
        rig.start();
        let outcomes = rig.run(20.0);
        assert!(outcomes.is_empty());
        assert!(rig.hand.calls.is_empty());
        assert_eq!(
            rig.scheduler.state(),
            SchedulerState::Terminated(TerminationReason::TurnEnded)
        );
    }

    #[test]
    fn busy_hand_defers_decision() {
        let mut rig = Rig::new(10, 10, Box::new(FixedPolicy(ActionType::Shuffle)));
        rig.hand.busy = true;
        rig.start();
        for step in 1..60 {
            assert!(rig.tick(0.1, step as f32 * 0.1).is_none());
        }
        assert_eq!(rig.scheduler.state(), SchedulerState::WaitingForHand);
        assert_eq!(rig.scheduler.decisions(), 0);

        rig.hand.busy = false;
        let outcome = rig.tick(0.1, 6.0).unwrap();
        assert_eq!(outcome.record.action(), ActionType::Shuffle);
        assert_eq!(outcome.record.source(), ActionSource::Ai);
        assert_eq!(rig.scheduler.decisions(), 1);
    }

    #[test]
    fn missing_hand_terminates() {
        let mut scheduler = DecisionScheduler::new(BluffParams::default());
        let mut rng = StdRng::seed_from_u64(1);
        scheduler.start(TableCounts::new(5, 5), &mut rng);
        let signals = StaticSignals::new(TurnState::AiTurnCommit);
        let mut dispatcher = ActionDispatcher::new(1.0);
        let mut policy = FixedPolicy(ActionType::Close);
        let io = TickInputs {
            hand: None,
            opponent_cards: 5,
            signals: &signals,
            dispatcher: &mut dispatcher,
            policy: &mut policy,
            rng: &mut rng,
        };
        assert!(scheduler.tick(10.0, 10.0, io).is_none());
        assert_eq!(
            scheduler.state(),
            SchedulerState::Terminated(TerminationReason::MissingHand)
        );
    }

    #[test]
    fn acting_clears_opponent_flag_and_remembers_action() {
        let mut rig = Rig::new(10, 10, Box::new(FixedPolicy(ActionType::Wiggle)));
        rig.dispatcher.commit(ActionType::Spread, ActionSource::Player, ActionTarget::Global, 0.0);
        assert!(rig.dispatcher.opponent_acted_recently());
        rig.start();
        let outcomes = rig.run(5.0);
        assert!(!outcomes.is_empty());
        assert!(!rig.dispatcher.opponent_acted_recently());
        assert_eq!(rig.scheduler.last_action(), Some(ActionType::Wiggle));
        assert_eq!(outcomes[0].record.target_card_index(), 0);
    }

    #[test]
    fn stop_and_reset_between_ticks() {
        let mut rig = Rig::new(10, 10, Box::new(FixedPolicy(ActionType::Push)));
        rig.start();
        rig.run(5.0);
        assert!(rig.scheduler.last_action().is_some());
        rig.scheduler.stop();
        assert_eq!(
            rig.scheduler.state(),
            SchedulerState::Terminated(TerminationReason::Stopped)
        );
        assert!(rig.tick(10.0, 100.0).is_none());

        rig.scheduler.reset();
        assert_eq!(rig.scheduler.state(), SchedulerState::Idle);
        assert_eq!(rig.scheduler.last_action(), None);
        assert_eq!(rig.scheduler.decisions(), 0);
    }

    #[test]
    fn restart_draws_fresh_budget() {
        let mut rig = Rig::new(10, 10, Box::new(FixedPolicy(ActionType::Push)));
        rig.start();
        rig.run(3.0);
        rig.start();
        assert_eq!(rig.scheduler.decisions(), 0);
        assert!(matches!(rig.scheduler.state(), SchedulerState::InitialDelay { .. }));
    }

    #[test]
    fn late_joker_target_flags_taunt() {
        let mut rig = Rig::new(4, 2, Box::new(FixedPolicy(ActionType::Push)));
        rig.hand.joker = Some(0);
        rig.start();
        let outcomes = rig.run(60.0);
        assert!(!outcomes.is_empty());
        assert!(outcomes.iter().all(|o| o.joker_taunt && o.phase == GamePhase::Late));
    }

    #[test]
    fn heuristic_policy_runs_full_monitor() {
        let policy = HeuristicBluffPolicy::new(BluffParams::default(), BluffFeatures::default());
        let mut rig = Rig::new(10, 10, Box::new(policy));
        rig.start();
        let outcomes = rig.run(200.0);
        assert_eq!(
            rig.scheduler.state(),
            SchedulerState::Terminated(TerminationReason::BudgetExhausted)
        );
        assert!(outcomes.len() as u32 <= rig.scheduler.budget());
        for outcome in &outcomes {
            let record = outcome.record;
            assert_eq!(record.target().is_global(), record.action().is_global());
            if let Some(index) = record.target().card() {
                assert!(index < 10);
            }
        }
    }
}
