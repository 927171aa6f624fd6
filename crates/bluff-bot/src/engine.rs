use crate::bot::{
    AiActionOutcome, BluffFeatures, BluffParams, DecisionScheduler, SchedulerState, TickInputs,
};
use crate::dispatch::{ActionDispatcher, ActionListener};
use crate::hand::{HandCollaborator, SignalSource, StaticSignals};
use crate::policy::{BluffPolicy, HeuristicBluffPolicy};
use bluff_core::gesture::{CardId, Gesture, GestureClassifier, GestureTiming};
use bluff_core::history::{ActionHistory, HistorySnapshot};
use bluff_core::model::action::{ActionRecord, ActionSource, ActionType};
use bluff_core::model::phase::TableCounts;
use bluff_core::model::turn::TurnState;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use tracing::{Level, event};

/// Owns the bluff loop, the player gesture path and the shared history.
pub struct BluffEngine {
    params: BluffParams,
    ai_hand: Option<Box<dyn HandCollaborator>>,
    player_hand: Option<Box<dyn HandCollaborator>>,
    signals: Box<dyn SignalSource>,
    policy: Box<dyn BluffPolicy>,
    dispatcher: ActionDispatcher,
    scheduler: DecisionScheduler,
    gestures: GestureClassifier,
    rng: StdRng,
}

#[derive(Default)]
pub struct BluffEngineBuilder {
    seed: Option<u64>,
    params: Option<BluffParams>,
    features: Option<BluffFeatures>,
    timing: Option<GestureTiming>,
    ai_hand: Option<Box<dyn HandCollaborator>>,
    player_hand: Option<Box<dyn HandCollaborator>>,
    signals: Option<Box<dyn SignalSource>>,
    policy: Option<Box<dyn BluffPolicy>>,
}

impl BluffEngineBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn params(mut self, params: BluffParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn features(mut self, features: BluffFeatures) -> Self {
        self.features = Some(features);
        self
    }

    pub fn gesture_timing(mut self, timing: GestureTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn ai_hand(mut self, hand: impl HandCollaborator + 'static) -> Self {
        self.ai_hand = Some(Box::new(hand));
        self
    }

    pub fn player_hand(mut self, hand: impl HandCollaborator + 'static) -> Self {
        self.player_hand = Some(Box::new(hand));
        self
    }

    pub fn signals(mut self, signals: impl SignalSource + 'static) -> Self {
        self.signals = Some(Box::new(signals));
        self
    }

    pub fn policy(mut self, policy: impl BluffPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Unset collaborators are allowed; the engine logs and skips whatever
    /// needs them. Missing signals default to a static `Menu` turn.
    pub fn build(self) -> BluffEngine {
        let features = self.features.unwrap_or_default();
        let params = features.apply(self.params.unwrap_or_default());
        let policy = self
            .policy
            .unwrap_or_else(|| Box::new(HeuristicBluffPolicy::new(params, features)));
        let signals = self
            .signals
            .unwrap_or_else(|| Box::new(StaticSignals::new(TurnState::Menu)));
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        BluffEngine {
            params,
            ai_hand: self.ai_hand,
            player_hand: self.player_hand,
            signals,
            policy,
            dispatcher: ActionDispatcher::new(params.player_cooldown),
            scheduler: DecisionScheduler::new(params),
            gestures: GestureClassifier::new(self.timing.unwrap_or_default()),
            rng,
        }
    }
}

impl BluffEngine {
    pub fn builder() -> BluffEngineBuilder {
        BluffEngineBuilder::default()
    }

    pub fn params(&self) -> &BluffParams {
        &self.params
    }

    pub fn turn_state(&self) -> TurnState {
        self.signals.turn_state()
    }

    pub fn set_signals(&mut self, signals: impl SignalSource + 'static) {
        self.signals = Box::new(signals);
    }

    pub fn set_ai_hand(&mut self, hand: Option<Box<dyn HandCollaborator>>) {
        self.ai_hand = hand;
    }

    pub fn set_player_hand(&mut self, hand: Option<Box<dyn HandCollaborator>>) {
        self.player_hand = hand;
    }

    fn opponent_cards(&self) -> usize {
        self.player_hand
            .as_ref()
            .map(|hand| hand.card_count())
            .unwrap_or(0)
    }

    // === AI loop ===

    /// Start (or restart) the AI bluff monitor. Returns false when no AI hand
    /// is attached.
    pub fn start_monitor(&mut self, now: f32) -> bool {
        let Some(ai_cards) = self.ai_hand.as_ref().map(|hand| hand.card_count()) else {
            event!(
                target: "bluff_bot::scheduler",
                Level::WARN,
                now,
                "cannot start bluff monitor without an AI hand"
            );
            return false;
        };
        let counts = TableCounts::new(ai_cards, self.opponent_cards());
        self.scheduler.start(counts, &mut self.rng);
        true
    }

    pub fn stop_monitor(&mut self) {
        self.scheduler.stop();
    }

    pub fn is_monitoring(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn scheduler(&self) -> &DecisionScheduler {
        &self.scheduler
    }

    pub fn last_ai_action(&self) -> Option<ActionType> {
        self.scheduler.last_action()
    }

    pub fn tick(&mut self, dt: f32, now: f32) -> Option<AiActionOutcome> {
        let opponent_cards = self.opponent_cards();
        let io = TickInputs {
            hand: self
                .ai_hand
                .as_mut()
                .map(|hand| &mut **hand as &mut dyn HandCollaborator),
            opponent_cards,
            signals: &*self.signals,
            dispatcher: &mut self.dispatcher,
            policy: &mut *self.policy,
            rng: &mut self.rng,
        };
        self.scheduler.tick(dt, now, io)
    }

    // === Player gestures ===

    /// Pointer pressed on `card`. May settle a lapsed click on the same card.
    pub fn pointer_down(&mut self, card: CardId, now: f32) -> Vec<ActionRecord> {
        let gestures = self.gestures.pointer_down(card, now);
        self.route_gestures(gestures, None)
    }

    /// Pointer released on `card`, currently at slot `index`.
    pub fn pointer_up(&mut self, card: CardId, index: usize, now: f32) -> Vec<ActionRecord> {
        let gestures = self.gestures.pointer_up(card, now);
        if !self.turn_state().allows_bluff() {
            if !gestures.is_empty() {
                event!(
                    target: "bluff_bot::gesture",
                    Level::INFO,
                    card,
                    turn = ?self.turn_state(),
                    dropped = gestures.len(),
                    "gesture outside bluff window"
                );
            }
            return Vec::new();
        }
        self.route_gestures(gestures, Some((card, index)))
    }

    /// Resolve lapsed click windows.
    pub fn poll_gestures(&mut self, now: f32) -> Vec<ActionRecord> {
        let gestures = self.gestures.poll(now);
        self.route_gestures(gestures, None)
    }

    pub fn gestures(&self) -> &GestureClassifier {
        &self.gestures
    }

    pub fn forget_card(&mut self, card: CardId) {
        self.gestures.forget(card);
    }

    fn route_gestures(
        &mut self,
        gestures: Vec<Gesture>,
        slot_hint: Option<(CardId, usize)>,
    ) -> Vec<ActionRecord> {
        let mut records = Vec::new();
        for gesture in gestures {
            let slot = match slot_hint {
                Some((card, index)) if card == gesture.card => Some(index),
                _ => self
                    .player_hand
                    .as_ref()
                    .and_then(|hand| hand.index_of(gesture.card)),
            };

            event!(
                target: "bluff_bot::gesture",
                Level::INFO,
                card = gesture.card,
                action = gesture.action.as_str(),
                at = gesture.at,
                slot = ?slot,
                "classified"
            );

            let Some(target) = gesture.target_for_slot(slot) else {
                continue;
            };
            let turn = self.turn_state();
            let hand = self.player_hand.as_deref_mut();
            if let Some(record) =
                self.dispatcher
                    .player_action(turn, hand, gesture.action, target, gesture.at)
            {
                records.push(record);
            }
        }
        records
    }

    // === Player entry points ===

    pub fn can_player_act(&self, now: f32) -> bool {
        self.dispatcher.can_player_act(
            self.signals.turn_state(),
            self.player_hand.as_deref(),
            now,
        )
    }

    pub fn player_shuffle(&mut self, now: f32) -> Option<ActionRecord> {
        self.player_global(ActionType::Shuffle, now)
    }

    pub fn player_spread(&mut self, now: f32) -> Option<ActionRecord> {
        self.player_global(ActionType::Spread, now)
    }

    pub fn player_close(&mut self, now: f32) -> Option<ActionRecord> {
        self.player_global(ActionType::Close, now)
    }

    pub fn player_push(&mut self, index: usize, now: f32) -> Option<ActionRecord> {
        self.player_targeted(ActionType::Push, index, now)
    }

    pub fn player_pull(&mut self, index: usize, now: f32) -> Option<ActionRecord> {
        self.player_targeted(ActionType::Pull, index, now)
    }

    pub fn player_wiggle(&mut self, index: usize, now: f32) -> Option<ActionRecord> {
        self.player_targeted(ActionType::Wiggle, index, now)
    }

    fn player_global(&mut self, action: ActionType, now: f32) -> Option<ActionRecord> {
        let turn = self.signals.turn_state();
        let hand = self.player_hand.as_deref_mut();
        match action {
            ActionType::Spread => self.dispatcher.player_spread(turn, hand, now),
            ActionType::Close => self.dispatcher.player_close(turn, hand, now),
            _ => self.dispatcher.player_shuffle(turn, hand, now),
        }
    }

    fn player_targeted(
        &mut self,
        action: ActionType,
        index: usize,
        now: f32,
    ) -> Option<ActionRecord> {
        let turn = self.signals.turn_state();
        let hand = self.player_hand.as_deref_mut();
        match action {
            ActionType::Pull => self.dispatcher.player_pull(turn, hand, index, now),
            ActionType::Wiggle => self.dispatcher.player_wiggle(turn, hand, index, now),
            _ => self.dispatcher.player_push(turn, hand, index, now),
        }
    }

    /// Button flow: arm a targeted action, then pick the card.
    pub fn begin_card_selection(&mut self, action: ActionType, now: f32) -> bool {
        self.can_player_act(now) && self.dispatcher.begin_card_selection(action)
    }

    pub fn select_card(&mut self, index: usize, now: f32) -> Option<ActionRecord> {
        let turn = self.signals.turn_state();
        let hand = self.player_hand.as_deref_mut();
        self.dispatcher.select_card(turn, hand, index, now)
    }

    pub fn cancel_card_selection(&mut self) {
        self.dispatcher.cancel_card_selection();
    }

    pub fn is_selecting_card(&self) -> bool {
        self.dispatcher.is_selecting_card()
    }

    // === Events and queries ===

    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: ActionListener + 'static,
    {
        self.dispatcher.subscribe(listener);
    }

    pub fn history(&self) -> &ActionHistory {
        self.dispatcher.history()
    }

    pub fn total_actions(&self) -> usize {
        self.history().len()
    }

    pub fn count_by_source(&self, source: ActionSource) -> usize {
        self.history().count_by_source(source)
    }

    pub fn frequency(&self, source: ActionSource) -> BTreeMap<ActionType, usize> {
        self.history().frequency(source)
    }

    pub fn most_used(&self, source: ActionSource) -> ActionType {
        self.history().most_used(source)
    }

    pub fn recent_count(&self, source: ActionSource, window: usize) -> usize {
        self.history().recent_count(source, window)
    }

    pub fn last_record(&self) -> Option<&ActionRecord> {
        self.history().last()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        self.history().snapshot()
    }

    /// Session boundary: stops the monitor, cancels card selection, clears
    /// history, scheduler and gesture state and resets both fans. Listeners
    /// stay registered.
    pub fn reset(&mut self) {
        self.scheduler.stop();
        self.scheduler.reset();
        self.dispatcher.reset();
        self.gestures.reset();
        for hand in [self.ai_hand.as_deref_mut(), self.player_hand.as_deref_mut()]
            .into_iter()
            .flatten()
        {
            hand.reset_fan();
        }
        event!(target: "bluff_bot::scheduler", Level::DEBUG, stage = "reset");
    }
}
