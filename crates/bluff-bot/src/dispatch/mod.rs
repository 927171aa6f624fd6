//! Single funnel for every committed bluff.
//!
//! Both the AI loop and player entry points call the hand primitives through
//! here, append to the [`ActionHistory`], and notify listeners in
//! registration order.

mod player;

use crate::hand::HandCollaborator;
use bluff_core::history::ActionHistory;
use bluff_core::model::action::{ActionRecord, ActionSource, ActionTarget, ActionType};
use tracing::{Level, event};

/// Observer of committed actions.
pub trait ActionListener: Send {
    fn on_action(&mut self, record: &ActionRecord);
}

impl<F> ActionListener for F
where
    F: FnMut(&ActionRecord) + Send,
{
    fn on_action(&mut self, record: &ActionRecord) {
        self(record)
    }
}

pub struct ActionDispatcher {
    history: ActionHistory,
    listeners: Vec<Box<dyn ActionListener>>,
    player_cooldown: f32,
    last_player_action_at: Option<f32>,
    opponent_recent: bool,
    pending_selection: Option<ActionType>,
}

impl ActionDispatcher {
    pub fn new(player_cooldown: f32) -> Self {
        Self {
            history: ActionHistory::new(),
            listeners: Vec::new(),
            player_cooldown,
            last_player_action_at: None,
            opponent_recent: false,
            pending_selection: None,
        }
    }

    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: ActionListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// The player bluffed since the AI last acted.
    pub fn opponent_acted_recently(&self) -> bool {
        self.opponent_recent
    }

    pub fn clear_opponent_recent(&mut self) {
        self.opponent_recent = false;
    }

    /// The player's action when the flag is set and it is also the newest
    /// record. Counter-play only reacts to this.
    pub fn newest_opponent_action(&self) -> Option<ActionType> {
        if !self.opponent_recent {
            return None;
        }
        self.history
            .last()
            .filter(|record| record.source() == ActionSource::Player)
            .map(ActionRecord::action)
    }

    /// Record an action that has already been performed and notify listeners.
    pub fn commit(
        &mut self,
        action: ActionType,
        source: ActionSource,
        target: ActionTarget,
        now: f32,
    ) -> Option<ActionRecord> {
        let record = match ActionRecord::new(action, source, target, now) {
            Ok(record) => record,
            Err(err) => {
                event!(
                    target: "bluff_bot::dispatch",
                    Level::DEBUG,
                    action = action.as_str(),
                    source = source.as_str(),
                    error = %err,
                    "rejected malformed record"
                );
                return None;
            }
        };

        self.history.append(record);
        if source == ActionSource::Player {
            self.opponent_recent = true;
        }

        event!(
            target: "bluff_bot::dispatch",
            Level::DEBUG,
            action = action.as_str(),
            source = source.as_str(),
            target_index = record.target_card_index(),
            timestamp = now,
            "committed"
        );

        for listener in self.listeners.iter_mut() {
            listener.on_action(&record);
        }
        Some(record)
    }

    /// AI path. Validates, calls the primitive, records.
    pub fn dispatch_ai<H>(
        &mut self,
        hand: Option<&mut H>,
        action: ActionType,
        target: ActionTarget,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        let Some(hand) = hand else {
            warn_missing_hand(ActionSource::Ai, action);
            return None;
        };
        if !perform(hand, action, target) {
            return None;
        }
        self.commit(action, ActionSource::Ai, target, now)
    }

    /// Session boundary: clears history and transient player state. Listeners
    /// stay registered.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_player_action_at = None;
        self.opponent_recent = false;
        self.pending_selection = None;
    }
}

/// Call the hand primitive for `action`. Returns false when the hand is busy
/// or the target does not fit.
fn perform<H>(hand: &mut H, action: ActionType, target: ActionTarget) -> bool
where
    H: HandCollaborator + ?Sized,
{
    if hand.is_busy() {
        event!(
            target: "bluff_bot::dispatch",
            Level::DEBUG,
            action = action.as_str(),
            "hand busy"
        );
        return false;
    }

    if !target.fits(action) {
        event!(
            target: "bluff_bot::dispatch",
            Level::DEBUG,
            action = action.as_str(),
            target_index = target.index(),
            "target scope mismatch"
        );
        return false;
    }

    if let ActionTarget::Card(index) = target {
        if index >= hand.card_count() {
            event!(
                target: "bluff_bot::dispatch",
                Level::DEBUG,
                action = action.as_str(),
                target_index = index,
                card_count = hand.card_count(),
                "index out of range"
            );
            return false;
        }
    }

    match (action, target) {
        (ActionType::Shuffle, _) => hand.shuffle(),
        (ActionType::Spread, _) => hand.spread_fan(),
        (ActionType::Close, _) => hand.close_fan(),
        (ActionType::Push, ActionTarget::Card(index)) => hand.push(index),
        (ActionType::Pull, ActionTarget::Card(index)) => hand.pull(index),
        (ActionType::Wiggle, ActionTarget::Card(index)) => hand.wiggle(index),
        (ActionType::Push | ActionType::Pull | ActionType::Wiggle, ActionTarget::Global) => {
            return false;
        }
    }
    true
}

fn warn_missing_hand(source: ActionSource, action: ActionType) {
    event!(
        target: "bluff_bot::dispatch",
        Level::WARN,
        source = source.as_str(),
        action = action.as_str(),
        "hand collaborator is not attached"
    );
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bluff_core::gesture::CardId;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    pub(crate) struct RecordingHand {
        pub cards: usize,
        pub busy: bool,
        pub calls: Vec<(ActionType, Option<usize>)>,
    }

    impl RecordingHand {
        pub fn with_cards(cards: usize) -> Self {
            Self {
                cards,
                ..Self::default()
            }
        }
    }

    impl HandCollaborator for RecordingHand {
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
            None
        }
        fn is_busy(&self) -> bool {
            self.busy
        }
        fn index_of(&self, card: CardId) -> Option<usize> {
            let index = card as usize;
            (index < self.cards).then_some(index)
        }
    }

    #[test]
    fn ai_dispatch_calls_primitive_and_records() {
        let mut dispatcher = ActionDispatcher::new(1.0);
        let mut hand = RecordingHand::with_cards(5);
        let record = dispatcher
            .dispatch_ai(Some(&mut hand), ActionType::Wiggle, ActionTarget::Card(3), 2.0)
            .unwrap();
        assert_eq!(record.target_card_index(), 3);
        assert_eq!(record.source(), ActionSource::Ai);
        assert_eq!(hand.calls, vec![(ActionType::Wiggle, Some(3))]);
        assert_eq!(dispatcher.history().len(), 1);
        assert!(!dispatcher.opponent_acted_recently());
    }

    #[test]
    fn global_actions_record_minus_one() {
        let mut dispatcher = ActionDispatcher::new(1.0);
        let mut hand = RecordingHand::with_cards(5);
        for action in [ActionType::Shuffle, ActionType::Spread, ActionType::Close] {
            let record = dispatcher
                .dispatch_ai(Some(&mut hand), action, ActionTarget::Global, 0.0)
                .unwrap();
            assert_eq!(record.target_card_index(), -1);
        }
    }

    #[test]
    fn invalid_targets_are_noops() {
        let mut dispatcher = ActionDispatcher::new(1.0);
        let mut hand = RecordingHand::with_cards(3);
        assert!(
            dispatcher
                .dispatch_ai(Some(&mut hand), ActionType::Push, ActionTarget::Card(3), 0.0)
                .is_none()
        );
        assert!(
            dispatcher
                .dispatch_ai(Some(&mut hand), ActionType::Pull, ActionTarget::Global, 0.0)
                .is_none()
        );
        assert!(
            dispatcher
                .dispatch_ai(Some(&mut hand), ActionType::Shuffle, ActionTarget::Card(0), 0.0)
                .is_none()
        );
        assert!(hand.calls.is_empty());
        assert!(dispatcher.history().is_empty());
    }

    #[test]
    fn busy_hand_rejects() {
        let mut dispatcher = ActionDispatcher::new(1.0);
        let mut hand = RecordingHand::with_cards(3);
        hand.busy = true;
        assert!(
            dispatcher
                .dispatch_ai(Some(&mut hand), ActionType::Shuffle, ActionTarget::Global, 0.0)
                .is_none()
        );
        assert!(hand.calls.is_empty());
    }

    #[test]
    fn missing_hand_is_skipped() {
        let mut dispatcher = ActionDispatcher::new(1.0);
        let none: Option<&mut RecordingHand> = None;
        assert!(
            dispatcher
                .dispatch_ai(none, ActionType::Shuffle, ActionTarget::Global, 0.0)
                .is_none()
        );
        assert!(dispatcher.history().is_empty());
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let mut dispatcher = ActionDispatcher::new(1.0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            dispatcher.subscribe(move |record: &ActionRecord| {
                seen.lock().unwrap().push((tag, record.action()));
            });
        }
        dispatcher.commit(ActionType::Spread, ActionSource::Player, ActionTarget::Global, 1.0);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", ActionType::Spread), ("second", ActionType::Spread)]
        );
    }

    #[test]
    fn newest_opponent_action_requires_flag_and_latest_record() {
        let mut dispatcher = ActionDispatcher::new(1.0);
        let mut hand = RecordingHand::with_cards(4);
        dispatcher.commit(ActionType::Shuffle, ActionSource::Player, ActionTarget::Global, 0.0);
        assert_eq!(dispatcher.newest_opponent_action(), Some(ActionType::Shuffle));

        dispatcher.dispatch_ai(Some(&mut hand), ActionType::Close, ActionTarget::Global, 1.0);
        assert!(dispatcher.opponent_acted_recently());
        assert_eq!(dispatcher.newest_opponent_action(), None);

        dispatcher.clear_opponent_recent();
        dispatcher.commit(ActionType::Spread, ActionSource::Player, ActionTarget::Global, 2.0);
        dispatcher.clear_opponent_recent();
        assert_eq!(dispatcher.newest_opponent_action(), None);
    }

    #[test]
    fn reset_clears_history_but_keeps_listeners() {
        let mut dispatcher = ActionDispatcher::new(1.0);
        dispatcher.subscribe(|_: &ActionRecord| {});
        dispatcher.commit(ActionType::Spread, ActionSource::Player, ActionTarget::Global, 1.0);
        dispatcher.reset();
        assert!(dispatcher.history().is_empty());
        assert!(!dispatcher.opponent_acted_recently());
        assert_eq!(dispatcher.listener_count(), 1);
    }
}
