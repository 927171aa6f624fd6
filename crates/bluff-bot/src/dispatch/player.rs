use super::{ActionDispatcher, perform, warn_missing_hand};
use crate::hand::HandCollaborator;
use bluff_core::model::action::{ActionRecord, ActionSource, ActionTarget, ActionType};
use bluff_core::model::turn::TurnState;
use tracing::{Level, event};

impl ActionDispatcher {
    pub fn player_cooldown(&self) -> f32 {
        self.player_cooldown
    }

    /// Gate shared by every player entry point: hand present and idle, no
    /// card selection pending, cooldown elapsed, and a bluff-eligible turn.
    pub fn can_player_act<H>(&self, turn: TurnState, hand: Option<&H>, now: f32) -> bool
    where
        H: HandCollaborator + ?Sized,
    {
        let Some(hand) = hand else {
            return false;
        };
        if hand.is_busy() || self.pending_selection.is_some() {
            return false;
        }
        if let Some(last) = self.last_player_action_at {
            if now - last < self.player_cooldown {
                return false;
            }
        }
        turn.allows_bluff()
    }

    pub fn player_action<H>(
        &mut self,
        turn: TurnState,
        hand: Option<&mut H>,
        action: ActionType,
        target: ActionTarget,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        let Some(hand) = hand else {
            warn_missing_hand(ActionSource::Player, action);
            return None;
        };
        if !self.can_player_act(turn, Some(&*hand), now) {
            event!(
                target: "bluff_bot::dispatch",
                Level::DEBUG,
                action = action.as_str(),
                turn = ?turn,
                "player action gated"
            );
            return None;
        }
        self.perform_player(hand, action, target, now)
    }

    fn perform_player<H>(
        &mut self,
        hand: &mut H,
        action: ActionType,
        target: ActionTarget,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        if !perform(hand, action, target) {
            return None;
        }
        self.last_player_action_at = Some(now);
        self.commit(action, ActionSource::Player, target, now)
    }

    pub fn player_shuffle<H>(
        &mut self,
        turn: TurnState,
        hand: Option<&mut H>,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        self.player_action(turn, hand, ActionType::Shuffle, ActionTarget::Global, now)
    }

    pub fn player_push<H>(
        &mut self,
        turn: TurnState,
        hand: Option<&mut H>,
        index: usize,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        self.player_action(turn, hand, ActionType::Push, ActionTarget::Card(index), now)
    }

    pub fn player_pull<H>(
        &mut self,
        turn: TurnState,
        hand: Option<&mut H>,
        index: usize,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        self.player_action(turn, hand, ActionType::Pull, ActionTarget::Card(index), now)
    }

    pub fn player_wiggle<H>(
        &mut self,
        turn: TurnState,
        hand: Option<&mut H>,
        index: usize,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        self.player_action(turn, hand, ActionType::Wiggle, ActionTarget::Card(index), now)
    }

    pub fn player_spread<H>(
        &mut self,
        turn: TurnState,
        hand: Option<&mut H>,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        self.player_action(turn, hand, ActionType::Spread, ActionTarget::Global, now)
    }

    pub fn player_close<H>(
        &mut self,
        turn: TurnState,
        hand: Option<&mut H>,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        self.player_action(turn, hand, ActionType::Close, ActionTarget::Global, now)
    }

    /// Arm a targeted action; the next `select_card` performs it. Global
    /// actions are rejected.
    pub fn begin_card_selection(&mut self, action: ActionType) -> bool {
        if action.is_global() {
            return false;
        }
        self.pending_selection = Some(action);
        true
    }

    pub fn select_card<H>(
        &mut self,
        turn: TurnState,
        hand: Option<&mut H>,
        index: usize,
        now: f32,
    ) -> Option<ActionRecord>
    where
        H: HandCollaborator + ?Sized,
    {
        let action = self.pending_selection.take()?;
        self.player_action(turn, hand, action, ActionTarget::Card(index), now)
    }

    pub fn cancel_card_selection(&mut self) {
        self.pending_selection = None;
    }

    pub fn is_selecting_card(&self) -> bool {
        self.pending_selection.is_some()
    }

    pub fn pending_selection(&self) -> Option<ActionType> {
        self.pending_selection
    }
}
