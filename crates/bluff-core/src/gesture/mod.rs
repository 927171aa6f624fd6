//! Player-side gesture recognition.
//!
//! Each interactive card runs a small press/click state machine. Releases are
//! classified by hold duration and click count into the same action
//! vocabulary the opponent AI uses:
//!
//! * hold for at least `long_press` → `Shuffle` (whole hand)
//! * two releases inside `double_click_window` → `Wiggle` on the card
//! * one release whose window lapses → `Push`, or `Pull` when the card is
//!   already pushed forward

use crate::model::action::{ActionTarget, ActionType};
use std::collections::BTreeMap;

/// Stable identity of a card, independent of its current slot in the hand.
pub type CardId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureTiming {
    pub long_press: f32,
    pub double_click_window: f32,
}

impl Default for GestureTiming {
    fn default() -> Self {
        Self {
            long_press: 1.0,
            double_click_window: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    PointerDown,
    LongPress,
    ClickPending,
}

/// A classified gesture, still keyed by card identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub card: CardId,
    pub action: ActionType,
    pub at: f32,
}

impl Gesture {
    /// Whether this gesture needs the card's slot index to dispatch.
    pub const fn needs_slot(&self) -> bool {
        self.action.is_targeted()
    }

    pub fn target_for_slot(&self, slot: Option<usize>) -> Option<ActionTarget> {
        if self.action.is_global() {
            return Some(ActionTarget::Global);
        }
        slot.map(ActionTarget::Card)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CardGestureState {
    pressed_at: Option<f32>,
    clicks: u8,
    last_click_at: f32,
    window_deadline: Option<f32>,
    pushed: bool,
}

impl CardGestureState {
    fn clear_clicks(&mut self) {
        self.clicks = 0;
        self.window_deadline = None;
    }
}

#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    timing: GestureTiming,
    cards: BTreeMap<CardId, CardGestureState>,
}

impl GestureClassifier {
    pub fn new(timing: GestureTiming) -> Self {
        Self {
            timing,
            cards: BTreeMap::new(),
        }
    }

    pub fn timing(&self) -> GestureTiming {
        self.timing
    }

    pub fn pointer_down(&mut self, card: CardId, now: f32) -> Vec<Gesture> {
        let state = self.cards.entry(card).or_default();
        let mut emitted = Vec::new();
        settle(card, state, now, &mut emitted);
        state.pressed_at = Some(now);
        emitted
    }

    /// Classify a release. Returns gestures in the order they happened: a
    /// lapsed single click on this card first, then whatever this release
    /// completes.
    pub fn pointer_up(&mut self, card: CardId, now: f32) -> Vec<Gesture> {
        let timing = self.timing;
        let mut emitted = Vec::new();
        let Some(state) = self.cards.get_mut(&card) else {
            return emitted;
        };
        settle(card, state, now, &mut emitted);

        let Some(pressed_at) = state.pressed_at.take() else {
            return emitted;
        };

        if now - pressed_at >= timing.long_press {
            state.clear_clicks();
            emitted.push(Gesture {
                card,
                action: ActionType::Shuffle,
                at: now,
            });
            return emitted;
        }

        state.clicks = state.clicks.saturating_add(1);
        let since_last = now - state.last_click_at;
        state.last_click_at = now;

        if state.clicks >= 2 && since_last <= timing.double_click_window {
            state.clear_clicks();
            emitted.push(Gesture {
                card,
                action: ActionType::Wiggle,
                at: now,
            });
        } else {
            state.clicks = 1;
            state.window_deadline = Some(now + timing.double_click_window);
        }
        emitted
    }

    /// Resolve every click window that has lapsed by `now`.
    pub fn poll(&mut self, now: f32) -> Vec<Gesture> {
        let mut emitted = Vec::new();
        for (&card, state) in self.cards.iter_mut() {
            settle(card, state, now, &mut emitted);
        }
        emitted
    }

    pub fn phase(&self, card: CardId, now: f32) -> GesturePhase {
        let Some(state) = self.cards.get(&card) else {
            return GesturePhase::Idle;
        };
        match (state.pressed_at, state.window_deadline) {
            (Some(pressed_at), _) if now - pressed_at >= self.timing.long_press => {
                GesturePhase::LongPress
            }
            (Some(_), _) => GesturePhase::PointerDown,
            (None, Some(_)) => GesturePhase::ClickPending,
            (None, None) => GesturePhase::Idle,
        }
    }

    pub fn is_pushed(&self, card: CardId) -> bool {
        self.cards.get(&card).is_some_and(|state| state.pushed)
    }

    /// Drop state for a card that left the hand.
    pub fn forget(&mut self, card: CardId) {
        self.cards.remove(&card);
    }

    pub fn reset(&mut self) {
        self.cards.clear();
    }
}

fn settle(card: CardId, state: &mut CardGestureState, now: f32, out: &mut Vec<Gesture>) {
    let Some(deadline) = state.window_deadline else {
        return;
    };
    if now < deadline {
        return;
    }
    if state.clicks == 1 {
        let action = if state.pushed {
            ActionType::Pull
        } else {
            ActionType::Push
        };
        state.pushed = !state.pushed;
        out.push(Gesture {
            card,
            action,
            at: deadline,
        });
    }
    state.clear_clicks();
}
