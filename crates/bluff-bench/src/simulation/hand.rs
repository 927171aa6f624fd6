use std::sync::Arc;

use bluff_bot::HandCollaborator;
use bluff_core::gesture::CardId;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Seconds a hand stays busy after any animation starts.
pub const ANIMATION_SECONDS: f32 = 0.3;

const FAN_STEP: i32 = 4;
const FAN_MIN: i32 = -8;
const FAN_MAX: i32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimCard {
    pub id: CardId,
    /// Pair key; the Joker has no partner.
    pub rank: u8,
    pub joker: bool,
    pub pushed: bool,
}

impl SimCard {
    pub const fn new(id: CardId, rank: u8) -> Self {
        Self {
            id,
            rank,
            joker: false,
            pushed: false,
        }
    }

    pub const fn joker(id: CardId) -> Self {
        Self {
            id,
            rank: u8::MAX,
            joker: true,
            pushed: false,
        }
    }
}

/// Headless stand-in for an animated hand: tracks slot order, a fan spacing
/// modifier and a busy window driven by the bench clock.
#[derive(Debug)]
pub struct SimulatedHand {
    cards: Vec<SimCard>,
    fan_modifier: i32,
    clock: f32,
    busy_until: f32,
    animations: usize,
    rng: StdRng,
}

impl SimulatedHand {
    pub fn new(cards: Vec<SimCard>, seed: u64) -> Self {
        Self {
            cards,
            fan_modifier: 0,
            clock: 0.0,
            busy_until: 0.0,
            animations: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn cards(&self) -> &[SimCard] {
        &self.cards
    }

    pub fn fan_modifier(&self) -> i32 {
        self.fan_modifier
    }

    pub fn animations(&self) -> usize {
        self.animations
    }

    pub fn advance(&mut self, now: f32) {
        self.clock = now;
    }

    fn animate(&mut self) {
        self.busy_until = self.clock + ANIMATION_SECONDS;
        self.animations += 1;
    }

    fn valid(&self, index: usize) -> bool {
        index < self.cards.len()
    }

    /// Remove the card at `index`, e.g. when the opponent draws it.
    pub fn take(&mut self, index: usize) -> Option<SimCard> {
        if !self.valid(index) {
            return None;
        }
        let mut card = self.cards.remove(index);
        card.pushed = false;
        Some(card)
    }

    /// Insert a drawn card at a random slot.
    pub fn receive(&mut self, card: SimCard) {
        let slot = self.rng.gen_range(0..=self.cards.len());
        self.cards.insert(slot, card);
    }

    /// Discard the first matching pair, returning the removed ids.
    pub fn discard_pair(&mut self) -> Option<(CardId, CardId)> {
        for first in 0..self.cards.len() {
            if self.cards[first].joker {
                continue;
            }
            let rank = self.cards[first].rank;
            let Some(offset) = self.cards[first + 1..]
                .iter()
                .position(|card| !card.joker && card.rank == rank)
            else {
                continue;
            };
            let second = self.cards.remove(first + 1 + offset);
            let first = self.cards.remove(first);
            return Some((first.id, second.id));
        }
        None
    }
}

impl HandCollaborator for SimulatedHand {
    fn shuffle(&mut self) {
        if self.cards.len() <= 1 {
            return;
        }
        self.cards.shuffle(&mut self.rng);
        self.animate();
    }

    fn push(&mut self, index: usize) {
        if let Some(card) = self.cards.get_mut(index) {
            card.pushed = true;
            self.animate();
        }
    }

    fn pull(&mut self, index: usize) {
        if let Some(card) = self.cards.get_mut(index) {
            card.pushed = false;
            self.animate();
        }
    }

    fn wiggle(&mut self, index: usize) {
        if self.valid(index) {
            self.animate();
        }
    }

    fn spread_fan(&mut self) {
        self.fan_modifier = (self.fan_modifier + FAN_STEP).clamp(FAN_MIN, FAN_MAX);
        self.animate();
    }

    fn reset_fan(&mut self) {
        self.fan_modifier = 0;
    }

    fn close_fan(&mut self) {
        self.fan_modifier = (self.fan_modifier - FAN_STEP).clamp(FAN_MIN, FAN_MAX);
        self.animate();
    }

    fn card_count(&self) -> usize {
        self.cards.len()
    }

    fn joker_index(&self) -> Option<usize> {
        self.cards.iter().position(|card| card.joker)
    }

    fn is_busy(&self) -> bool {
        self.clock < self.busy_until
    }

    fn index_of(&self, card: CardId) -> Option<usize> {
        self.cards.iter().position(|c| c.id == card)
    }
}

/// Shared handle so the runner can move cards and advance the clock while the
/// engine owns a boxed collaborator.
#[derive(Debug, Clone)]
pub struct SharedHand(Arc<Mutex<SimulatedHand>>);

impl SharedHand {
    pub fn new(hand: SimulatedHand) -> Self {
        Self(Arc::new(Mutex::new(hand)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SimulatedHand) -> R) -> R {
        f(&mut self.0.lock())
    }

    pub fn advance(&self, now: f32) {
        self.0.lock().advance(now);
    }

    pub fn card_ids(&self) -> Vec<CardId> {
        self.0.lock().cards().iter().map(|card| card.id).collect()
    }
}

impl HandCollaborator for SharedHand {
    fn shuffle(&mut self) {
        self.0.lock().shuffle();
    }

    fn push(&mut self, index: usize) {
        self.0.lock().push(index);
    }

    fn pull(&mut self, index: usize) {
        self.0.lock().pull(index);
    }

    fn wiggle(&mut self, index: usize) {
        self.0.lock().wiggle(index);
    }

    fn spread_fan(&mut self) {
        self.0.lock().spread_fan();
    }

    fn close_fan(&mut self) {
        self.0.lock().close_fan();
    }

    fn reset_fan(&mut self) {
        self.0.lock().reset_fan();
    }

    fn card_count(&self) -> usize {
        self.0.lock().card_count()
    }

    fn joker_index(&self) -> Option<usize> {
        self.0.lock().joker_index()
    }

    fn is_busy(&self) -> bool {
        self.0.lock().is_busy()
    }

    fn index_of(&self, card: CardId) -> Option<usize> {
        self.0.lock().index_of(card)
    }
}
