use std::collections::VecDeque;

use bluff_bot::{BluffEngine, HandCollaborator};
use bluff_core::gesture::CardId;
use rand::Rng;
use rand::rngs::StdRng;

use super::hand::SharedHand;
use crate::config::PlayerConfig;

const TAP_HOLD: f32 = 0.08;
const DOUBLE_TAP_GAP: f32 = 0.06;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Tap,
    LongPress,
    DoubleTap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerStep {
    Down(CardId),
    Up(CardId),
}

/// Scripted opponent that bluffs through pointer events, the same path a
/// human player's clicks take.
#[derive(Debug)]
pub struct ScriptedPlayer {
    rates: PlayerConfig,
    queue: VecDeque<(f32, PointerStep)>,
    started: usize,
}

impl ScriptedPlayer {
    pub fn new(rates: PlayerConfig) -> Self {
        Self {
            rates,
            queue: VecDeque::new(),
            started: 0,
        }
    }

    pub fn gestures_started(&self) -> usize {
        self.started
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop queued pointer events, e.g. at a turn boundary.
    pub fn cancel(&mut self) {
        self.queue.clear();
    }

    fn roll(&self, rng: &mut StdRng) -> Option<GestureKind> {
        let roll = rng.r#gen::<f32>();
        let tap = self.rates.tap_rate;
        let long = tap + self.rates.long_press_rate;
        let double = long + self.rates.double_tap_rate;
        if roll < tap {
            Some(GestureKind::Tap)
        } else if roll < long {
            Some(GestureKind::LongPress)
        } else if roll < double {
            Some(GestureKind::DoubleTap)
        } else {
            None
        }
    }

    fn schedule(&mut self, kind: GestureKind, card: CardId, now: f32, long_press: f32) {
        let steps: &[(f32, PointerStep)] = match kind {
            GestureKind::Tap => &[
                (0.0, PointerStep::Down(card)),
                (TAP_HOLD, PointerStep::Up(card)),
            ],
            GestureKind::LongPress => &[
                (0.0, PointerStep::Down(card)),
                (long_press + TAP_HOLD, PointerStep::Up(card)),
            ],
            GestureKind::DoubleTap => &[
                (0.0, PointerStep::Down(card)),
                (DOUBLE_TAP_GAP, PointerStep::Up(card)),
                (DOUBLE_TAP_GAP * 2.0, PointerStep::Down(card)),
                (DOUBLE_TAP_GAP * 3.0, PointerStep::Up(card)),
            ],
        };
        self.queue
            .extend(steps.iter().map(|&(offset, step)| (now + offset, step)));
        self.started += 1;
    }

    /// Start a gesture when idle and the roll says so, then feed every due
    /// pointer event to the engine.
    pub fn tick(
        &mut self,
        engine: &mut BluffEngine,
        hand: &SharedHand,
        now: f32,
        rng: &mut StdRng,
    ) {
        if self.is_idle() && engine.turn_state().allows_bluff() {
            if let Some(kind) = self.roll(rng) {
                let ids = hand.card_ids();
                if !ids.is_empty() {
                    let card = ids[rng.gen_range(0..ids.len())];
                    let long_press = engine.gestures().timing().long_press;
                    self.schedule(kind, card, now, long_press);
                }
            }
        }

        while let Some(&(at, step)) = self.queue.front() {
            if at > now {
                break;
            }
            self.queue.pop_front();
            match step {
                PointerStep::Down(card) => {
                    engine.pointer_down(card, at);
                }
                PointerStep::Up(card) => match hand.index_of(card) {
                    Some(index) => {
                        engine.pointer_up(card, index, at);
                    }
                    None => engine.forget_card(card),
                },
            }
        }

        engine.poll_gestures(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::hand::{SimCard, SimulatedHand};
    use bluff_bot::StaticSignals;
    use bluff_core::model::action::{ActionSource, ActionType};
    use bluff_core::model::turn::TurnState;
    use rand::SeedableRng;

    fn rig() -> (BluffEngine, SharedHand) {
        let cards = (0..5).map(|id| SimCard::new(id, id as u8)).collect();
        let hand = SharedHand::new(SimulatedHand::new(cards, 3));
        let engine = BluffEngine::builder()
            .seed(3)
            .player_hand(hand.clone())
            .signals(StaticSignals::new(TurnState::PlayerTurnPick))
            .build();
        (engine, hand)
    }

    fn run_until_idle(player: &mut ScriptedPlayer, engine: &mut BluffEngine, hand: &SharedHand) {
        let mut rng = StdRng::seed_from_u64(0);
        let mut now = 0.0;
        while now < 3.0 {
            now += 0.02;
            hand.advance(now);
            player.tick(engine, hand, now, &mut rng);
        }
        assert!(player.is_idle());
    }

    fn scripted(kind: GestureKind) -> ScriptedPlayer {
        let mut player = ScriptedPlayer::new(PlayerConfig {
            tap_rate: 0.0,
            long_press_rate: 0.0,
            double_tap_rate: 0.0,
        });
        player.schedule(kind, 2, 0.0, 1.0);
        player
    }

    #[test]
    fn tap_lapses_into_push() {
        let (mut engine, hand) = rig();
        let mut player = scripted(GestureKind::Tap);
        run_until_idle(&mut player, &mut engine, &hand);
        let record = engine.last_record().copied().unwrap();
        assert_eq!(record.action(), ActionType::Push);
        assert_eq!(record.source(), ActionSource::Player);
        assert_eq!(record.target_card_index(), 2);
        assert_eq!(engine.total_actions(), 1);
    }

    #[test]
    fn long_press_shuffles() {
        let (mut engine, hand) = rig();
        let mut player = scripted(GestureKind::LongPress);
        run_until_idle(&mut player, &mut engine, &hand);
        assert_eq!(engine.most_used(ActionSource::Player), ActionType::Shuffle);
        assert_eq!(engine.total_actions(), 1);
    }

    #[test]
    fn double_tap_wiggles_once() {
        let (mut engine, hand) = rig();
        let mut player = scripted(GestureKind::DoubleTap);
        run_until_idle(&mut player, &mut engine, &hand);
        assert_eq!(engine.total_actions(), 1);
        assert_eq!(
            engine.last_record().map(|record| record.action()),
            Some(ActionType::Wiggle)
        );
    }

    #[test]
    fn zero_rates_never_start_gestures() {
        let (mut engine, hand) = rig();
        let mut player = ScriptedPlayer::new(PlayerConfig {
            tap_rate: 0.0,
            long_press_rate: 0.0,
            double_tap_rate: 0.0,
        });
        run_until_idle(&mut player, &mut engine, &hand);
        assert_eq!(player.gestures_started(), 0);
        assert!(engine.history().is_empty());
    }
}
