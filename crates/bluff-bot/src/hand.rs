use bluff_core::gesture::CardId;
use bluff_core::model::signal::EmotionalSignal;
use bluff_core::model::turn::TurnState;

/// Hand-manipulation collaborator. The engine only ever forwards intent; the
/// implementor owns animation, layout and the busy flag.
///
/// Indices are slots in the hand at call time. Implementations are expected
/// to ignore out-of-range indices, though the dispatcher validates first.
pub trait HandCollaborator: Send {
    fn shuffle(&mut self);
    fn push(&mut self, index: usize);
    fn pull(&mut self, index: usize);
    fn wiggle(&mut self, index: usize);
    fn spread_fan(&mut self);
    fn close_fan(&mut self);

    /// Return the fan spacing to its dealt width. Called on engine reset.
    fn reset_fan(&mut self) {}

    fn card_count(&self) -> usize;

    /// Slot of the Joker, `None` when this hand does not hold it.
    fn joker_index(&self) -> Option<usize>;

    /// Set while an animation is playing. Shared by AI and player paths.
    fn is_busy(&self) -> bool;

    /// Current slot of the card with stable identity `card`.
    fn index_of(&self, card: CardId) -> Option<usize>;
}

/// Opaque signals read at decision time.
pub trait SignalSource: Send {
    fn turn_state(&self) -> TurnState;

    fn emotion(&self) -> EmotionalSignal {
        EmotionalSignal::Calm
    }

    fn pressure(&self) -> f32 {
        0.0
    }
}

/// Fixed signals, handy for hosts that push updates rather than expose a
/// live source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticSignals {
    pub turn: TurnState,
    pub emotion: EmotionalSignal,
    pub pressure: f32,
}

impl StaticSignals {
    pub const fn new(turn: TurnState) -> Self {
        Self {
            turn,
            emotion: EmotionalSignal::Calm,
            pressure: 0.0,
        }
    }

    pub fn with_emotion(mut self, emotion: EmotionalSignal) -> Self {
        self.emotion = emotion;
        self
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = pressure;
        self
    }
}

impl SignalSource for StaticSignals {
    fn turn_state(&self) -> TurnState {
        self.turn
    }

    fn emotion(&self) -> EmotionalSignal {
        self.emotion
    }

    fn pressure(&self) -> f32 {
        self.pressure
    }
}
