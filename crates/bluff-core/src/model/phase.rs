use core::fmt;
use serde::{Deserialize, Serialize};

pub const EARLY_MIN_CARDS: usize = 15;
pub const MID_MIN_CARDS: usize = 8;

/// Game stage derived from the cards left across both hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    Early,
    Mid,
    Late,
}

impl GamePhase {
    pub const fn from_total_cards(total: usize) -> Self {
        if total >= EARLY_MIN_CARDS {
            GamePhase::Early
        } else if total >= MID_MIN_CARDS {
            GamePhase::Mid
        } else {
            GamePhase::Late
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            GamePhase::Early => "Early",
            GamePhase::Mid => "Mid",
            GamePhase::Late => "Late",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hand sizes sampled at decision time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableCounts {
    pub ai_cards: usize,
    pub opponent_cards: usize,
}

impl TableCounts {
    pub const fn new(ai_cards: usize, opponent_cards: usize) -> Self {
        Self {
            ai_cards,
            opponent_cards,
        }
    }

    pub const fn total(self) -> usize {
        self.ai_cards + self.opponent_cards
    }

    pub const fn phase(self) -> GamePhase {
        GamePhase::from_total_cards(self.total())
    }
}
