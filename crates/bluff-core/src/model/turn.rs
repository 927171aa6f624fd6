use serde::{Deserialize, Serialize};

/// Turn states published by the host's game flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    Menu,
    Setup,
    Paused,
    PlayerTurnPick,
    PlayerTurnInterrupt,
    PlayerTurnConfirm,
    PlayerTurnCommit,
    PlayerTurnDraw,
    PlayerTurnPostReact,
    PlayerTurnResolve,
    AiTurnApproach,
    AiTurnHesitate,
    AiTurnCommit,
    AiTurnDraw,
    AiTurnReact,
    AiTurnResolve,
    Outro,
    GameOver,
}

impl TurnState {
    pub const BLUFF_ELIGIBLE: [TurnState; 4] = [
        TurnState::PlayerTurnPick,
        TurnState::AiTurnApproach,
        TurnState::AiTurnHesitate,
        TurnState::AiTurnCommit,
    ];

    /// Bluff gestures are legal only while someone is choosing a card.
    pub const fn allows_bluff(self) -> bool {
        matches!(
            self,
            TurnState::PlayerTurnPick
                | TurnState::AiTurnApproach
                | TurnState::AiTurnHesitate
                | TurnState::AiTurnCommit
        )
    }
}
