use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActionType {
    Shuffle = 0,
    Push = 1,
    Pull = 2,
    Wiggle = 3,
    Spread = 4,
    Close = 5,
}

impl ActionType {
    /// Fixed iteration order; also the tie-break order for weighted selection.
    pub const ORDERED: [ActionType; 6] = [
        ActionType::Shuffle,
        ActionType::Push,
        ActionType::Pull,
        ActionType::Wiggle,
        ActionType::Spread,
        ActionType::Close,
    ];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ActionType::Shuffle),
            1 => Some(ActionType::Push),
            2 => Some(ActionType::Pull),
            3 => Some(ActionType::Wiggle),
            4 => Some(ActionType::Spread),
            5 => Some(ActionType::Close),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Global actions apply to the whole hand rather than one card.
    pub const fn is_global(self) -> bool {
        matches!(
            self,
            ActionType::Shuffle | ActionType::Spread | ActionType::Close
        )
    }

    pub const fn is_targeted(self) -> bool {
        !self.is_global()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ActionType::Shuffle => "Shuffle",
            ActionType::Push => "Push",
            ActionType::Pull => "Pull",
            ActionType::Wiggle => "Wiggle",
            ActionType::Spread => "Spread",
            ActionType::Close => "Close",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseActionError(pub String);

impl fmt::Display for ParseActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown bluff action '{}'", self.0)
    }
}

impl std::error::Error for ParseActionError {}

impl FromStr for ActionType {
    type Err = ParseActionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shuffle" => Ok(ActionType::Shuffle),
            "push" => Ok(ActionType::Push),
            "pull" => Ok(ActionType::Pull),
            "wiggle" => Ok(ActionType::Wiggle),
            "spread" => Ok(ActionType::Spread),
            "close" => Ok(ActionType::Close),
            _ => Err(ParseActionError(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionSource {
    Player,
    #[serde(rename = "AI")]
    Ai,
}

impl ActionSource {
    pub const BOTH: [ActionSource; 2] = [ActionSource::Player, ActionSource::Ai];

    pub const fn as_str(self) -> &'static str {
        match self {
            ActionSource::Player => "Player",
            ActionSource::Ai => "AI",
        }
    }

    pub const fn opponent(self) -> ActionSource {
        match self {
            ActionSource::Player => ActionSource::Ai,
            ActionSource::Ai => ActionSource::Player,
        }
    }
}

impl fmt::Display for ActionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an action lands: the whole hand or a single card slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionTarget {
    Global,
    Card(usize),
}

impl ActionTarget {
    /// Wire form used by hosts and analytics: `-1` for global actions.
    /// Slots past `i32::MAX` saturate rather than wrap negative.
    pub fn index(self) -> i32 {
        match self {
            ActionTarget::Global => -1,
            ActionTarget::Card(index) => i32::try_from(index).unwrap_or(i32::MAX),
        }
    }

    pub fn from_index(index: i32) -> Self {
        if index < 0 {
            ActionTarget::Global
        } else {
            ActionTarget::Card(index as usize)
        }
    }

    pub const fn card(self) -> Option<usize> {
        match self {
            ActionTarget::Global => None,
            ActionTarget::Card(index) => Some(index),
        }
    }

    pub const fn is_global(self) -> bool {
        matches!(self, ActionTarget::Global)
    }

    /// True when the target scope agrees with the action's scope.
    pub const fn fits(self, action: ActionType) -> bool {
        action.is_global() == self.is_global()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    GlobalActionWithCard(ActionType, usize),
    TargetedActionWithoutCard(ActionType),
    NonFiniteTimestamp,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::GlobalActionWithCard(action, index) => {
                write!(f, "{action} is global but targets card {index}")
            }
            RecordError::TargetedActionWithoutCard(action) => {
                write!(f, "{action} requires a card target")
            }
            RecordError::NonFiniteTimestamp => f.write_str("timestamp must be finite"),
        }
    }
}

impl std::error::Error for RecordError {}

/// One committed bluff action. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr", into = "RecordRepr")]
pub struct ActionRecord {
    action: ActionType,
    source: ActionSource,
    target: ActionTarget,
    timestamp: f32,
}

impl ActionRecord {
    pub fn new(
        action: ActionType,
        source: ActionSource,
        target: ActionTarget,
        timestamp: f32,
    ) -> Result<Self, RecordError> {
        if !timestamp.is_finite() {
            return Err(RecordError::NonFiniteTimestamp);
        }
        match target {
            ActionTarget::Card(index) if action.is_global() => {
                Err(RecordError::GlobalActionWithCard(action, index))
            }
            ActionTarget::Global if action.is_targeted() => {
                Err(RecordError::TargetedActionWithoutCard(action))
            }
            _ => Ok(Self {
                action,
                source,
                target,
                timestamp,
            }),
        }
    }

    pub const fn action(&self) -> ActionType {
        self.action
    }

    pub const fn source(&self) -> ActionSource {
        self.source
    }

    pub const fn target(&self) -> ActionTarget {
        self.target
    }

    pub fn target_card_index(&self) -> i32 {
        self.target.index()
    }

    pub const fn timestamp(&self) -> f32 {
        self.timestamp
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordRepr {
    action_type: ActionType,
    source: ActionSource,
    target_card_index: i32,
    timestamp: f32,
}

impl From<ActionRecord> for RecordRepr {
    fn from(record: ActionRecord) -> Self {
        Self {
            action_type: record.action,
            source: record.source,
            target_card_index: record.target.index(),
            timestamp: record.timestamp,
        }
    }
}

impl TryFrom<RecordRepr> for ActionRecord {
    type Error = RecordError;

    fn try_from(repr: RecordRepr) -> Result<Self, Self::Error> {
        ActionRecord::new(
            repr.action_type,
            repr.source,
            ActionTarget::from_index(repr.target_card_index),
            repr.timestamp,
        )
    }
}
