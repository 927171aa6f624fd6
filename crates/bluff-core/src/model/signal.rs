use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Emotional state reported by the opponent's psychology layer. Opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EmotionalSignal {
    #[default]
    Calm,
    Anticipating,
    Pleased,
    Frustrated,
    Hurt,
    Relieved,
}

impl EmotionalSignal {
    pub const ALL: [EmotionalSignal; 6] = [
        EmotionalSignal::Calm,
        EmotionalSignal::Anticipating,
        EmotionalSignal::Pleased,
        EmotionalSignal::Frustrated,
        EmotionalSignal::Hurt,
        EmotionalSignal::Relieved,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            EmotionalSignal::Calm => "Calm",
            EmotionalSignal::Anticipating => "Anticipating",
            EmotionalSignal::Pleased => "Pleased",
            EmotionalSignal::Frustrated => "Frustrated",
            EmotionalSignal::Hurt => "Hurt",
            EmotionalSignal::Relieved => "Relieved",
        }
    }
}

impl fmt::Display for EmotionalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSignalError(pub String);

impl fmt::Display for ParseSignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown emotion '{}'", self.0)
    }
}

impl std::error::Error for ParseSignalError {}

impl FromStr for EmotionalSignal {
    type Err = ParseSignalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "calm" => Ok(EmotionalSignal::Calm),
            "anticipating" => Ok(EmotionalSignal::Anticipating),
            "pleased" => Ok(EmotionalSignal::Pleased),
            "frustrated" => Ok(EmotionalSignal::Frustrated),
            "hurt" => Ok(EmotionalSignal::Hurt),
            "relieved" => Ok(EmotionalSignal::Relieved),
            _ => Err(ParseSignalError(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_label() {
        for signal in EmotionalSignal::ALL {
            assert_eq!(signal.as_str().parse::<EmotionalSignal>(), Ok(signal));
        }
        assert_eq!(" HURT ".parse::<EmotionalSignal>(), Ok(EmotionalSignal::Hurt));
        let err = "bored".parse::<EmotionalSignal>().unwrap_err();
        assert_eq!(err, ParseSignalError("bored".to_string()));
        assert_eq!(err.to_string(), "unknown emotion 'bored'");
    }
}
