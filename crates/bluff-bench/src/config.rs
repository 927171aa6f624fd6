use bluff_core::model::signal::EmotionalSignal;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_TICK_MS: u64 = 50;
const DEFAULT_TURN_LENGTH: f32 = 12.0;
const MAX_CARDS_PER_HAND: usize = 26;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root bench configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchConfig {
    pub run_id: String,
    pub sessions: SessionConfig,
    pub table: TableConfig,
    #[serde(default)]
    pub signals: SignalConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.sessions.validate()?;
        self.table.validate()?;
        self.signals.validate()?;
        self.player.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve `{run_id}` placeholders into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }
}

/// Session sampling block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub seed: Option<u64>,
    pub count: usize,
    pub turns: usize,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Seconds each turn stays bluff-eligible.
    #[serde(default = "default_turn_length")]
    pub turn_length: f32,
}

impl SessionConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(invalid("sessions.count", "number of sessions must be greater than zero"));
        }
        if self.turns == 0 {
            return Err(invalid("sessions.turns", "turns per session must be greater than zero"));
        }
        if self.tick_ms == 0 || self.tick_ms > 1_000 {
            return Err(invalid("sessions.tick_ms", "tick must be between 1 and 1000 ms"));
        }
        if !self.turn_length.is_finite() || self.turn_length <= 0.0 {
            return Err(invalid("sessions.turn_length", "turn length must be positive"));
        }
        Ok(())
    }

    pub fn tick_seconds(&self) -> f32 {
        self.tick_ms as f32 / 1_000.0
    }
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_turn_length() -> f32 {
    DEFAULT_TURN_LENGTH
}

/// Opening hand sizes.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TableConfig {
    pub ai_cards: usize,
    pub player_cards: usize,
    #[serde(default = "default_true")]
    pub ai_holds_joker: bool,
}

impl TableConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (label, value) in [
            ("table.ai_cards", self.ai_cards),
            ("table.player_cards", self.player_cards),
        ] {
            if value == 0 {
                return Err(invalid(label, "hand must start with at least one card"));
            }
            if value > MAX_CARDS_PER_HAND {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: format!("hand may hold at most {MAX_CARDS_PER_HAND} cards"),
                });
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

/// Static opponent signals fed to the engine.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SignalConfig {
    #[serde(default = "default_emotion")]
    pub emotion: String,
    #[serde(default)]
    pub pressure: f32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            emotion: default_emotion(),
            pressure: 0.0,
        }
    }
}

impl SignalConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Err(err) = self.emotion.parse::<EmotionalSignal>() {
            return Err(invalid("signals.emotion", &err.to_string()));
        }
        if !self.pressure.is_finite() || self.pressure < 0.0 {
            return Err(invalid("signals.pressure", "pressure must be a non-negative number"));
        }
        Ok(())
    }

    pub fn emotion(&self) -> Option<EmotionalSignal> {
        self.emotion.parse().ok()
    }
}

fn default_emotion() -> String {
    "calm".to_string()
}

/// Scripted player behaviour: per-tick probabilities of starting a gesture.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_tap_rate")]
    pub tap_rate: f32,
    #[serde(default = "default_long_press_rate")]
    pub long_press_rate: f32,
    #[serde(default = "default_double_tap_rate")]
    pub double_tap_rate: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tap_rate: default_tap_rate(),
            long_press_rate: default_long_press_rate(),
            double_tap_rate: default_double_tap_rate(),
        }
    }
}

impl PlayerConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (label, value) in [
            ("player.tap_rate", self.tap_rate),
            ("player.long_press_rate", self.long_press_rate),
            ("player.double_tap_rate", self.double_tap_rate),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(invalid(label, "rate must be within [0, 1]"));
            }
        }
        if self.tap_rate + self.long_press_rate + self.double_tap_rate > 1.0 {
            return Err(invalid("player", "gesture rates must sum to at most 1"));
        }
        Ok(())
    }
}

fn default_tap_rate() -> f32 {
    0.02
}

fn default_long_press_rate() -> f32 {
    0.005
}

fn default_double_tap_rate() -> f32 {
    0.01
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(label, "path must not be empty"));
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(invalid(label, "resolved path is invalid"));
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    #[serde(default)]
    pub decision_details: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            decision_details: false,
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(invalid("run_id", "run_id must not be empty"));
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(invalid(
            "run_id",
            "run_id may only contain alphanumeric characters, '.', '_' or '-'",
        ));
    }

    Ok(())
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

impl ResolvedOutputs {
    /// Directory holding the summary; telemetry files land next to it.
    pub fn telemetry_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
