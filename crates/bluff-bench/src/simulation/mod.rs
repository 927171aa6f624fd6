//! Deterministic headless sessions: two simulated hands, a scripted player and
//! the real engine, stepped on a fixed tick.

pub mod hand;
pub mod player;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bluff_bot::{
    AiActionOutcome, BluffEngine, BluffFeatures, HandCollaborator, SchedulerState, StaticSignals,
};
use bluff_core::gesture::CardId;
use bluff_core::history::HistorySnapshot;
use bluff_core::model::action::{ActionRecord, ActionSource};
use bluff_core::model::phase::{GamePhase, TableCounts};
use bluff_core::model::signal::EmotionalSignal;
use bluff_core::model::turn::TurnState;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event, info_span};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{BenchConfig, ResolvedOutputs};
use crate::logging::LoggingGuard;
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};

use hand::{SharedHand, SimCard, SimulatedHand};
use player::ScriptedPlayer;

const HAND_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;
const JOKER_ID: CardId = 999;

/// AI turns walk through three bluff-eligible beats before drawing.
const AI_TURN_BEATS: [TurnState; 3] = [
    TurnState::AiTurnApproach,
    TurnState::AiTurnHesitate,
    TurnState::AiTurnCommit,
];

pub struct SessionRunner {
    config: BenchConfig,
    outputs: ResolvedOutputs,
    logging: Option<LoggingGuard>,
    features: BluffFeatures,
}

pub struct RunSummary {
    pub sessions_played: usize,
    pub turns_played: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

/// What one session left behind, handed to analytics.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub index: usize,
    pub seed: u64,
    pub turns_played: usize,
    pub snapshot: HistorySnapshot,
    pub joker_taunts: usize,
    pub ai_phase_counts: BTreeMap<GamePhase, usize>,
    pub terminations: BTreeMap<&'static str, usize>,
    pub gestures_started: usize,
    pub final_counts: TableCounts,
}

#[derive(Debug, Serialize)]
struct ActionLogRow<'a> {
    run_id: &'a str,
    session: usize,
    session_seed: u64,
    turn: usize,
    turn_state: TurnState,
    timestamp: f32,
    source: ActionSource,
    action: &'static str,
    target_index: i32,
    phase: &'static str,
    ai_cards: usize,
    player_cards: usize,
    joker_taunt: bool,
}

impl SessionRunner {
    pub fn new(config: BenchConfig, outputs: ResolvedOutputs) -> Self {
        let env = BluffFeatures::from_env();
        let features =
            env.with_decision_details(env.decision_details() || config.logging.decision_details);
        Self {
            config,
            outputs,
            logging: None,
            features,
        }
    }

    /// Hand over the subscriber installed by `init_logging`; the run flushes
    /// it and summarises the telemetry once every session is done.
    pub fn with_logging(mut self, logging: Option<LoggingGuard>) -> Self {
        self.logging = logging;
        self
    }

    /// Run every configured session, streaming JSONL rows to disk.
    pub fn run(mut self) -> Result<RunSummary, SimulationError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let file = File::create(&self.outputs.jsonl).map_err(|source| SimulationError::Io {
            context: "creating action log",
            source,
        })?;
        let mut writer = BufWriter::new(file);
        let base_seed = self
            .config
            .sessions
            .seed
            .unwrap_or_else(|| rand::thread_rng().next_u64());
        let mut seeds = StdRng::seed_from_u64(base_seed);
        let mut analytics = AnalyticsCollector::new(&self.config.run_id);
        let mut rows_written = 0usize;
        let mut turns_played = 0usize;

        for index in 0..self.config.sessions.count {
            let seed = seeds.next_u64();
            let outcome = self.play_session(index, seed, &mut writer, &mut rows_written)?;
            turns_played += outcome.turns_played;
            analytics.record_session(&outcome);
        }

        writer.flush().map_err(|source| SimulationError::Io {
            context: "flushing action log",
            source,
        })?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;

        let telemetry_dir = self.outputs.telemetry_dir();
        let telemetry_path = self.logging.take().map(LoggingGuard::finish);
        let telemetry_outputs = match telemetry_path.as_ref() {
            Some(path) => write_summary_outputs(path, &telemetry_dir)?,
            None => None,
        };
        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            sessions_played: self.config.sessions.count,
            turns_played,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
            telemetry_outputs,
        })
    }

    fn play_session(
        &self,
        index: usize,
        seed: u64,
        writer: &mut BufWriter<File>,
        rows_written: &mut usize,
    ) -> Result<SessionOutcome, SimulationError> {
        let _span = info_span!("session", run_id = %self.config.run_id, session = index, seed)
            .entered();
        let (ai_hand, player_hand) = self.deal(seed);
        let committed: Arc<Mutex<Vec<ActionRecord>>> = Arc::new(Mutex::new(Vec::new()));

        let mut engine = BluffEngine::builder()
            .seed(seed)
            .features(self.features)
            .ai_hand(ai_hand.clone())
            .player_hand(player_hand.clone())
            .signals(self.signals(TurnState::Setup))
            .build();
        let sink = Arc::clone(&committed);
        engine.subscribe(move |record: &ActionRecord| sink.lock().push(*record));

        let mut session = Session {
            index,
            seed,
            run_id: &self.config.run_id,
            tick: self.config.sessions.tick_seconds(),
            now: 0.0,
            turn: 0,
            turns_played: 0,
            engine,
            ai_hand,
            player_hand,
            player: ScriptedPlayer::new(self.config.player.clone()),
            rng: StdRng::seed_from_u64(seed ^ HAND_SEED_SALT),
            committed,
            joker_taunts: 0,
            ai_phase_counts: BTreeMap::new(),
            terminations: BTreeMap::new(),
        };

        let turn_length = self.config.sessions.turn_length;
        for turn in 0..self.config.sessions.turns {
            if session.table_counts().total() <= 1
                || session.ai_hand.card_count() == 0
                || session.player_hand.card_count() == 0
            {
                break;
            }
            session.turn = turn;
            session.turns_played += 1;
            let player_turn = turn % 2 == 0;
            let beats: &[TurnState] = if player_turn {
                &[TurnState::PlayerTurnPick]
            } else {
                &AI_TURN_BEATS
            };

            session.engine.set_signals(self.signals(beats[0]));
            session.engine.start_monitor(session.now);
            let beat_length = turn_length / beats.len() as f32;
            for &beat in beats {
                session.engine.set_signals(self.signals(beat));
                session.run_for(beat_length, writer, rows_written)?;
            }

            let draw_state = if player_turn {
                TurnState::PlayerTurnDraw
            } else {
                TurnState::AiTurnDraw
            };
            session.engine.set_signals(self.signals(draw_state));
            session.player.cancel();
            // one tick so the monitor observes the turn change
            session.run_for(session.tick, writer, rows_written)?;
            session.draw(player_turn);
        }

        session.engine.set_signals(self.signals(TurnState::GameOver));
        session.engine.stop_monitor();
        let outcome = session.finish();
        event!(
            target: "bluff_bench::session",
            Level::INFO,
            session = outcome.index,
            seed = outcome.seed,
            turns = outcome.turns_played,
            actions = outcome.snapshot.records.len(),
            joker_taunts = outcome.joker_taunts,
            "session finished"
        );
        Ok(outcome)
    }

    /// Old Maid style deal: every non-Joker rank appears once per hand where
    /// both hands are large enough, so draws form pairs and hands shrink.
    fn deal(&self, seed: u64) -> (SharedHand, SharedHand) {
        let table = &self.config.table;
        let mut next_id: CardId = 0;
        let mut build = |count: usize| -> Vec<SimCard> {
            (0..count)
                .map(|rank| {
                    let card = SimCard::new(next_id, rank as u8);
                    next_id += 1;
                    card
                })
                .collect()
        };

        let ai_ranks = if table.ai_holds_joker {
            table.ai_cards.saturating_sub(1)
        } else {
            table.ai_cards
        };
        let mut ai_cards = build(ai_ranks);
        let mut player_cards = build(table.player_cards);
        if table.ai_holds_joker {
            ai_cards.push(SimCard::joker(JOKER_ID));
        } else if let Some(last) = player_cards.last_mut() {
            *last = SimCard::joker(JOKER_ID);
        }

        let mut ai = SimulatedHand::new(Vec::new(), seed.wrapping_add(1));
        let mut player = SimulatedHand::new(Vec::new(), seed.wrapping_add(2));
        // receive() lands each card on a random slot, so no deal-time shuffle
        // animation leaves the hands busy
        for card in ai_cards.drain(..) {
            ai.receive(card);
        }
        for card in player_cards.drain(..) {
            player.receive(card);
        }
        (SharedHand::new(ai), SharedHand::new(player))
    }

    fn signals(&self, turn: TurnState) -> StaticSignals {
        StaticSignals::new(turn)
            .with_emotion(self.config.signals.emotion().unwrap_or(EmotionalSignal::Calm))
            .with_pressure(self.config.signals.pressure)
    }
}

struct Session<'a> {
    index: usize,
    seed: u64,
    run_id: &'a str,
    tick: f32,
    now: f32,
    turn: usize,
    turns_played: usize,
    engine: BluffEngine,
    ai_hand: SharedHand,
    player_hand: SharedHand,
    player: ScriptedPlayer,
    rng: StdRng,
    committed: Arc<Mutex<Vec<ActionRecord>>>,
    joker_taunts: usize,
    ai_phase_counts: BTreeMap<GamePhase, usize>,
    terminations: BTreeMap<&'static str, usize>,
}

impl Session<'_> {
    fn table_counts(&self) -> TableCounts {
        TableCounts::new(self.ai_hand.card_count(), self.player_hand.card_count())
    }

    fn run_for(
        &mut self,
        seconds: f32,
        writer: &mut BufWriter<File>,
        rows_written: &mut usize,
    ) -> Result<(), SimulationError> {
        let steps = (seconds / self.tick).round().max(1.0) as usize;
        for _ in 0..steps {
            self.now += self.tick;
            self.ai_hand.advance(self.now);
            self.player_hand.advance(self.now);

            let was_running = self.engine.is_monitoring();
            let outcome = self.engine.tick(self.tick, self.now);
            if let Some(outcome) = outcome.as_ref() {
                *self.ai_phase_counts.entry(outcome.phase).or_insert(0) += 1;
                if outcome.joker_taunt {
                    self.joker_taunts += 1;
                }
            }
            if was_running && !self.engine.is_monitoring() {
                if let SchedulerState::Terminated(reason) = self.engine.scheduler_state() {
                    *self.terminations.entry(reason.as_str()).or_insert(0) += 1;
                }
            }

            self.player
                .tick(&mut self.engine, &self.player_hand, self.now, &mut self.rng);
            self.flush_rows(outcome.as_ref(), writer, rows_written)?;
        }
        Ok(())
    }

    fn flush_rows(
        &mut self,
        outcome: Option<&AiActionOutcome>,
        writer: &mut BufWriter<File>,
        rows_written: &mut usize,
    ) -> Result<(), SimulationError> {
        let records: Vec<ActionRecord> = std::mem::take(&mut *self.committed.lock());
        if records.is_empty() {
            return Ok(());
        }
        let counts = self.table_counts();
        let turn_state = self.engine.turn_state();
        for record in records {
            let joker_taunt = outcome.is_some_and(|o| o.record == record && o.joker_taunt);
            let row = ActionLogRow {
                run_id: self.run_id,
                session: self.index,
                session_seed: self.seed,
                turn: self.turn,
                turn_state,
                timestamp: record.timestamp(),
                source: record.source(),
                action: record.action().as_str(),
                target_index: record.target_card_index(),
                phase: counts.phase().as_str(),
                ai_cards: counts.ai_cards,
                player_cards: counts.opponent_cards,
                joker_taunt,
            };
            serde_json::to_writer(&mut *writer, &row)?;
            writer.write_all(b"\n").map_err(|source| SimulationError::Io {
                context: "writing action row",
                source,
            })?;
            *rows_written += 1;
        }
        Ok(())
    }

    /// The side whose turn it was draws a random card from the other hand and
    /// discards any pair it completes.
    fn draw(&mut self, player_turn: bool) {
        let (taker, giver) = if player_turn {
            (&self.player_hand, &self.ai_hand)
        } else {
            (&self.ai_hand, &self.player_hand)
        };
        let count = giver.card_count();
        if count == 0 {
            return;
        }
        let index = self.rng.gen_range(0..count);
        let Some(card) = giver.with(|hand| hand.take(index)) else {
            return;
        };
        taker.with(|hand| hand.receive(card));
        if let Some((first, second)) = taker.with(SimulatedHand::discard_pair) {
            self.engine.forget_card(first);
            self.engine.forget_card(second);
        }
        event!(
            target: "bluff_bench::session",
            Level::DEBUG,
            turn = self.turn,
            player_turn,
            ai_cards = self.ai_hand.card_count(),
            player_cards = self.player_hand.card_count(),
            "draw resolved"
        );
    }

    fn finish(self) -> SessionOutcome {
        SessionOutcome {
            index: self.index,
            seed: self.seed,
            turns_played: self.turns_played,
            snapshot: self.engine.snapshot(),
            joker_taunts: self.joker_taunts,
            ai_phase_counts: self.ai_phase_counts,
            terminations: self.terminations,
            gestures_started: self.player.gestures_started(),
            final_counts: TableCounts::new(
                self.ai_hand.card_count(),
                self.player_hand.card_count(),
            ),
        }
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), SimulationError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| SimulationError::Io {
            context: "creating output directory",
            source,
        })?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}
