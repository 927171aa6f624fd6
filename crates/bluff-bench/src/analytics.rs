use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bluff_core::model::action::{ActionSource, ActionType};
use bluff_core::model::phase::GamePhase;
use serde::Serialize;
use thiserror::Error;

use crate::simulation::SessionOutcome;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("no sessions were recorded for run '{0}'")]
    NoSessions(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Folds per-session history snapshots into run-level source reports.
pub struct AnalyticsCollector {
    run_id: String,
    sessions: usize,
    turns: usize,
    sources: BTreeMap<&'static str, SourceAccumulator>,
    joker_taunts: usize,
    gestures_started: usize,
    ai_phase_counts: BTreeMap<GamePhase, usize>,
    terminations: BTreeMap<&'static str, usize>,
}

impl AnalyticsCollector {
    pub fn new(run_id: &str) -> Self {
        let sources = ActionSource::BOTH
            .iter()
            .map(|&source| (source.as_str(), SourceAccumulator::new(source)))
            .collect();
        Self {
            run_id: run_id.to_string(),
            sessions: 0,
            turns: 0,
            sources,
            joker_taunts: 0,
            gestures_started: 0,
            ai_phase_counts: BTreeMap::new(),
            terminations: BTreeMap::new(),
        }
    }

    pub fn record_session(&mut self, outcome: &SessionOutcome) {
        self.sessions += 1;
        self.turns += outcome.turns_played;
        self.joker_taunts += outcome.joker_taunts;
        self.gestures_started += outcome.gestures_started;
        for (&phase, &count) in &outcome.ai_phase_counts {
            *self.ai_phase_counts.entry(phase).or_insert(0) += count;
        }
        for (&reason, &count) in &outcome.terminations {
            *self.terminations.entry(reason).or_insert(0) += count;
        }
        for summary in &outcome.snapshot.sources {
            if let Some(acc) = self.sources.get_mut(summary.source.as_str()) {
                acc.count += summary.count;
                acc.recent += summary.recent;
                for (&action, &count) in &summary.frequency {
                    *acc.frequency.entry(action).or_insert(0) += count;
                }
                if let Some(most_used) = summary.most_used {
                    *acc.session_favourites.entry(most_used).or_insert(0) += 1;
                }
            }
        }
    }

    pub fn finalize(self) -> Result<AnalyticsSummary, AnalyticsError> {
        if self.sessions == 0 {
            return Err(AnalyticsError::NoSessions(self.run_id));
        }
        let sessions = self.sessions;
        let sources = self
            .sources
            .into_values()
            .map(|acc| acc.into_report(sessions))
            .collect();
        Ok(AnalyticsSummary {
            run_id: self.run_id,
            sessions,
            turns: self.turns,
            sources,
            joker_taunts: self.joker_taunts,
            gestures_started: self.gestures_started,
            ai_phase_counts: self.ai_phase_counts,
            terminations: self.terminations,
        })
    }
}

struct SourceAccumulator {
    source: ActionSource,
    count: usize,
    recent: usize,
    frequency: BTreeMap<ActionType, usize>,
    session_favourites: BTreeMap<ActionType, usize>,
}

impl SourceAccumulator {
    fn new(source: ActionSource) -> Self {
        Self {
            source,
            count: 0,
            recent: 0,
            frequency: BTreeMap::new(),
            session_favourites: BTreeMap::new(),
        }
    }

    fn into_report(self, sessions: usize) -> SourceReport {
        SourceReport {
            source: self.source,
            actions: self.count,
            avg_per_session: self.count as f64 / sessions as f64,
            avg_recent: self.recent as f64 / sessions as f64,
            most_used: most_used(&self.frequency),
            frequency: self.frequency,
            session_favourites: self.session_favourites,
        }
    }
}

/// Ties resolve to the earliest action in declaration order.
fn most_used(frequency: &BTreeMap<ActionType, usize>) -> Option<ActionType> {
    let mut best: Option<(ActionType, usize)> = None;
    for (&action, &count) in frequency {
        if count == 0 {
            continue;
        }
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((action, count));
        }
    }
    best.map(|(action, _)| action)
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source: ActionSource,
    pub actions: usize,
    pub avg_per_session: f64,
    /// Mean count inside the trailing recent window at session end.
    pub avg_recent: f64,
    pub most_used: Option<ActionType>,
    pub frequency: BTreeMap<ActionType, usize>,
    pub session_favourites: BTreeMap<ActionType, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub run_id: String,
    pub sessions: usize,
    pub turns: usize,
    pub sources: Vec<SourceReport>,
    pub joker_taunts: usize,
    pub gestures_started: usize,
    pub ai_phase_counts: BTreeMap<GamePhase, usize>,
    pub terminations: BTreeMap<&'static str, usize>,
}

impl AnalyticsSummary {
    pub fn source(&self, source: ActionSource) -> Option<&SourceReport> {
        self.sources.iter().find(|report| report.source == source)
    }

    pub fn render_markdown(&self) -> String {
        let mut rows = String::new();
        rows.push_str("# Bluff Bench Summary\n\n");
        rows.push_str(&format!(
            "Run `{}`: {} sessions, {} turns\n\n",
            self.run_id, self.sessions, self.turns
        ));

        rows.push_str("| Source | Actions | Avg / session | Most used | Avg recent | Shuffle | Push | Pull | Wiggle | Spread | Close |\n");
        rows.push_str("|--------|---------|---------------|-----------|------------|---------|------|------|--------|--------|-------|\n");
        for report in &self.sources {
            let most_used = report
                .most_used
                .map(ActionType::as_str)
                .unwrap_or("-");
            let mut line = format!(
                "| {} | {} | {:.2} | {} | {:.2} |",
                report.source, report.actions, report.avg_per_session, most_used, report.avg_recent
            );
            for action in ActionType::ORDERED {
                let count = report.frequency.get(&action).copied().unwrap_or(0);
                line.push_str(&format!(" {} |", count));
            }
            rows.push_str(&line);
            rows.push('\n');
        }

        rows.push_str("\n## AI Bluffs\n");
        rows.push_str(&format!("- Joker taunts: {}\n", self.joker_taunts));
        if self.ai_phase_counts.is_empty() {
            rows.push_str("- Actions by phase: <none>\n");
        } else {
            rows.push_str("- Actions by phase:\n");
            for (phase, count) in &self.ai_phase_counts {
                rows.push_str(&format!("  - {}: {}\n", phase, count));
            }
        }
        if !self.terminations.is_empty() {
            rows.push_str("- Monitor terminations:\n");
            for (reason, count) in &self.terminations {
                rows.push_str(&format!("  - {}: {}\n", reason, count));
            }
        }

        rows.push_str("\n## Player Gestures\n");
        rows.push_str(&format!("- Scripted gestures started: {}\n", self.gestures_started));
        rows
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        fs::write(path.as_ref(), self.render_markdown()).map_err(|source| AnalyticsError::Io {
            context: "writing summary markdown",
            source,
        })
    }
}
