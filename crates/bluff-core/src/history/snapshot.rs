use super::{ActionHistory, DEFAULT_RECENT_WINDOW};
use crate::model::action::{ActionRecord, ActionSource, ActionType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: ActionSource,
    pub count: usize,
    pub frequency: BTreeMap<ActionType, usize>,
    pub most_used: Option<ActionType>,
    pub recent: usize,
}

/// Read-only projection handed to end-of-session analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub records: Vec<ActionRecord>,
    pub sources: Vec<SourceSummary>,
}

impl HistorySnapshot {
    pub fn capture(history: &ActionHistory) -> Self {
        let sources = ActionSource::BOTH
            .iter()
            .map(|&source| SourceSummary {
                source,
                count: history.count_by_source(source),
                frequency: history.frequency(source),
                most_used: history.most_used_checked(source),
                recent: history.recent_count(source, DEFAULT_RECENT_WINDOW),
            })
            .collect();

        Self {
            records: history.records().to_vec(),
            sources,
        }
    }

    pub fn source(&self, source: ActionSource) -> Option<&SourceSummary> {
        self.sources.iter().find(|summary| summary.source == source)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
