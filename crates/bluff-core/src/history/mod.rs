mod snapshot;

pub use snapshot::{HistorySnapshot, SourceSummary};

use crate::model::action::{ActionRecord, ActionSource, ActionType};
use std::collections::BTreeMap;

/// Window used by the "recent bluffs" query when the caller has no preference.
pub const DEFAULT_RECENT_WINDOW: usize = 5;

/// Append-only log of committed bluff actions for one session.
#[derive(Debug, Clone, Default)]
pub struct ActionHistory {
    records: Vec<ActionRecord>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, record: ActionRecord) {
        self.records.push(record);
    }

    /// Drops every record. Only valid at a session boundary.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&ActionRecord> {
        self.records.last()
    }

    pub fn last_by(&self, source: ActionSource) -> Option<&ActionRecord> {
        self.records
            .iter()
            .rev()
            .find(|record| record.source() == source)
    }

    pub fn count_by_source(&self, source: ActionSource) -> usize {
        self.records
            .iter()
            .filter(|record| record.source() == source)
            .count()
    }

    pub fn frequency(&self, source: ActionSource) -> BTreeMap<ActionType, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.source() == source) {
            *counts.entry(record.action()).or_insert(0) += 1;
        }
        counts
    }

    /// Most frequent action for `source`. Ties go to the earlier action in
    /// `ActionType::ORDERED`; an empty history reports `Shuffle`.
    pub fn most_used(&self, source: ActionSource) -> ActionType {
        self.most_used_checked(source).unwrap_or(ActionType::Shuffle)
    }

    pub fn most_used_checked(&self, source: ActionSource) -> Option<ActionType> {
        let counts = self.frequency(source);
        let mut best: Option<(ActionType, usize)> = None;
        for action in ActionType::ORDERED {
            let count = counts.get(&action).copied().unwrap_or(0);
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((action, count)),
            }
        }
        best.map(|(action, _)| action)
    }

    /// The trailing `window` records, oldest first.
    pub fn recent(&self, window: usize) -> &[ActionRecord] {
        let start = self.records.len().saturating_sub(window);
        &self.records[start..]
    }

    /// How many of the trailing `window` records came from `source`.
    pub fn recent_count(&self, source: ActionSource, window: usize) -> usize {
        self.recent(window)
            .iter()
            .filter(|record| record.source() == source)
            .count()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::capture(self)
    }
}
