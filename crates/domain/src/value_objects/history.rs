use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SaveStep;

/// One completed turn as remembered by the save line (`HISTORY.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Snapshot the instruction was played against.
    pub step: SaveStep,
    pub instruction: String,
    pub summary: String,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only turn log carried forward by every fork.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory(Vec<ConversationRecord>);

impl ConversationHistory {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, record: ConversationRecord) {
        self.0.push(record);
    }

    /// The last `limit` records, oldest first.
    pub fn recent(&self, limit: usize) -> &[ConversationRecord] {
        let start = self.0.len().saturating_sub(limit);
        &self.0[start..]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(step: u64) -> ConversationRecord {
        ConversationRecord {
            step: SaveStep::new(step),
            instruction: format!("turn {step}"),
            summary: String::new(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn recent_returns_tail_oldest_first() {
        let mut history = ConversationHistory::new();
        for step in 1..=7 {
            history.push(record(step));
        }
        let steps: Vec<u64> = history.recent(5).iter().map(|r| r.step.index()).collect();
        assert_eq!(steps, vec![3, 4, 5, 6, 7]);
        assert_eq!(history.recent(50).len(), 7);
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut history = ConversationHistory::new();
        history.push(record(1));
        let value = serde_json::to_value(&history).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["step"], "1_step");
    }
}
