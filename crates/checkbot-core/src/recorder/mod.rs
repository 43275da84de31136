//! Outcome recorder: stores one terminal fact per game session, once.

pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::CoreError;

pub use sqlite::SqliteOutcomeRecorder;

/// Terminal result of one game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeFact {
    pub session_id: String,
    pub winner: String,
    /// Who won: e.g. `ai`, `human`, `draw`.
    pub winner_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_count: Option<u32>,
    pub finish_reason: String,
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeFact {
    pub fn new(
        session_id: impl Into<String>,
        winner: impl Into<String>,
        winner_kind: impl Into<String>,
        finish_reason: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            winner: winner.into(),
            winner_kind: winner_kind.into(),
            provider: None,
            model: None,
            duration_secs: None,
            move_count: None,
            finish_reason: finish_reason.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Insert-if-absent store for outcome facts.
pub trait OutcomeRecorder: Send + Sync {
    /// Persist `fact` unless its session already has one.
    ///
    /// Returns `Ok(true)` when inserted and `Ok(false)` for a duplicate;
    /// the stored fact is never overwritten.
    fn record_once(&self, fact: &OutcomeFact) -> Result<bool, CoreError>;

    fn get(&self, session_id: &str) -> Result<Option<OutcomeFact>, CoreError>;
}

/// In-process recorder for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryOutcomeRecorder {
    facts: Mutex<HashMap<String, OutcomeFact>>,
}

impl MemoryOutcomeRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutcomeRecorder for MemoryOutcomeRecorder {
    fn record_once(&self, fact: &OutcomeFact) -> Result<bool, CoreError> {
        let mut facts = self
            .facts
            .lock()
            .map_err(|_| CoreError::Storage("memory recorder lock poisoned".to_string()))?;
        match facts.entry(fact.session_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(fact.clone());
                Ok(true)
            }
        }
    }

    fn get(&self, session_id: &str) -> Result<Option<OutcomeFact>, CoreError> {
        let facts = self
            .facts
            .lock()
            .map_err(|_| CoreError::Storage("memory recorder lock poisoned".to_string()))?;
        Ok(facts.get(session_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_memory_record_once() {
        let recorder = MemoryOutcomeRecorder::new();
        let first = OutcomeFact::new("g1", "red", "ai", "no_pieces");
        let second = OutcomeFact::new("g1", "black", "human", "resign");

        assert!(recorder.record_once(&first).unwrap());
        assert!(!recorder.record_once(&second).unwrap());

        let stored = recorder.get("g1").unwrap().unwrap();
        assert_eq!(stored.winner, "red");
        assert!(recorder.get("g2").unwrap().is_none());
    }

    #[test]
    fn test_memory_concurrent_single_winner() {
        let recorder = Arc::new(MemoryOutcomeRecorder::new());
        let handles: Vec<_> = ["red", "black"]
            .into_iter()
            .map(|winner| {
                let recorder = Arc::clone(&recorder);
                std::thread::spawn(move || {
                    let fact = OutcomeFact::new("g1", winner, "ai", "no_moves");
                    (winner, recorder.record_once(&fact).unwrap())
                })
            })
            .collect();

        let results: Vec<(&str, bool)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<&str> = results.iter().filter(|(_, ok)| *ok).map(|(w, _)| *w).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(recorder.get("g1").unwrap().unwrap().winner, winners[0]);
    }

    #[test]
    fn test_fact_wire_shape() {
        let mut fact = OutcomeFact::new("g7", "black", "human", "no_pieces");
        fact.move_count = Some(42);
        let v = serde_json::to_value(&fact).unwrap();
        assert_eq!(v["sessionId"], "g7");
        assert_eq!(v["winnerKind"], "human");
        assert_eq!(v["moveCount"], 42);
        assert!(v.get("provider").is_none());
    }
}
