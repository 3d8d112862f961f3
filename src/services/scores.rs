use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::game::types::PlayerId;

/// Failure of a score read or write. Callers recover with a default or a
/// silent skip; score errors never reach players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreError(pub String);

impl std::fmt::Display for ScoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "score store error: {}", self.0)
    }
}

/// One entry on a ranked board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub identity: PlayerId,
    pub name: String,
    pub score: i64,
}

/// Ranked counter store, read-modify-written by sessions on decisive wins.
///
/// The read and write are two separate calls on purpose: concurrent wins by
/// the same identity across different sessions can lose updates if the
/// backing service is not transactional. Known consistency gap.
pub trait ScoreStore: Send + Sync {
    fn read_score(&self, board: &str, identity: &PlayerId) -> Result<Option<i64>, ScoreError>;

    fn write_score(
        &self,
        board: &str,
        identity: &PlayerId,
        name: &str,
        score: i64,
    ) -> Result<(), ScoreError>;
}

/// In-memory score store keyed by (board, identity).
#[derive(Default)]
pub struct InMemoryScores {
    records: Mutex<HashMap<(String, PlayerId), ScoreRecord>>,
}

impl InMemoryScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records on one board, highest score first.
    pub fn list_board(&self, board: &str) -> Vec<ScoreRecord> {
        let records = match self.records.lock() {
            Ok(records) => records,
            Err(_) => return Vec::new(),
        };
        let mut rows: Vec<ScoreRecord> = records
            .iter()
            .filter(|((b, _), _)| b == board)
            .map(|(_, record)| record.clone())
            .collect();
        rows.sort_by(|a, b| b.score.cmp(&a.score));
        rows
    }
}

impl ScoreStore for InMemoryScores {
    fn read_score(&self, board: &str, identity: &PlayerId) -> Result<Option<i64>, ScoreError> {
        let records = self
            .records
            .lock()
            .map_err(|_| ScoreError("poisoned".to_string()))?;
        Ok(records
            .get(&(board.to_string(), *identity))
            .map(|record| record.score))
    }

    fn write_score(
        &self,
        board: &str,
        identity: &PlayerId,
        name: &str,
        score: i64,
    ) -> Result<(), ScoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| ScoreError("poisoned".to_string()))?;
        records.insert(
            (board.to_string(), *identity),
            ScoreRecord {
                identity: *identity,
                name: name.to_string(),
                score,
            },
        );
        Ok(())
    }
}
