//! What happened in a game, ply by ply.

use chess_core::{Color, Score};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::Outcome;

/// Who played and from where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub white_profile: String,
    pub black_profile: String,
    pub engine: String,
    /// `None` for the standard start position.
    pub start_fen: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Seed of the game's RNG, so a run can be replayed.
    pub seed: u64,
}

/// One half-move and the numbers behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlyRecord {
    /// 1-based.
    pub ply: u32,
    pub side: Color,
    pub uci: String,
    pub san: String,
    /// Engine score of the chosen move.
    pub objective: Score,
    /// Best engine score on offer.
    pub best: Score,
    pub best_uci: String,
    pub biased: f64,
    pub profile: String,
    /// The profile overrode the engine's first choice.
    pub bias_decided: bool,
    pub capture: bool,
    pub check: bool,
    pub castle: bool,
    pub candidates: usize,
    pub admissible: usize,
    /// Leading moves of the chosen line, in UCI text, starting with `uci`.
    #[serde(default)]
    pub pv: Vec<String>,
}

impl PlyRecord {
    /// Chosen minus best, on the centipawn axis. Zero or negative.
    pub fn delta_cp(&self) -> i64 {
        i64::from(self.objective.centipawns()) - i64::from(self.best.centipawns())
    }

    pub fn agrees_with_engine(&self) -> bool {
        self.uci == self.best_uci
    }

    /// `C`, `K`, `O` for capture, check, castle; `-` when absent.
    pub fn flags(&self) -> String {
        [
            (self.capture, 'C'),
            (self.check, 'K'),
            (self.castle, 'O'),
        ]
        .iter()
        .map(|&(set, c)| if set { c } else { '-' })
        .collect()
    }
}

/// Append-only while the game runs; immutable once an outcome is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub metadata: GameMetadata,
    plies: Vec<PlyRecord>,
    outcome: Option<Outcome>,
    /// Error text when the game was aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    abort_detail: Option<String>,
}

impl GameRecord {
    pub fn new(metadata: GameMetadata) -> Self {
        Self {
            metadata,
            plies: Vec::new(),
            outcome: None,
            abort_detail: None,
        }
    }

    pub fn plies(&self) -> &[PlyRecord] {
        &self.plies
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn abort_detail(&self) -> Option<&str> {
        self.abort_detail.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// PGN result token; `*` while unfinished.
    pub fn result(&self) -> &'static str {
        self.outcome.map_or("*", Outcome::result)
    }

    pub fn profile_for(&self, side: Color) -> &str {
        match side {
            Color::White => &self.metadata.white_profile,
            Color::Black => &self.metadata.black_profile,
        }
    }

    pub(crate) fn push(&mut self, ply: PlyRecord) {
        if self.outcome.is_none() {
            self.plies.push(ply);
        }
    }

    pub(crate) fn finish(&mut self, outcome: Outcome, detail: Option<String>) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
            self.abort_detail = detail;
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
