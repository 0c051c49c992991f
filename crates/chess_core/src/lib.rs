pub mod attacks;
pub mod board;
pub mod movegen;
pub mod rules;
pub mod san;
pub mod time_control;
pub mod types;
pub mod uci;

// Re-export core game logic (not engine-specific)
pub use attacks::*;
pub use board::*;
pub use movegen::*;
pub use rules::*;
pub use san::{move_to_san, san_to_move};
pub use time_control::*;
pub use types::*;
pub use uci::*;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Engine gateway: anything that can score candidate moves for a position
// =============================================================================

/// Centipawn value standing in for "mate" when scores are compared on one axis.
pub const MATE_VALUE: i32 = 100_000;

/// Objective evaluation of a move, from the side to move's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Score {
    /// Centipawns.
    Cp(i32),
    /// Mate in n moves: n > 0 the side to move mates, n <= 0 it gets mated.
    Mate(i32),
}

impl Score {
    /// Collapse onto the centipawn axis. A quicker mate scores higher, and
    /// a slower loss scores higher than a quick one.
    pub fn centipawns(self) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(n) if n > 0 => MATE_VALUE - n,
            Score::Mate(n) => -MATE_VALUE - n,
        }
    }

    /// Parse the display form back (`30`, `-12`, `#3`, `#-2`).
    pub fn parse(text: &str) -> Option<Score> {
        match text.strip_prefix('#') {
            Some(n) => n.parse().ok().map(Score::Mate),
            None => text.parse().ok().map(Score::Cp),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Cp(cp) => write!(f, "{cp}"),
            Score::Mate(n) => write!(f, "#{n}"),
        }
    }
}

/// One scored move as reported by an engine gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMove {
    pub mv: Move,
    pub score: Score,
    /// Depth the score was searched to.
    pub depth: u8,
    /// 1-based rank in the engine's own ordering.
    pub rank: u16,
    /// Principal variation starting with `mv` (may be just `mv`).
    pub pv: Vec<Move>,
}

impl CandidateMove {
    pub fn new(mv: Move, score: Score) -> Self {
        Self {
            mv,
            score,
            depth: 0,
            rank: 0,
            pv: vec![mv],
        }
    }

    /// Objective score on the centipawn axis.
    pub fn objective(&self) -> f64 {
        f64::from(self.score.centipawns())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine returned no candidates for {fen}")]
    NoCandidates { fen: String },
    #[error("malformed engine output: {0}")]
    Malformed(String),
    #[error("engine proposed {mv}, which is not legal in {fen}")]
    IllegalMove { mv: String, fen: String },
    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),
    #[error("engine process exited: {0}")]
    Crashed(String),
    #[error("engine handshake failed: {0}")]
    Handshake(String),
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait implemented by every candidate source (external UCI process,
/// in-process search, test doubles).
///
/// Implementations return candidates best-first in their own ordering and
/// must not return an empty list for a position that has legal moves.
pub trait EngineGateway: Send {
    /// Score up to `max_candidates` moves of `pos` within `limits`.
    fn candidates(
        &mut self,
        pos: &Position,
        max_candidates: usize,
        limits: &SearchLimits,
    ) -> Result<Vec<CandidateMove>, EngineError>;

    /// Name used in PGN headers and logs.
    fn name(&self) -> &str;

    /// Reset internal state for a new game.
    fn new_game(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

impl<G: EngineGateway + ?Sized> EngineGateway for Box<G> {
    fn candidates(
        &mut self,
        pos: &Position,
        max_candidates: usize,
        limits: &SearchLimits,
    ) -> Result<Vec<CandidateMove>, EngineError> {
        (**self).candidates(pos, max_candidates, limits)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        (**self).new_game()
    }
}
