//! Classical Chess Engine
//!
//! Alpha-beta search with a material and placement evaluation, exposed as an
//! [`EngineGateway`] that reports a score for every legal move. Useful when
//! no external UCI engine is installed, and as a deterministic gateway in
//! tests.

mod eval;
mod search;

use chess_core::{CandidateMove, EngineError, EngineGateway, Position, SearchLimits};
use tracing::debug;

pub use eval::evaluate;
pub use search::{RootOutcome, RootScore, score_root_moves};

/// In-process gateway using negamax with alpha-beta pruning.
///
/// Searches with iterative deepening up to `limits.depth`. If the clock
/// runs out mid-iteration the last completed depth is reported; if not even
/// depth 1 completes the request times out.
#[derive(Debug, Clone)]
pub struct ClassicalGateway {
    name: String,
    /// Node counter for statistics
    nodes: u64,
}

impl ClassicalGateway {
    pub fn new() -> Self {
        Self {
            name: "Classical v1.0".to_string(),
            nodes: 0,
        }
    }

    /// Nodes searched by the last request.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }
}

impl Default for ClassicalGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineGateway for ClassicalGateway {
    fn candidates(
        &mut self,
        pos: &Position,
        max_candidates: usize,
        limits: &SearchLimits,
    ) -> Result<Vec<CandidateMove>, EngineError> {
        self.nodes = 0;
        limits.start();

        let max_depth = limits.depth.max(1);
        let mut completed: Option<(u8, Vec<RootScore>)> = None;
        for depth in 1..=max_depth {
            let outcome = score_root_moves(pos, depth, &mut self.nodes, &limits.time_control);
            if outcome.stopped {
                break;
            }
            if outcome.scores.is_empty() {
                return Err(EngineError::NoCandidates { fen: pos.to_fen() });
            }
            completed = Some((depth, outcome.scores));
        }

        let Some((depth, mut scores)) = completed else {
            return Err(EngineError::Timeout(
                limits
                    .time_control
                    .time_limit()
                    .unwrap_or_else(|| limits.time_control.elapsed()),
            ));
        };

        scores.sort_by(|a, b| b.raw.cmp(&a.raw));
        scores.truncate(max_candidates.max(1));

        debug!(
            depth,
            nodes = self.nodes,
            best = %scores[0].mv,
            score = scores[0].raw,
            "classical search finished"
        );

        Ok(scores
            .into_iter()
            .enumerate()
            .map(|(i, root)| CandidateMove {
                mv: root.mv,
                score: root.score(),
                depth,
                rank: i as u16 + 1,
                pv: vec![root.mv],
            })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        self.nodes = 0;
        Ok(())
    }
}
