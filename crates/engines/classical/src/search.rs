//! Negamax search with alpha-beta pruning, scoring every root move.

use chess_core::{MATE_VALUE, Move, Position, Score, TimeControl, is_threefold, legal_moves_into};

use crate::eval::evaluate;

/// Scores within this distance of `MATE_VALUE` encode a forced mate.
const MATE_BOUND: i32 = MATE_VALUE - 1_000;

/// One root move with its exact negamax score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootScore {
    pub mv: Move,
    /// Centipawns from the root side's view; mates are `MATE_VALUE - ply`.
    pub raw: i32,
}

impl RootScore {
    /// Convert the raw search value into a `Score`, turning mate distances
    /// in plies into full moves.
    pub fn score(self) -> Score {
        if self.raw >= MATE_BOUND {
            let plies = MATE_VALUE - self.raw;
            Score::Mate((plies + 1) / 2)
        } else if self.raw <= -MATE_BOUND {
            let plies = MATE_VALUE + self.raw;
            Score::Mate(-(plies / 2))
        } else {
            Score::Cp(self.raw)
        }
    }
}

/// Result of scoring all root moves at one depth.
pub struct RootOutcome {
    /// Root moves in generation order. Empty if there are no legal moves.
    pub scores: Vec<RootScore>,
    /// True if the clock ran out before every root move was scored.
    pub stopped: bool,
}

/// Score every legal move of `pos` to `depth` plies.
///
/// Each root move gets a full window so the scores are exact and can be
/// compared against each other, not just against the best one.
pub fn score_root_moves(
    pos: &Position,
    depth: u8,
    nodes: &mut u64,
    tc: &TimeControl,
) -> RootOutcome {
    let mut tmp = pos.clone();
    let mut moves = Vec::with_capacity(64);
    legal_moves_into(&mut tmp, &mut moves);

    let mut history = Vec::with_capacity(depth as usize + 1);
    history.push(tmp.key());

    let mut scores = Vec::with_capacity(moves.len());
    for mv in moves {
        if tc.check_time() {
            return RootOutcome {
                scores,
                stopped: true,
            };
        }

        let undo = tmp.make_move(mv);
        history.push(tmp.key());
        *nodes += 1;

        let (score, was_stopped) = negamax(
            &mut tmp,
            depth.saturating_sub(1),
            1,
            -MATE_VALUE,
            MATE_VALUE,
            &mut history,
            nodes,
            tc,
        );

        history.pop();
        tmp.unmake_move(mv, undo);

        if was_stopped {
            return RootOutcome {
                scores,
                stopped: true,
            };
        }
        scores.push(RootScore { mv, raw: -score });
    }

    RootOutcome {
        scores,
        stopped: false,
    }
}

/// Captures first, most valuable victim first. Stable, so quiet moves keep
/// generation order.
fn order_moves(pos: &Position, moves: &mut [Move]) {
    moves.sort_by_key(|mv| {
        let victim = pos.piece_at(mv.to).map_or(0, |pc| pc.kind.value());
        let promo = mv.promo.map_or(0, |k| k.value());
        -(victim + promo)
    });
}

/// Recursive negamax search with alpha-beta pruning.
///
/// `ply` is the distance from the root, used to prefer quicker mates.
/// Returns (score, stopped) where stopped indicates the clock ran out.
#[allow(clippy::too_many_arguments)]
fn negamax(
    pos: &mut Position,
    depth: u8,
    ply: i32,
    mut alpha: i32,
    beta: i32,
    history: &mut Vec<u64>,
    nodes: &mut u64,
    tc: &TimeControl,
) -> (i32, bool) {
    if tc.should_check_time(*nodes) && tc.check_time() {
        return (0, true);
    }

    let mut moves = Vec::with_capacity(64);
    legal_moves_into(pos, &mut moves);

    if moves.is_empty() {
        if pos.in_check(pos.side_to_move) {
            return (-(MATE_VALUE - ply), false);
        }
        return (0, false);
    }

    if pos.is_fifty_move_draw() || pos.is_insufficient_material() {
        return (0, false);
    }
    if let Some(&key) = history.last()
        && is_threefold(key, history)
    {
        return (0, false);
    }

    if depth == 0 {
        return (evaluate(pos), false);
    }

    order_moves(pos, &mut moves);

    let mut best = -MATE_VALUE;
    for mv in moves {
        let undo = pos.make_move(mv);
        history.push(pos.key());
        *nodes += 1;

        let (score, stopped) = negamax(pos, depth - 1, ply + 1, -beta, -alpha, history, nodes, tc);
        let score = -score;

        history.pop();
        pos.unmake_move(mv, undo);

        if stopped {
            return (best, true);
        }

        best = best.max(score);
        alpha = alpha.max(best);
        if alpha >= beta {
            break;
        }
    }

    (best, false)
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
