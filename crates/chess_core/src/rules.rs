//! Game-level rules: applying moves and classifying finished positions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{board::Position, movegen::legal_moves, types::*};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("move {mv} is not legal in {fen}")]
    IllegalMove { mv: String, fen: String },
}

/// Draw conditions a game can end on. `PlyLimit` is the runaway-game guard
/// imposed by the orchestrator rather than by the laws of chess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawRule {
    FiftyMove,
    ThreefoldRepetition,
    InsufficientMaterial,
    PlyLimit,
}

impl DrawRule {
    pub fn describe(self) -> &'static str {
        match self {
            DrawRule::FiftyMove => "fifty-move rule",
            DrawRule::ThreefoldRepetition => "threefold repetition",
            DrawRule::InsufficientMaterial => "insufficient material",
            DrawRule::PlyLimit => "ply limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    Checkmate { winner: Color },
    Stalemate,
    Draw(DrawRule),
}

/// The rules collaborator. Anything that can list, apply and classify moves
/// on a `Position` can back a game.
pub trait Rules: Send + Sync {
    fn legal_moves(&self, pos: &Position) -> Vec<Move>;

    /// Return the position after `mv`, rejecting moves that are not legal.
    fn apply_move(&self, pos: &Position, mv: Move) -> Result<Position, RulesError>;

    /// Classify `pos`. `history` holds the keys of every position reached so
    /// far in the game, `pos` included.
    fn terminal_state(&self, pos: &Position, history: &[u64]) -> Option<Terminal>;
}

/// Standard chess over `chess_core`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl Rules for StandardRules {
    fn legal_moves(&self, pos: &Position) -> Vec<Move> {
        legal_moves(pos)
    }

    fn apply_move(&self, pos: &Position, mv: Move) -> Result<Position, RulesError> {
        let Some(legal) = legal_moves(pos)
            .into_iter()
            .find(|m| m.from == mv.from && m.to == mv.to && m.promo == mv.promo)
        else {
            return Err(RulesError::IllegalMove {
                mv: mv.to_string(),
                fen: pos.to_fen(),
            });
        };
        let mut next = pos.clone();
        next.make_move(legal);
        Ok(next)
    }

    fn terminal_state(&self, pos: &Position, history: &[u64]) -> Option<Terminal> {
        if legal_moves(pos).is_empty() {
            return Some(if pos.in_check(pos.side_to_move) {
                Terminal::Checkmate {
                    winner: pos.side_to_move.other(),
                }
            } else {
                Terminal::Stalemate
            });
        }
        if pos.is_insufficient_material() {
            return Some(Terminal::Draw(DrawRule::InsufficientMaterial));
        }
        if pos.is_fifty_move_draw() {
            return Some(Terminal::Draw(DrawRule::FiftyMove));
        }
        if is_threefold(pos.key(), history) {
            return Some(Terminal::Draw(DrawRule::ThreefoldRepetition));
        }
        None
    }
}

pub fn is_threefold(key: u64, history: &[u64]) -> bool {
    history.iter().filter(|&&k| k == key).count() >= 3
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod rules_tests;
