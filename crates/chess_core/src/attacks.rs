//! Attack maps over the mailbox board.
//!
//! These are pseudo-attacks: pins are ignored and a square occupied by a
//! friendly piece still counts as attacked (it is defended). That is what
//! positional heuristics want.

use crate::board::Position;
use crate::types::*;

/// Central squares d4, e4, d5, e5.
pub const CENTER: [u8; 4] = [27, 28, 35, 36];

/// Squares attacked by the piece standing on `from`, passed to `visit`.
pub fn for_each_attack(pos: &Position, from: u8, mut visit: impl FnMut(u8)) {
    let Some(pc) = pos.piece_at(from) else {
        return;
    };
    match pc.kind {
        PieceKind::Pawn => {
            let fwd = pc.color.forward();
            step(from, &[(-1, fwd), (1, fwd)], &mut visit);
        }
        PieceKind::Knight => step(from, &KNIGHT_DELTAS, &mut visit),
        PieceKind::King => step(from, &KING_DELTAS, &mut visit),
        PieceKind::Bishop => slide(pos, from, &DIAGONALS, &mut visit),
        PieceKind::Rook => slide(pos, from, &ORTHOGONALS, &mut visit),
        PieceKind::Queen => {
            slide(pos, from, &DIAGONALS, &mut visit);
            slide(pos, from, &ORTHOGONALS, &mut visit);
        }
    }
}

fn step(from: u8, deltas: &[(i8, i8)], visit: &mut impl FnMut(u8)) {
    for (df, dr) in deltas {
        if let Some(to) = sq(file_of(from) + df, rank_of(from) + dr) {
            visit(to);
        }
    }
}

fn slide(pos: &Position, from: u8, dirs: &[(i8, i8)], visit: &mut impl FnMut(u8)) {
    for (df, dr) in dirs {
        let mut f = file_of(from) + df;
        let mut r = rank_of(from) + dr;
        while let Some(to) = sq(f, r) {
            visit(to);
            if pos.piece_at(to).is_some() {
                break;
            }
            f += df;
            r += dr;
        }
    }
}

/// Number of pieces of one color attacking each square.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttackMap {
    pub color: Color,
    counts: [u8; 64],
}

impl AttackMap {
    pub fn build(pos: &Position, color: Color) -> Self {
        let mut counts = [0u8; 64];
        for (from, _) in pos.pieces(color) {
            for_each_attack(pos, from, |to| counts[to as usize] += 1);
        }
        Self { color, counts }
    }

    #[inline]
    pub fn count(&self, sq: u8) -> u8 {
        self.counts[sq as usize]
    }

    #[inline]
    pub fn attacks(&self, sq: u8) -> bool {
        self.counts[sq as usize] > 0
    }
}

/// Squares reachable by non-pawn pieces, not counting squares held by
/// friendly pieces. A cheap stand-in for full mobility.
pub fn mobility(pos: &Position, color: Color) -> u32 {
    let mut total = 0;
    for (from, pc) in pos.pieces(color) {
        if pc.kind == PieceKind::Pawn {
            continue;
        }
        for_each_attack(pos, from, |to| {
            if pos.piece_at(to).is_none_or(|p| p.color != color) {
                total += 1;
            }
        });
    }
    total
}

/// The king square and its neighbours.
pub fn king_zone(king: u8) -> impl Iterator<Item = u8> {
    let f = file_of(king);
    let r = rank_of(king);
    std::iter::once(king).chain(
        KING_DELTAS
            .into_iter()
            .filter_map(move |(df, dr)| sq(f + df, r + dr)),
    )
}

#[cfg(test)]
#[path = "attacks_tests.rs"]
mod attacks_tests;
