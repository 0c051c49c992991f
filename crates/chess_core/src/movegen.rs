use crate::{board::Position, types::*};

/// Generate all legal moves, returning a freshly allocated vector.
pub fn legal_moves(pos: &Position) -> Vec<Move> {
    let mut tmp = pos.clone();
    let mut out = Vec::with_capacity(64);
    legal_moves_into(&mut tmp, &mut out);
    out
}

/// Generate all legal moves into the provided buffer, reusing it across calls.
/// `pos` is restored before returning.
pub fn legal_moves_into(pos: &mut Position, out: &mut Vec<Move>) {
    out.clear();
    pseudo_moves(pos, out);

    let mover = pos.side_to_move;
    out.retain(|&mv| {
        let undo = pos.make_move(mv);
        let illegal = pos.in_check(mover);
        pos.unmake_move(mv, undo);
        !illegal
    });
}

/// True when the side to move has at least one legal move.
pub fn has_legal_move(pos: &Position) -> bool {
    !legal_moves(pos).is_empty()
}

fn pseudo_moves(pos: &Position, out: &mut Vec<Move>) {
    let us = pos.side_to_move;
    for (from, pc) in pos.pieces(us) {
        match pc.kind {
            PieceKind::Pawn => gen_pawn(pos, from, us, out),
            PieceKind::Knight => gen_steps(pos, from, us, &KNIGHT_DELTAS, out),
            PieceKind::Bishop => gen_slider(pos, from, us, &DIAGONALS, out),
            PieceKind::Rook => gen_slider(pos, from, us, &ORTHOGONALS, out),
            PieceKind::Queen => {
                gen_slider(pos, from, us, &DIAGONALS, out);
                gen_slider(pos, from, us, &ORTHOGONALS, out);
            }
            PieceKind::King => {
                gen_steps(pos, from, us, &KING_DELTAS, out);
                gen_castle(pos, from, us, out);
            }
        }
    }
}

/// Push a pawn move, expanding it into the four promotions on the last rank.
fn push_pawn(from: u8, to: u8, c: Color, out: &mut Vec<Move>) {
    let last_rank = if c == Color::White { 7 } else { 0 };
    if rank_of(to) == last_rank {
        out.extend(
            PieceKind::PROMOTIONS
                .iter()
                .map(|&pk| Move::with_promo(from, to, pk)),
        );
    } else {
        out.push(Move::new(from, to));
    }
}

fn gen_pawn(pos: &Position, from: u8, c: Color, out: &mut Vec<Move>) {
    let f = file_of(from);
    let r = rank_of(from);
    let dir = c.forward();
    let start_rank = if c == Color::White { 1 } else { 6 };

    if let Some(to) = sq(f, r + dir)
        && pos.piece_at(to).is_none()
    {
        push_pawn(from, to, c, out);
        if r == start_rank
            && let Some(to2) = sq(f, r + 2 * dir)
            && pos.piece_at(to2).is_none()
        {
            out.push(Move::new(from, to2));
        }
    }

    for df in [-1, 1] {
        let Some(to) = sq(f + df, r + dir) else {
            continue;
        };
        match pos.piece_at(to) {
            Some(target) if target.color != c => push_pawn(from, to, c, out),
            None if pos.en_passant == Some(to) => out.push(Move {
                is_en_passant: true,
                ..Move::new(from, to)
            }),
            _ => {}
        }
    }
}

fn gen_steps(pos: &Position, from: u8, c: Color, deltas: &[(i8, i8)], out: &mut Vec<Move>) {
    let f = file_of(from);
    let r = rank_of(from);
    for (df, dr) in deltas {
        if let Some(to) = sq(f + df, r + dr)
            && pos.piece_at(to).is_none_or(|pc| pc.color != c)
        {
            out.push(Move::new(from, to));
        }
    }
}

fn gen_slider(pos: &Position, from: u8, c: Color, dirs: &[(i8, i8)], out: &mut Vec<Move>) {
    for (df, dr) in dirs {
        let mut f = file_of(from) + df;
        let mut r = rank_of(from) + dr;
        while let Some(to) = sq(f, r) {
            match pos.piece_at(to) {
                None => out.push(Move::new(from, to)),
                Some(pc) => {
                    if pc.color != c {
                        out.push(Move::new(from, to));
                    }
                    break;
                }
            }
            f += df;
            r += dr;
        }
    }
}

/// One castling option: right flag, king destination, squares that must be
/// empty, and squares the king crosses (must not be attacked).
struct CastleRule {
    allowed: bool,
    king_to: u8,
    empty: &'static [u8],
    safe: &'static [u8],
}

fn gen_castle(pos: &Position, from: u8, c: Color, out: &mut Vec<Move>) {
    let home = if c == Color::White { 4 } else { 60 };
    if from != home || pos.in_check(c) {
        return;
    }
    let rules = match c {
        Color::White => [
            CastleRule {
                allowed: pos.castling.wk,
                king_to: 6,
                empty: &[5, 6],
                safe: &[5, 6],
            },
            CastleRule {
                allowed: pos.castling.wq,
                king_to: 2,
                empty: &[1, 2, 3],
                safe: &[2, 3],
            },
        ],
        Color::Black => [
            CastleRule {
                allowed: pos.castling.bk,
                king_to: 62,
                empty: &[61, 62],
                safe: &[61, 62],
            },
            CastleRule {
                allowed: pos.castling.bq,
                king_to: 58,
                empty: &[57, 58, 59],
                safe: &[58, 59],
            },
        ],
    };

    let enemy = c.other();
    for rule in rules {
        if rule.allowed
            && rule.empty.iter().all(|&s| pos.piece_at(s).is_none())
            && rule.safe.iter().all(|&s| !pos.is_square_attacked(s, enemy))
        {
            out.push(Move {
                is_castle: true,
                ..Move::new(from, rule.king_to)
            });
        }
    }
}

#[cfg(test)]
#[path = "movegen_tests.rs"]
mod movegen_tests;
