//! Standard Algebraic Notation for PGN movetext.

use crate::{board::Position, movegen::legal_moves, types::*};

/// Render `mv` (legal in `pos`) in SAN, including `+`/`#` suffixes.
pub fn move_to_san(pos: &Position, mv: Move) -> String {
    let Some(piece) = pos.piece_at(mv.from) else {
        return mv.to_string();
    };

    let mut san = String::with_capacity(8);
    if mv.is_castle {
        san.push_str(if file_of(mv.to) == 6 { "O-O" } else { "O-O-O" });
    } else {
        let capture = pos.piece_at(mv.to).is_some() || mv.is_en_passant;
        if piece.kind == PieceKind::Pawn {
            if capture {
                san.push((b'a' + file_of(mv.from) as u8) as char);
            }
        } else {
            san.push(piece.kind.letter());
            san.push_str(&disambiguation(pos, mv, piece.kind));
        }
        if capture {
            san.push('x');
        }
        san.push_str(&sq_to_coord(mv.to));
        if let Some(p) = mv.promo {
            san.push('=');
            san.push(p.letter());
        }
    }

    let mut after = pos.clone();
    after.make_move(mv);
    if after.in_check(after.side_to_move) {
        san.push(if legal_moves(&after).is_empty() { '#' } else { '+' });
    }
    san
}

/// Find the legal move `text` names. Check suffixes and annotation marks
/// (`+`, `#`, `!`, `?`) are ignored, and `0-0` is accepted for castling.
pub fn san_to_move(pos: &Position, text: &str) -> Option<Move> {
    let normalized = text.replace('0', "O");
    let wanted = strip_san(&normalized);
    if wanted.is_empty() {
        return None;
    }
    legal_moves(pos)
        .into_iter()
        .find(|&mv| strip_san(&move_to_san(pos, mv)) == wanted)
}

fn strip_san(text: &str) -> &str {
    text.trim_end_matches(['+', '#', '!', '?'])
}

/// File, rank, or full square of the origin when another piece of the same
/// kind could also reach the destination.
fn disambiguation(pos: &Position, mv: Move, kind: PieceKind) -> String {
    let rivals: Vec<u8> = legal_moves(pos)
        .into_iter()
        .filter(|m| {
            m.to == mv.to
                && m.from != mv.from
                && pos.piece_at(m.from).is_some_and(|pc| pc.kind == kind)
        })
        .map(|m| m.from)
        .collect();
    if rivals.is_empty() {
        return String::new();
    }

    let coord = sq_to_coord(mv.from);
    if rivals.iter().all(|&s| file_of(s) != file_of(mv.from)) {
        coord[..1].to_string()
    } else if rivals.iter().all(|&s| rank_of(s) != rank_of(mv.from)) {
        coord[1..].to_string()
    } else {
        coord
    }
}

#[cfg(test)]
#[path = "san_tests.rs"]
mod san_tests;
