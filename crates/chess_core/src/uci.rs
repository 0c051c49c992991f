use crate::{board::Position, movegen::legal_moves, types::*};

pub fn move_to_uci(mv: Move) -> String {
    mv.to_string()
}

/// Resolve UCI text (`e2e4`, `e7e8q`) against the legal moves of `pos`, so
/// the castle and en-passant flags come out right. `None` if the text is
/// malformed or the move is not legal.
pub fn parse_uci_move(pos: &Position, txt: &str) -> Option<Move> {
    if !(4..=5).contains(&txt.len()) || !txt.is_ascii() {
        return None;
    }
    let from = coord_to_sq(&txt[0..2])?;
    let to = coord_to_sq(&txt[2..4])?;
    let promo = match txt.as_bytes().get(4) {
        Some(&b) => match PieceKind::from_letter(b as char)? {
            PieceKind::Pawn | PieceKind::King => return None,
            kind => Some(kind),
        },
        None => None,
    };

    legal_moves(pos)
        .into_iter()
        .find(|m| m.from == from && m.to == to && m.promo == promo)
}

/// Apply a whitespace-separated list of UCI moves, stopping at the first
/// one that does not parse. Returns how many moves were applied.
pub fn play_uci_moves(pos: &mut Position, moves: &str) -> usize {
    let mut applied = 0;
    for txt in moves.split_whitespace() {
        match parse_uci_move(pos, txt) {
            Some(mv) => {
                pos.make_move(mv);
                applied += 1;
            }
            None => break,
        }
    }
    applied
}

#[cfg(test)]
#[path = "uci_tests.rs"]
mod uci_tests;
