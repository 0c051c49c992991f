use chess_core::{Color, PieceKind, Position, file_of, rank_of};

/// Small bonus for pawns and minors standing on or next to the center, so
/// that material-equal moves are not all tied.
fn placement(kind: PieceKind, s: u8) -> i32 {
    let f = file_of(s);
    let r = rank_of(s);
    let center_dist = (2 * f - 7).abs().max((2 * r - 7).abs()) as i32; // 1..=7
    match kind {
        PieceKind::Pawn | PieceKind::Knight | PieceKind::Bishop => (7 - center_dist) * 3,
        _ => 0,
    }
}

/// Material plus placement, from the side-to-move's perspective.
pub fn evaluate(pos: &Position) -> i32 {
    let mut score = 0i32;
    for (i, s) in pos.board.iter().enumerate() {
        if let Some(pc) = s {
            let v = pc.kind.value() + placement(pc.kind, i as u8);
            score += if pc.color == Color::White { v } else { -v };
        }
    }
    if pos.side_to_move == Color::White {
        score
    } else {
        -score
    }
}
