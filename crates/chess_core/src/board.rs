use std::fmt::Write as _;
use std::str::FromStr;

use thiserror::Error;

use crate::types::*;

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Reasons a FEN string can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected at least 4 FEN fields, found {0}")]
    MissingFields(usize),
    #[error("expected 8 ranks in FEN board, found {0}")]
    RankCount(usize),
    #[error("rank {rank} does not describe exactly 8 files")]
    FileCount { rank: usize },
    #[error("invalid piece character '{0}'")]
    Piece(char),
    #[error("invalid side to move '{0}'")]
    SideToMove(String),
    #[error("invalid castling field '{0}'")]
    Castling(String),
    #[error("invalid en-passant square '{0}'")]
    EnPassant(String),
    #[error("invalid move counter '{0}'")]
    Counter(String),
    #[error("{0} king missing or duplicated")]
    King(Color),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CastlingRights {
    pub wk: bool,
    pub wq: bool,
    pub bk: bool,
    pub bq: bool,
}

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights {
        wk: false,
        wq: false,
        bk: false,
        bq: false,
    };
    pub const ALL: CastlingRights = CastlingRights {
        wk: true,
        wq: true,
        bk: true,
        bq: true,
    };

    /// Drop any right tied to a king or rook home square.
    fn touch(&mut self, square: u8) {
        match square {
            0 => self.wq = false,
            7 => self.wk = false,
            4 => {
                self.wk = false;
                self.wq = false;
            }
            56 => self.bq = false,
            63 => self.bk = false,
            60 => {
                self.bk = false;
                self.bq = false;
            }
            _ => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub board: [Option<Piece>; 64],
    pub side_to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<u8>, // square behind a pawn that just advanced 2
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

#[derive(Clone, Debug)]
pub struct Undo {
    pub captured: Option<Piece>,
    pub castling: CastlingRights,
    pub en_passant: Option<u8>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
    pub moved_piece: Piece,
    pub rook_move: Option<(u8, u8)>, // (rook_from, rook_to) for castling
    pub ep_captured_sq: Option<u8>,  // square actually captured in en-passant
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    pub fn startpos() -> Self {
        let mut board = [None; 64];
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (f, &kind) in back.iter().enumerate() {
            board[f] = Some(Piece::new(Color::White, kind));
            board[8 + f] = Some(Piece::new(Color::White, PieceKind::Pawn));
            board[48 + f] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            board[56 + f] = Some(Piece::new(Color::Black, kind));
        }
        Position {
            board,
            side_to_move: Color::White,
            castling: CastlingRights::ALL,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Parse Forsyth-Edwards Notation. The move counters are optional.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(FenError::MissingFields(parts.len()));
        }

        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount(ranks.len()));
        }

        let mut board = [None; 64];
        for (rank_idx, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_idx as i8; // FEN lists rank 8 .. 1
            let mut file: i8 = 0;
            for ch in rank_str.chars() {
                if let Some(d) = ch.to_digit(10) {
                    file += d as i8;
                } else {
                    let kind = PieceKind::from_letter(ch).ok_or(FenError::Piece(ch))?;
                    let color = if ch.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    let s = sq(file, rank).ok_or(FenError::FileCount { rank: rank_idx })?;
                    board[s as usize] = Some(Piece::new(color, kind));
                    file += 1;
                }
                if file > 8 {
                    return Err(FenError::FileCount { rank: rank_idx });
                }
            }
            if file != 8 {
                return Err(FenError::FileCount { rank: rank_idx });
            }
        }

        let side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::SideToMove(other.to_string())),
        };

        let mut castling = CastlingRights::NONE;
        if parts[2] != "-" {
            for c in parts[2].chars() {
                match c {
                    'K' => castling.wk = true,
                    'Q' => castling.wq = true,
                    'k' => castling.bk = true,
                    'q' => castling.bq = true,
                    _ => return Err(FenError::Castling(parts[2].to_string())),
                }
            }
        }

        let en_passant = match parts[3] {
            "-" => None,
            s => Some(coord_to_sq(s).ok_or_else(|| FenError::EnPassant(s.to_string()))?),
        };

        let counter = |idx: usize, default: u32| -> Result<u32, FenError> {
            match parts.get(idx) {
                Some(s) => s.parse().map_err(|_| FenError::Counter(s.to_string())),
                None => Ok(default),
            }
        };

        let pos = Position {
            board,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock: counter(4, 0)?,
            fullmove_number: counter(5, 1)?,
        };

        for color in [Color::White, Color::Black] {
            let kings = pos
                .pieces(color)
                .filter(|(_, pc)| pc.kind == PieceKind::King)
                .count();
            if kings != 1 {
                return Err(FenError::King(color));
            }
        }
        Ok(pos)
    }

    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(90);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.board[(rank * 8 + file) as usize] {
                    Some(pc) => {
                        if empty > 0 {
                            let _ = write!(out, "{empty}");
                            empty = 0;
                        }
                        out.push(pc.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                let _ = write!(out, "{empty}");
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        let before = out.len();
        for (flag, ch) in [
            (self.castling.wk, 'K'),
            (self.castling.wq, 'Q'),
            (self.castling.bk, 'k'),
            (self.castling.bq, 'q'),
        ] {
            if flag {
                out.push(ch);
            }
        }
        if out.len() == before {
            out.push('-');
        }

        out.push(' ');
        match self.en_passant {
            Some(ep) => out.push_str(&sq_to_coord(ep)),
            None => out.push('-'),
        }
        let _ = write!(out, " {} {}", self.halfmove_clock, self.fullmove_number);
        out
    }

    /// Iterate over the pieces of one color with their squares.
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = (u8, Piece)> + '_ {
        self.board
            .iter()
            .enumerate()
            .filter_map(move |(i, pc)| match pc {
                Some(p) if p.color == color => Some((i as u8, *p)),
                _ => None,
            })
    }

    pub fn king_sq(&self, c: Color) -> Option<u8> {
        self.pieces(c)
            .find(|(_, pc)| pc.kind == PieceKind::King)
            .map(|(s, _)| s)
    }

    pub fn piece_at(&self, sq: u8) -> Option<Piece> {
        self.board[sq as usize]
    }
    pub fn set_piece(&mut self, sq: u8, pc: Option<Piece>) {
        self.board[sq as usize] = pc;
    }

    /// Sum of piece values for one side, in centipawns.
    pub fn material(&self, c: Color) -> i32 {
        self.pieces(c).map(|(_, pc)| pc.kind.value()).sum()
    }

    pub fn in_check(&self, c: Color) -> bool {
        match self.king_sq(c) {
            Some(ksq) => self.is_square_attacked(ksq, c.other()),
            None => false,
        }
    }

    pub fn is_square_attacked(&self, target: u8, by: Color) -> bool {
        let tf = file_of(target);
        let tr = rank_of(target);
        let holds = |s: Option<u8>, kinds: &[PieceKind]| {
            s.and_then(|s| self.piece_at(s))
                .is_some_and(|pc| pc.color == by && kinds.contains(&pc.kind))
        };

        // A pawn of `by` attacks the target from one rank behind it.
        let back = -by.forward();
        if holds(sq(tf - 1, tr + back), &[PieceKind::Pawn])
            || holds(sq(tf + 1, tr + back), &[PieceKind::Pawn])
        {
            return true;
        }
        if KNIGHT_DELTAS
            .iter()
            .any(|(df, dr)| holds(sq(tf + df, tr + dr), &[PieceKind::Knight]))
        {
            return true;
        }
        if KING_DELTAS
            .iter()
            .any(|(df, dr)| holds(sq(tf + df, tr + dr), &[PieceKind::King]))
        {
            return true;
        }

        let slides = [
            (&DIAGONALS, [PieceKind::Bishop, PieceKind::Queen]),
            (&ORTHOGONALS, [PieceKind::Rook, PieceKind::Queen]),
        ];
        for (dirs, kinds) in slides {
            for (df, dr) in dirs {
                if let Some(s) = self.first_blocker(target, *df, *dr)
                    && holds(Some(s), &kinds)
                {
                    return true;
                }
            }
        }
        false
    }

    /// First occupied square walking from `from` in direction (df, dr).
    pub fn first_blocker(&self, from: u8, df: i8, dr: i8) -> Option<u8> {
        let mut f = file_of(from) + df;
        let mut r = rank_of(from) + dr;
        while let Some(s) = sq(f, r) {
            if self.piece_at(s).is_some() {
                return Some(s);
            }
            f += df;
            r += dr;
        }
        None
    }

    /// Play a pseudo-legal move. The caller is responsible for legality;
    /// `legal_moves` only ever hands out legal ones.
    pub fn make_move(&mut self, mv: Move) -> Undo {
        let from = mv.from;
        let to = mv.to;
        let Some(moved) = self.piece_at(from) else {
            debug_assert!(false, "no piece on {}", sq_to_coord(from));
            return self.null_undo();
        };
        let mut captured = self.piece_at(to);
        let prev_castling = self.castling.clone();
        let prev_ep = self.en_passant;
        let prev_hmc = self.halfmove_clock;
        let prev_fmn = self.fullmove_number;

        self.en_passant = None;
        let mut reset_hmc = moved.kind == PieceKind::Pawn || captured.is_some();

        let mut ep_captured_sq = None;
        if mv.is_en_passant
            && let Some(cs) = sq(file_of(to), rank_of(to) - moved.color.forward())
        {
            captured = self.piece_at(cs);
            self.set_piece(cs, None);
            ep_captured_sq = Some(cs);
            reset_hmc = true;
        }

        self.set_piece(from, None);
        let promo_rank = if moved.color == Color::White { 7 } else { 0 };
        let landed = if moved.kind == PieceKind::Pawn && rank_of(to) == promo_rank {
            Piece::new(moved.color, mv.promo.unwrap_or(PieceKind::Queen))
        } else {
            moved
        };
        self.set_piece(to, Some(landed));

        let mut rook_move = None;
        if mv.is_castle && moved.kind == PieceKind::King {
            let (rf, rt) = match to {
                6 => (7, 5),
                2 => (0, 3),
                62 => (63, 61),
                58 => (56, 59),
                _ => (from, from),
            };
            if rf != rt
                && let Some(rook) = self.piece_at(rf)
            {
                self.set_piece(rf, None);
                self.set_piece(rt, Some(rook));
                rook_move = Some((rf, rt));
            }
        }

        self.castling.touch(from);
        self.castling.touch(to);

        if moved.kind == PieceKind::Pawn && (rank_of(to) - rank_of(from)).abs() == 2 {
            self.en_passant = sq(file_of(from), (rank_of(from) + rank_of(to)) / 2);
        }

        self.halfmove_clock = if reset_hmc {
            0
        } else {
            self.halfmove_clock + 1
        };
        if self.side_to_move == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = self.side_to_move.other();

        Undo {
            captured,
            castling: prev_castling,
            en_passant: prev_ep,
            halfmove_clock: prev_hmc,
            fullmove_number: prev_fmn,
            moved_piece: moved,
            rook_move,
            ep_captured_sq,
        }
    }

    fn null_undo(&self) -> Undo {
        Undo {
            captured: None,
            castling: self.castling.clone(),
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
            moved_piece: Piece::new(self.side_to_move, PieceKind::Pawn),
            rook_move: None,
            ep_captured_sq: None,
        }
    }

    pub fn unmake_move(&mut self, mv: Move, undo: Undo) {
        self.side_to_move = self.side_to_move.other();
        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.fullmove_number = undo.fullmove_number;

        if let Some((rf, rt)) = undo.rook_move {
            let rook = self.piece_at(rt);
            self.set_piece(rt, None);
            self.set_piece(rf, rook);
        }

        // Promotions come back as the pawn that moved.
        self.set_piece(mv.from, Some(undo.moved_piece));
        match undo.ep_captured_sq {
            Some(cs) => {
                self.set_piece(mv.to, None);
                self.set_piece(cs, undo.captured);
            }
            None => self.set_piece(mv.to, undo.captured),
        }
    }

    /// FNV hash over everything that matters for repetition.
    pub fn key(&self) -> u64 {
        fn mix(h: u64, x: u64) -> u64 {
            (h ^ x).wrapping_mul(0x100000001b3)
        }

        let mut h = 0xcbf29ce484222325u64;
        h = mix(h, self.side_to_move.idx() as u64 + 1);
        h = mix(h, if self.castling.wk { 3 } else { 5 });
        h = mix(h, if self.castling.wq { 7 } else { 11 });
        h = mix(h, if self.castling.bk { 13 } else { 17 });
        h = mix(h, if self.castling.bq { 19 } else { 23 });
        if let Some(ep) = self.en_passant {
            h = mix(h, 29 + ep as u64);
        }
        for (i, s) in self.board.iter().enumerate() {
            let v = match s {
                Some(pc) => {
                    (i as u64) ^ ((pc.color.idx() as u64 + 1) << 6) ^ ((pc.kind.idx() as u64 + 1) << 8)
                }
                None => i as u64,
            };
            h = mix(h, v);
        }
        h
    }

    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Neither side can possibly deliver mate: bare kings, a single minor
    /// piece, or only bishops that all stand on one square color.
    pub fn is_insufficient_material(&self) -> bool {
        let mut minors = 0;
        let mut knights = 0;
        let mut bishop_colors = [false; 2];
        for (s, pc) in self.board.iter().enumerate() {
            let Some(pc) = pc else { continue };
            match pc.kind {
                PieceKind::King => {}
                PieceKind::Knight => {
                    minors += 1;
                    knights += 1;
                }
                PieceKind::Bishop => {
                    minors += 1;
                    let s = s as u8;
                    bishop_colors[((file_of(s) + rank_of(s)) % 2) as usize] = true;
                }
                _ => return false,
            }
        }
        if minors <= 1 {
            return true;
        }
        knights == 0 && !(bishop_colors[0] && bishop_colors[1])
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::from_fen(s)
    }
}

#[cfg(test)]
#[path = "board_tests.rs"]
mod board_tests;
