//! Parsing of engine-to-GUI UCI lines.

use chess_core::Score;

/// Whether an `info` score is exact or only a search bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bound {
    #[default]
    Exact,
    Lower,
    Upper,
}

/// The parts of an `info` line the gateway cares about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoLine {
    pub depth: Option<u8>,
    /// 1-based MultiPV index; engines omit it when MultiPV is 1.
    pub multipv: u16,
    pub score: Option<Score>,
    pub bound: Bound,
    /// Principal variation in UCI move text.
    pub pv: Vec<String>,
}

impl InfoLine {
    /// A line that can become a candidate: exact score and a first move.
    pub fn is_scored_line(&self) -> bool {
        self.score.is_some() && self.bound == Bound::Exact && !self.pv.is_empty()
    }
}

/// Parse an `info ...` line. Returns `None` for anything else, and for
/// `info string` chatter.
pub fn parse_info(line: &str) -> Option<InfoLine> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "info" {
        return None;
    }

    let mut info = InfoLine {
        multipv: 1,
        ..InfoLine::default()
    };
    while let Some(token) = tokens.next() {
        match token {
            "string" => return None,
            "depth" => info.depth = tokens.next().and_then(|t| t.parse().ok()),
            "multipv" => info.multipv = tokens.next().and_then(|t| t.parse().ok())?,
            "score" => {
                info.score = match (tokens.next(), tokens.next()) {
                    (Some("cp"), Some(v)) => Some(Score::Cp(v.parse().ok()?)),
                    (Some("mate"), Some(v)) => Some(Score::Mate(v.parse().ok()?)),
                    _ => return None,
                }
            }
            "lowerbound" => info.bound = Bound::Lower,
            "upperbound" => info.bound = Bound::Upper,
            // Everything after `pv` is the variation.
            "pv" => {
                info.pv = tokens.by_ref().map(str::to_string).collect();
            }
            _ => {}
        }
    }
    Some(info)
}

/// Parse a `bestmove` line. `Some(None)` means the engine reported no move
/// (`(none)` or `0000`).
pub fn parse_bestmove(line: &str) -> Option<Option<String>> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "bestmove" {
        return None;
    }
    match tokens.next() {
        None | Some("(none)") | Some("0000") => Some(None),
        Some(mv) => Some(Some(mv.to_string())),
    }
}

/// The engine's self-reported name from an `id name ...` line.
pub fn parse_id_name(line: &str) -> Option<&str> {
    line.strip_prefix("id name ").map(str::trim)
}

#[cfg(test)]
#[path = "info_tests.rs"]
mod info_tests;
