//! Consistency checks and summaries over annotated games.
//!
//! Everything here works from the PGN text alone, so games written by older
//! runs (or edited by hand) can be audited without their JSON records.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chess_core::{Move, Position, Score, parse_uci_move, san_to_move};
use serde::Serialize;

use crate::error::PgnError;
use crate::pgn::{self, PgnGame};
use crate::record::GameRecord;

const REQUIRED_KEYS: [&str; 3] = ["eval", "biasedEval", "profile"];
const VERBOSE_KEYS: [&str; 4] = ["best", "bestEval", "delta", "feat"];

/// `key=value` pairs of a move comment, split on commas.
pub fn parse_annotation(comment: &str) -> HashMap<String, String> {
    comment
        .split(',')
        .filter_map(|item| item.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

fn is_feat(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() == 3
        && matches!(b[0], b'C' | b'-')
        && matches!(b[1], b'K' | b'-')
        && matches!(b[2], b'O' | b'-')
}

fn san_capture(san: &str) -> bool {
    san.contains('x')
}

fn san_check(san: &str) -> bool {
    san.contains('+') || san.contains('#')
}

fn san_castle(san: &str) -> bool {
    san.starts_with("O-O") || san.starts_with("0-0")
}

/// SAN moves replayed from the start position.
struct Replay {
    /// Position before each move, and the move, up to the first bad one.
    moves: Vec<(Position, Move)>,
    /// 1-based ply and message for the move that did not replay.
    error: Option<(usize, String)>,
}

fn replay(game: &PgnGame) -> Replay {
    let mut pos = match game.start_position() {
        Ok(p) => p,
        Err(e) => {
            return Replay {
                moves: Vec::new(),
                error: Some((0, format!("bad FEN tag: {e}"))),
            };
        }
    };
    let mut moves = Vec::with_capacity(game.moves.len());
    for (i, m) in game.moves.iter().enumerate() {
        let Some(mv) = san_to_move(&pos, &m.san) else {
            return Replay {
                moves,
                error: Some((i + 1, format!("illegal move '{}'", m.san))),
            };
        };
        let before = pos.clone();
        pos.make_move(mv);
        moves.push((before, mv));
    }
    Replay { moves, error: None }
}

/// The line must start with the played move and replay legally.
fn check_pv(before: &Position, played: Move, pv: &str) -> Option<String> {
    let mut moves = pv.split_whitespace();
    let Some(first) = moves.next() else {
        return Some("empty pv".to_string());
    };
    if first != played.to_string() {
        return Some(format!("pv starts with {first}, not the played move {played}"));
    }
    let mut pos = before.clone();
    pos.make_move(played);
    for text in moves {
        let Some(mv) = parse_uci_move(&pos, text) else {
            return Some(format!("pv move '{text}' is not legal"));
        };
        pos.make_move(mv);
    }
    None
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub plies: usize,
    pub result: String,
    pub errors: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every move comment for the annotation keys and for internal
/// consistency, and check that the moves themselves replay legally.
pub fn check_game(game: &PgnGame) -> CheckReport {
    let mut errors = Vec::new();
    let replayed = replay(game);

    for (i, m) in game.moves.iter().enumerate() {
        let ply = i + 1;
        let comment = m.comment.as_deref().unwrap_or("");
        let data = parse_annotation(comment);

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|k| !data.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            errors.push(format!(
                "ply {ply}: missing keys {missing:?} in comment '{comment}'"
            ));
        }

        let verbose_present = VERBOSE_KEYS.iter().any(|k| data.contains_key(*k));
        if verbose_present {
            let missing: Vec<&str> = VERBOSE_KEYS
                .iter()
                .copied()
                .filter(|k| !data.contains_key(*k))
                .collect();
            if !missing.is_empty() {
                errors.push(format!("ply {ply}: incomplete verbose keys, missing {missing:?}"));
            }
        }

        let eval = data.get("eval").map(|v| (v, Score::parse(v)));
        if let Some((text, None)) = &eval {
            errors.push(format!("ply {ply}: bad eval '{text}'"));
        }
        if let Some(b) = data.get("biasedEval")
            && b.parse::<f64>().map_or(true, |v| !v.is_finite())
        {
            errors.push(format!("ply {ply}: bad biasedEval '{b}'"));
        }
        let best_eval = data.get("bestEval").map(|v| (v, Score::parse(v)));
        if let Some((text, None)) = &best_eval {
            errors.push(format!("ply {ply}: bad bestEval '{text}'"));
        }

        if let Some(d) = data.get("delta") {
            match d.parse::<i64>() {
                Ok(delta) => {
                    if let (Some((_, Some(chosen))), Some((_, Some(best)))) = (&eval, &best_eval) {
                        let expected =
                            i64::from(chosen.centipawns()) - i64::from(best.centipawns());
                        if delta != expected {
                            errors.push(format!(
                                "ply {ply}: delta mismatch: {delta} != {chosen} - {best}"
                            ));
                        }
                    }
                    if delta > 0 {
                        errors.push(format!("ply {ply}: positive delta {delta}"));
                    }
                }
                Err(_) => errors.push(format!("ply {ply}: bad delta '{d}'")),
            }
        }

        if let Some(feat) = data.get("feat") {
            if !is_feat(feat) {
                errors.push(format!("ply {ply}: bad feat '{feat}'"));
            } else {
                let expected: String = [
                    (san_capture(&m.san), 'C'),
                    (san_check(&m.san), 'K'),
                    (san_castle(&m.san), 'O'),
                ]
                .iter()
                .map(|&(set, c)| if set { c } else { '-' })
                .collect();
                if *feat != expected {
                    errors.push(format!(
                        "ply {ply}: feat '{feat}' does not match move {} ({expected})",
                        m.san
                    ));
                }
            }
        }

        if let Some(best) = data.get("best")
            && let Some((before, _)) = replayed.moves.get(i)
            && parse_uci_move(before, best).is_none()
        {
            errors.push(format!("ply {ply}: best move '{best}' is not legal"));
        }

        if let Some(pv) = data.get("pv")
            && let Some((before, played)) = replayed.moves.get(i)
            && let Some(problem) = check_pv(before, *played, pv)
        {
            errors.push(format!("ply {ply}: {problem}"));
        }
    }

    if let Some((ply, message)) = &replayed.error {
        errors.push(format!("ply {ply}: {message}"));
    }
    if let Some(count) = game.header("PlyCount")
        && count.parse::<usize>().ok() != Some(game.moves.len())
    {
        errors.push(format!(
            "PlyCount {count} does not match {} moves",
            game.moves.len()
        ));
    }
    if let Some(tag) = game.header("Result")
        && tag != game.result
    {
        errors.push(format!("Result tag {tag} does not match movetext {}", game.result));
    }

    CheckReport {
        plies: game.moves.len(),
        result: game.result.clone(),
        errors,
    }
}

/// Per-move facts the summary is built from.
#[derive(Debug, Clone, Default)]
struct MoveFacts {
    capture: bool,
    check: bool,
    castle: bool,
    delta: Option<i64>,
    /// `None` when the best move is unknown.
    agrees: Option<bool>,
    profile: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub result: String,
    pub plies: usize,
    pub captures_pct: f64,
    pub checks_pct: f64,
    pub castles_pct: f64,
    pub delta_avg: Option<f64>,
    /// Population standard deviation; needs at least two deltas.
    pub delta_std: Option<f64>,
    pub engine_agreement_pct: f64,
    pub profile_counts: BTreeMap<String, usize>,
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

fn summarize_facts(result: &str, facts: &[MoveFacts]) -> Summary {
    let plies = facts.len();
    let count = |f: fn(&MoveFacts) -> bool| facts.iter().filter(|m| f(m)).count();
    let deltas: Vec<f64> = facts.iter().filter_map(|m| m.delta).map(|d| d as f64).collect();
    let mean = (!deltas.is_empty()).then(|| deltas.iter().sum::<f64>() / deltas.len() as f64);
    let std = match mean {
        Some(mean) if deltas.len() > 1 => {
            let var =
                deltas.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / deltas.len() as f64;
            Some(var.sqrt())
        }
        _ => None,
    };
    let mut profile_counts = BTreeMap::new();
    for name in facts.iter().filter_map(|m| m.profile.as_deref()) {
        *profile_counts.entry(name.to_string()).or_insert(0) += 1;
    }

    Summary {
        result: result.to_string(),
        plies,
        captures_pct: round1(pct(count(|m| m.capture), plies)),
        checks_pct: round1(pct(count(|m| m.check), plies)),
        castles_pct: round1(pct(count(|m| m.castle), plies)),
        delta_avg: mean.map(round1),
        delta_std: std.map(round1),
        engine_agreement_pct: round1(pct(count(|m| m.agrees == Some(true)), plies)),
        profile_counts,
    }
}

fn pgn_facts(game: &PgnGame) -> Vec<MoveFacts> {
    let replayed = replay(game);
    game.moves
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let data = parse_annotation(m.comment.as_deref().unwrap_or(""));
            let chosen = replayed.moves.get(i).map(|(_, mv)| mv.to_string());
            let agrees = match (chosen, data.get("best")) {
                (Some(chosen), Some(best)) => Some(&chosen == best),
                _ => None,
            };
            MoveFacts {
                capture: san_capture(&m.san),
                check: san_check(&m.san),
                castle: san_castle(&m.san),
                delta: data.get("delta").and_then(|d| d.parse().ok()),
                agrees,
                profile: data.get("profile").cloned(),
            }
        })
        .collect()
}

fn record_facts(record: &GameRecord) -> Vec<MoveFacts> {
    record
        .plies()
        .iter()
        .map(|p| MoveFacts {
            capture: p.capture,
            check: p.check,
            castle: p.castle,
            delta: Some(p.delta_cp()),
            agrees: Some(p.agrees_with_engine()),
            profile: Some(p.profile.clone()),
        })
        .collect()
}

pub fn summarize(game: &PgnGame) -> Summary {
    summarize_facts(&game.result, &pgn_facts(game))
}

pub fn summarize_record(record: &GameRecord) -> Summary {
    summarize_facts(record.result(), &record_facts(record))
}

/// Percentage of moves (among those with a known best move) that matched
/// the engine's best. `None` when no move carries a best move.
pub fn move_agreement(game: &PgnGame) -> Option<f64> {
    let facts = pgn_facts(game);
    let known: Vec<bool> = facts.iter().filter_map(|m| m.agrees).collect();
    if known.is_empty() {
        return None;
    }
    let agree = known.iter().filter(|&&a| a).count();
    Some(pct(agree, known.len()))
}

/// How many files ended with each result token.
pub fn outcome_counts<P: AsRef<Path>>(paths: &[P]) -> Result<BTreeMap<String, usize>, PgnError> {
    let mut counts = BTreeMap::new();
    for path in paths {
        let game = pgn::load(path.as_ref())?;
        *counts.entry(game.result).or_insert(0) += 1;
    }
    Ok(counts)
}

#[cfg(test)]
#[path = "analysis_tests.rs"]
mod analysis_tests;
