//! UCI front end for the classical engine.
//!
//! Speaks enough UCI for `UciGateway` (and GUIs) to use it: MultiPV info
//! lines for every requested candidate, fixed depth, optional movetime.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use chess_core::{EngineGateway, Position, STARTPOS_FEN, SearchLimits, play_uci_moves};
use classical_engine::ClassicalGateway;

const DEFAULT_DEPTH: u8 = 3;
const MAX_DEPTH: u8 = 8;

/// Apply `position startpos|fen <fen> [moves ...]`. Leaves `pos` untouched
/// when the FEN does not parse.
fn set_position(pos: &mut Position, args: &[&str]) {
    let (fen, rest) = match args.first() {
        Some(&"startpos") => (STARTPOS_FEN.to_string(), &args[1..]),
        Some(&"fen") => {
            let end = args.iter().position(|&t| t == "moves").unwrap_or(args.len());
            (args[1..end].join(" "), &args[end..])
        }
        _ => return,
    };
    let Ok(parsed) = Position::from_fen(&fen) else {
        return;
    };
    *pos = parsed;
    if rest.first() == Some(&"moves") {
        play_uci_moves(pos, &rest[1..].join(" "));
    }
}

/// Value following `key` in a token list.
fn arg_after<T: std::str::FromStr>(parts: &[&str], key: &str) -> Option<T> {
    let i = parts.iter().position(|&p| p == key)?;
    parts.get(i + 1)?.parse().ok()
}

/// `setoption name <name...> value <value>`
fn parse_setoption(parts: &[&str]) -> Option<(String, String)> {
    let name_at = parts.iter().position(|&p| p == "name")?;
    let value_at = parts.iter().position(|&p| p == "value")?;
    if value_at <= name_at {
        return None;
    }
    let name = parts[name_at + 1..value_at].join(" ");
    let value = parts[value_at + 1..].join(" ");
    Some((name, value))
}

fn main() {
    // UCI engines communicate via stdin/stdout.
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut engine = ClassicalGateway::new();
    let mut pos = Position::startpos();
    let mut depth = DEFAULT_DEPTH;
    let mut multipv: usize = 1;

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            continue;
        };

        match command {
            "uci" => {
                writeln!(stdout, "id name {}", engine.name()).ok();
                writeln!(stdout, "id author ML-chess").ok();
                writeln!(
                    stdout,
                    "option name Depth type spin default {DEFAULT_DEPTH} min 1 max {MAX_DEPTH}"
                )
                .ok();
                writeln!(stdout, "option name MultiPV type spin default 1 min 1 max 256").ok();
                writeln!(stdout, "uciok").ok();
            }
            "isready" => {
                writeln!(stdout, "readyok").ok();
            }
            "setoption" => match parse_setoption(&parts) {
                Some((name, value)) if name.eq_ignore_ascii_case("depth") => {
                    if let Ok(d) = value.parse::<u8>() {
                        depth = d.clamp(1, MAX_DEPTH);
                    }
                }
                Some((name, value)) if name.eq_ignore_ascii_case("multipv") => {
                    if let Ok(k) = value.parse::<usize>() {
                        multipv = k.clamp(1, 256);
                    }
                }
                // Hash, Threads and the rest do not apply.
                _ => {}
            },
            "ucinewgame" => {
                pos = Position::startpos();
                engine.new_game().ok();
            }
            "position" => set_position(&mut pos, &parts[1..]),
            "go" => {
                let d = arg_after(&parts, "depth").unwrap_or(depth).clamp(1, MAX_DEPTH);
                let limits = match arg_after::<u64>(&parts, "movetime") {
                    Some(ms) => SearchLimits::depth_and_time(d, Duration::from_millis(ms)),
                    None => SearchLimits::depth(d),
                };
                match engine.candidates(&pos, multipv, &limits) {
                    Ok(cands) => {
                        for c in &cands {
                            let score = match c.score {
                                chess_core::Score::Cp(cp) => format!("cp {cp}"),
                                chess_core::Score::Mate(n) => format!("mate {n}"),
                            };
                            writeln!(
                                stdout,
                                "info depth {} multipv {} score {score} nodes {} pv {}",
                                c.depth,
                                c.rank,
                                engine.nodes(),
                                c.mv
                            )
                            .ok();
                        }
                        match cands.first() {
                            Some(best) => writeln!(stdout, "bestmove {}", best.mv).ok(),
                            None => writeln!(stdout, "bestmove (none)").ok(),
                        };
                    }
                    Err(_) => {
                        writeln!(stdout, "bestmove (none)").ok();
                    }
                }
            }
            "quit" => break,
            _ => {
                // ignore unknown commands
            }
        }
        stdout.flush().ok();
    }
}
