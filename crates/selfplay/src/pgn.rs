//! Annotated PGN export, plus a small reader for checking the output.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chess_core::{Color, FenError, Position};
use chrono::Local;

use crate::error::PgnError;
use crate::record::{GameRecord, PlyRecord};

const LINE_WIDTH: usize = 80;
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Renders finished games as PGN with one annotation comment per move.
#[derive(Debug, Clone)]
pub struct PgnWriter {
    pub event: String,
    pub site: String,
    /// Append best move, best score, delta and move flags to each comment.
    pub verbose: bool,
}

impl Default for PgnWriter {
    fn default() -> Self {
        Self {
            event: "Personality Self-Play".to_string(),
            site: "Local".to_string(),
            verbose: true,
        }
    }
}

impl PgnWriter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    pub fn render(&self, record: &GameRecord) -> String {
        let meta = &record.metadata;
        let mut out = String::new();
        let mut tag = |name: &str, value: &str| {
            let _ = writeln!(out, "[{name} \"{}\"]", escape(value));
        };
        tag("Event", &self.event);
        tag("Site", &self.site);
        tag("Date", &meta.started_at.format("%Y.%m.%d").to_string());
        tag("Round", "-");
        tag("White", &format!("{} ({})", meta.engine, meta.white_profile));
        tag("Black", &format!("{} ({})", meta.engine, meta.black_profile));
        tag("Result", record.result());
        tag("PlyCount", &record.plies().len().to_string());
        if let Some(outcome) = record.outcome() {
            tag("Termination", outcome.termination());
        }
        tag("WhiteProfile", &meta.white_profile);
        tag("BlackProfile", &meta.black_profile);
        if let Some(fen) = &meta.start_fen {
            tag("SetUp", "1");
            tag("FEN", fen);
        }
        out.push('\n');

        let mut move_number = meta
            .start_fen
            .as_deref()
            .and_then(|fen| Position::from_fen(fen).ok())
            .map_or(1, |p| p.fullmove_number);
        let mut tokens: Vec<String> = Vec::with_capacity(record.plies().len() * 5 + 1);
        for ply in record.plies() {
            // Every move carries a comment, so black moves restate their number.
            match ply.side {
                Color::White => tokens.push(format!("{move_number}.")),
                Color::Black => tokens.push(format!("{move_number}...")),
            }
            tokens.push(ply.san.clone());
            let comment = self.annotation(ply);
            tokens.extend(format!("{{{comment}}}").split(' ').map(str::to_string));
            if ply.side == Color::Black {
                move_number += 1;
            }
        }
        tokens.push(record.result().to_string());

        wrap(&tokens, LINE_WIDTH, &mut out);
        out.push('\n');
        out
    }

    /// `eval=..., biasedEval=..., profile=...` and, when verbose,
    /// `best=..., bestEval=..., delta=..., feat=...[, pv=...]`.
    pub fn annotation(&self, ply: &PlyRecord) -> String {
        let mut text = format!(
            "eval={}, biasedEval={:.2}, profile={}",
            ply.objective, ply.biased, ply.profile
        );
        if self.verbose {
            let _ = write!(
                text,
                ", best={}, bestEval={}, delta={}, feat={}",
                ply.best_uci,
                ply.best,
                ply.delta_cp(),
                ply.flags()
            );
            if !ply.pv.is_empty() {
                let _ = write!(text, ", pv={}", ply.pv.join(" "));
            }
        }
        text
    }

    /// Write `<prefix>_<YYYYmmdd-HHMMSS>.pgn` into `dir`, adding `_<n>` when
    /// that name is taken.
    pub fn save(&self, record: &GameRecord, dir: &Path, prefix: &str) -> Result<PathBuf, PgnError> {
        let io_err = |path: &Path, source: io::Error| PgnError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let text = self.render(record);

        for n in 0..MAX_NAME_ATTEMPTS {
            let name = match n {
                0 => format!("{prefix}_{stamp}.pgn"),
                n => format!("{prefix}_{stamp}_{n}.pgn"),
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(text.as_bytes())
                        .map_err(|e| io_err(&path, e))?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(io_err(&path, e)),
            }
        }
        Err(io_err(
            dir,
            io::Error::new(io::ErrorKind::AlreadyExists, "no free PGN file name"),
        ))
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Greedy fill: as many tokens per line as fit in `width`.
fn wrap(tokens: &[String], width: usize, out: &mut String) {
    let mut line_len = 0;
    for token in tokens {
        if line_len > 0 && line_len + 1 + token.len() > width {
            out.push('\n');
            line_len = 0;
        }
        if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(token);
        line_len += token.len();
    }
}

// =============================================================================
// Reading
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgnMove {
    pub san: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnGame {
    /// Tag pairs in file order.
    pub headers: Vec<(String, String)>,
    pub moves: Vec<PgnMove>,
    /// Game termination marker; `*` when missing.
    pub result: String,
}

impl PgnGame {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Position the movetext starts from (the `FEN` tag, if any).
    pub fn start_position(&self) -> Result<Position, FenError> {
        match self.header("FEN") {
            Some(fen) => Position::from_fen(fen),
            None => Ok(Position::startpos()),
        }
    }
}

/// Read the first game in a file.
pub fn load(path: &Path) -> Result<PgnGame, PgnError> {
    let text = fs::read_to_string(path).map_err(|source| PgnError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_game(&text)
}

pub fn read_game(text: &str) -> Result<PgnGame, PgnError> {
    read_games(text)?.into_iter().next().ok_or(PgnError::Empty)
}

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Parse every game in `text`. Variations, NAGs and `;` comments are skipped.
pub fn read_games(text: &str) -> Result<Vec<PgnGame>, PgnError> {
    let mut games = Vec::new();
    let mut game = PgnGame::default();
    let mut started = false;
    let mut in_movetext = false;
    let mut line = 1usize;
    let mut chars = text.chars().peekable();

    let syntax = |line: usize, message: &str| PgnError::Syntax {
        line,
        message: message.to_string(),
    };

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '[' => {
                if in_movetext {
                    // Tags after movetext start the next game.
                    finish_game(&mut games, &mut game);
                    in_movetext = false;
                }
                let start = line;
                let mut body = String::new();
                let mut quoted = false;
                let mut escaped = false;
                loop {
                    let Some(ch) = chars.next() else {
                        return Err(syntax(start, "unterminated tag"));
                    };
                    if ch == '\n' {
                        line += 1;
                    }
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' && quoted {
                        escaped = true;
                    } else if ch == '"' {
                        quoted = !quoted;
                    } else if ch == ']' && !quoted {
                        break;
                    }
                    body.push(ch);
                }
                game.headers.push(parse_tag(&body).ok_or_else(|| syntax(start, "malformed tag"))?);
                started = true;
            }
            '{' => {
                let start = line;
                let mut body = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => {
                            if ch == '\n' {
                                line += 1;
                            }
                            body.push(ch);
                        }
                        None => return Err(syntax(start, "unterminated comment")),
                    }
                }
                let body = body.split_whitespace().collect::<Vec<_>>().join(" ");
                if let Some(last) = game.moves.last_mut() {
                    last.comment = Some(match last.comment.take() {
                        Some(prev) => format!("{prev} {body}"),
                        None => body,
                    });
                }
                in_movetext = true;
                started = true;
            }
            ';' => {
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '(' => {
                let start = line;
                let mut depth = 1;
                while depth > 0 {
                    match chars.next() {
                        Some('(') => depth += 1,
                        Some(')') => depth -= 1,
                        Some('\n') => line += 1,
                        Some(_) => {}
                        None => return Err(syntax(start, "unterminated variation")),
                    }
                }
            }
            ')' | ']' | '}' => return Err(syntax(line, &format!("unexpected '{c}'"))),
            _ => {
                let mut token = String::from(c);
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || "{}()[];".contains(ch) {
                        break;
                    }
                    token.push(ch);
                    chars.next();
                }
                in_movetext = true;
                started = true;

                if RESULTS.contains(&token.as_str()) {
                    game.result = token;
                    finish_game(&mut games, &mut game);
                    in_movetext = false;
                    started = false;
                    continue;
                }
                if token.starts_with('$') {
                    continue;
                }
                let san = token
                    .trim_start_matches(|ch: char| ch.is_ascii_digit())
                    .trim_start_matches('.');
                if !san.is_empty() {
                    game.moves.push(PgnMove {
                        san: san.to_string(),
                        comment: None,
                    });
                }
            }
        }
    }
    if started {
        finish_game(&mut games, &mut game);
    }
    Ok(games)
}

fn finish_game(games: &mut Vec<PgnGame>, game: &mut PgnGame) {
    let mut done = std::mem::take(game);
    if done.result.is_empty() {
        done.result = done.header("Result").unwrap_or("*").to_string();
    }
    games.push(done);
}

/// `Name "value"` with `\"` and `\\` escapes.
fn parse_tag(body: &str) -> Option<(String, String)> {
    let body = body.trim();
    let (name, rest) = body.split_once(char::is_whitespace)?;
    let inner = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            value.push(chars.next()?);
        } else {
            value.push(c);
        }
    }
    Some((name.to_string(), value))
}

#[cfg(test)]
#[path = "pgn_tests.rs"]
mod pgn_tests;
