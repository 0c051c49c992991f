//! Game orchestration: one engine, two profiles, one game.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chess_core::{
    CandidateMove, Color, DrawRule, EngineError, EngineGateway, Move, Position, Rules,
    SearchLimits, StandardRules, Terminal, move_to_san,
};
use chrono::Utc;
use personality::{BiasEngine, PersonalityProfile};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SelfPlayConfig;
use crate::error::{ConfigError, GameError};
use crate::record::{GameMetadata, GameRecord, PlyRecord};

/// Principal-variation moves kept per ply.
pub const PV_LIMIT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    EngineFailure,
    RulesViolation,
    Config,
    Cancelled,
}

impl AbortReason {
    pub fn describe(self) -> &'static str {
        match self {
            AbortReason::EngineFailure => "engine failure",
            AbortReason::RulesViolation => "rules violation",
            AbortReason::Config => "configuration error",
            AbortReason::Cancelled => "cancelled",
        }
    }
}

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
    DrawByRule(DrawRule),
    Aborted(AbortReason),
}

impl Outcome {
    /// PGN result token.
    pub fn result(self) -> &'static str {
        match self {
            Outcome::Checkmate {
                winner: Color::White,
            } => "1-0",
            Outcome::Checkmate {
                winner: Color::Black,
            } => "0-1",
            Outcome::Stalemate | Outcome::DrawByRule(_) => "1/2-1/2",
            Outcome::Aborted(_) => "*",
        }
    }

    /// PGN `Termination` tag value.
    pub fn termination(self) -> &'static str {
        match self {
            Outcome::Checkmate { .. } | Outcome::Stalemate => "normal",
            Outcome::DrawByRule(DrawRule::PlyLimit) => "adjudication",
            Outcome::DrawByRule(_) => "normal",
            Outcome::Aborted(AbortReason::Cancelled) => "unterminated",
            Outcome::Aborted(_) => "abandoned",
        }
    }

    pub fn is_aborted(self) -> bool {
        matches!(self, Outcome::Aborted(_))
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::Checkmate { winner } => Some(winner),
            _ => None,
        }
    }
}

impl From<Terminal> for Outcome {
    fn from(t: Terminal) -> Self {
        match t {
            Terminal::Checkmate { winner } => Outcome::Checkmate { winner },
            Terminal::Stalemate => Outcome::Stalemate,
            Terminal::Draw(rule) => Outcome::DrawByRule(rule),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            Outcome::Stalemate => write!(f, "stalemate"),
            Outcome::DrawByRule(rule) => write!(f, "draw by {}", rule.describe()),
            Outcome::Aborted(reason) => write!(f, "aborted ({})", reason.describe()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    NotStarted,
    InProgress,
    Finished(Outcome),
}

/// Shared stop flag. Games check it between plies, never mid-request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-game knobs.
#[derive(Debug, Clone)]
pub struct GameSettings {
    pub max_plies: u32,
    pub max_candidates: usize,
    /// Template for every request; each ply gets a renewed copy.
    pub limits: SearchLimits,
    /// Depth override for white's requests.
    pub depth_white: Option<u8>,
    pub depth_black: Option<u8>,
    /// Extra attempts after a failed engine request.
    pub retries: u32,
    pub start: Position,
    /// Write the start FEN into the record (and the PGN `FEN` tag).
    pub custom_start: bool,
    pub seed: Option<u64>,
}

impl GameSettings {
    pub fn from_config(config: &SelfPlayConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            max_plies: config.game.max_plies,
            max_candidates: config.engine.max_candidates,
            limits: config.search_limits(),
            depth_white: config.engine.depth_white,
            depth_black: config.engine.depth_black,
            retries: config.engine.retries,
            start: config.start_position()?,
            custom_start: config.game.start_fen.is_some(),
            seed: config.batch.seed,
        })
    }

    /// Limits for one request by `side`, with a fresh clock.
    pub fn limits_for(&self, side: Color) -> SearchLimits {
        let mut limits = self.limits.renewed();
        let depth = match side {
            Color::White => self.depth_white,
            Color::Black => self.depth_black,
        };
        if let Some(depth) = depth {
            limits.depth = depth;
        }
        limits
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_plies: 300,
            max_candidates: 5,
            limits: SearchLimits::default(),
            depth_white: None,
            depth_black: None,
            retries: 2,
            start: Position::startpos(),
            custom_start: false,
            seed: None,
        }
    }
}

/// Drives one game: asks the gateway for candidates, lets the side to
/// move's profile choose among them, applies the move and records it.
pub struct Game<G> {
    gateway: G,
    rules: Box<dyn Rules>,
    bias: BiasEngine,
    white: Arc<PersonalityProfile>,
    black: Arc<PersonalityProfile>,
    settings: GameSettings,
    position: Position,
    history: Vec<u64>,
    record: GameRecord,
    rng: StdRng,
    cancel: Option<CancelToken>,
    state: GameState,
}

impl<G: EngineGateway> Game<G> {
    pub fn new(
        gateway: G,
        white: Arc<PersonalityProfile>,
        black: Arc<PersonalityProfile>,
        settings: GameSettings,
    ) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        let position = settings.start.clone();
        let record = GameRecord::new(GameMetadata {
            white_profile: white.name().to_string(),
            black_profile: black.name().to_string(),
            engine: gateway.name().to_string(),
            start_fen: settings.custom_start.then(|| position.to_fen()),
            started_at: Utc::now(),
            seed,
        });
        Self {
            gateway,
            rules: Box::new(StandardRules),
            bias: BiasEngine::new(),
            white,
            black,
            history: vec![position.key()],
            position,
            settings,
            record,
            rng: StdRng::seed_from_u64(seed),
            cancel: None,
            state: GameState::NotStarted,
        }
    }

    pub fn with_rules(mut self, rules: impl Rules + 'static) -> Self {
        self.rules = Box::new(rules);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Play to the end and hand back the finished record.
    pub fn play(mut self) -> GameRecord {
        while !matches!(self.step(), GameState::Finished(_)) {}
        self.record
    }

    /// Advance by one ply (starting the game first if needed).
    pub fn step(&mut self) -> GameState {
        match self.state {
            GameState::Finished(_) => return self.state,
            GameState::NotStarted => {
                self.start();
                if let GameState::Finished(_) = self.state {
                    return self.state;
                }
            }
            GameState::InProgress => {}
        }

        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            self.finish(Outcome::Aborted(AbortReason::Cancelled), None);
            return self.state;
        }

        match self.play_ply() {
            Ok(Some(outcome)) => self.finish(outcome, None),
            Ok(None) => {}
            Err(e) => {
                warn!(
                    ply = self.record.plies().len() + 1,
                    fen = %self.position.to_fen(),
                    error = %e,
                    "game aborted"
                );
                self.finish(Outcome::Aborted(e.abort_reason()), Some(e.to_string()));
            }
        }
        self.state
    }

    fn start(&mut self) {
        info!(
            white = %self.white.name(),
            black = %self.black.name(),
            engine = %self.gateway.name(),
            seed = self.record.metadata.seed,
            "game started"
        );
        self.state = GameState::InProgress;
        if let Err(e) = self.gateway.new_game() {
            warn!(error = %e, "engine failed to reset for a new game");
            let e = GameError::from(e);
            self.finish(Outcome::Aborted(e.abort_reason()), Some(e.to_string()));
            return;
        }
        if let Some(t) = self.rules.terminal_state(&self.position, &self.history) {
            self.finish(t.into(), None);
        }
    }

    fn finish(&mut self, outcome: Outcome, detail: Option<String>) {
        self.record.finish(outcome, detail);
        self.state = GameState::Finished(outcome);
        info!(
            white = %self.white.name(),
            black = %self.black.name(),
            plies = self.record.plies().len(),
            result = outcome.result(),
            %outcome,
            "game finished"
        );
    }

    fn profile_to_move(&self) -> Arc<PersonalityProfile> {
        match self.position.side_to_move {
            Color::White => Arc::clone(&self.white),
            Color::Black => Arc::clone(&self.black),
        }
    }

    /// Play one ply; `Some` when the game is over afterwards.
    fn play_ply(&mut self) -> Result<Option<Outcome>, GameError> {
        let candidates = self.request_candidates()?;
        let profile = self.profile_to_move();
        let selection = self
            .bias
            .select(&candidates, &profile, &self.position, &mut self.rng)?;

        let side = self.position.side_to_move;
        let mv = selection.candidate.mv;
        let san = move_to_san(&self.position, mv);
        let capture = self.position.piece_at(mv.to).is_some() || mv.is_en_passant;
        let next = self.rules.apply_move(&self.position, mv)?;
        let check = next.in_check(next.side_to_move);

        let ply = self.record.plies().len() as u32 + 1;
        let best = candidates
            .iter()
            .find(|c| c.mv == selection.best_move)
            .map_or(selection.candidate.score, |c| c.score);
        debug!(
            ply,
            side = %side,
            mv = %san,
            objective = %selection.candidate.score,
            biased = selection.biased,
            best = %best,
            best_move = %selection.best_move,
            "ply"
        );
        self.record.push(PlyRecord {
            ply,
            side,
            uci: mv.to_string(),
            san,
            objective: selection.candidate.score,
            best,
            best_uci: selection.best_move.to_string(),
            biased: selection.biased,
            profile: profile.name().to_string(),
            bias_decided: selection.bias_decided(),
            capture,
            check,
            castle: mv.is_castle,
            candidates: candidates.len(),
            admissible: selection.admissible,
            pv: selection
                .candidate
                .pv
                .iter()
                .take(PV_LIMIT)
                .map(ToString::to_string)
                .collect(),
        });

        self.position = next;
        self.history.push(self.position.key());

        if let Some(t) = self.rules.terminal_state(&self.position, &self.history) {
            return Ok(Some(t.into()));
        }
        if ply >= self.settings.max_plies {
            return Ok(Some(Outcome::DrawByRule(DrawRule::PlyLimit)));
        }
        Ok(None)
    }

    /// Ask the gateway, retrying failed or empty replies.
    fn request_candidates(&mut self) -> Result<Vec<CandidateMove>, GameError> {
        let legal = self.rules.legal_moves(&self.position);
        let attempts = self.settings.retries + 1;
        let mut last = None;
        for attempt in 1..=attempts {
            let limits = self.settings.limits_for(self.position.side_to_move);
            let reply = self
                .gateway
                .candidates(&self.position, self.settings.max_candidates, &limits)
                .and_then(|cands| normalize(&self.position, &legal, cands));
            match reply {
                Ok(cands) => return Ok(cands),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "engine request failed");
                    last = Some(e);
                }
            }
        }
        Err(last
            .unwrap_or_else(|| EngineError::NoCandidates {
                fen: self.position.to_fen(),
            })
            .into())
    }
}

/// Replace each candidate's move with the matching legal move, so castling
/// and en-passant flags come from the rules rather than the engine.
fn normalize(
    pos: &Position,
    legal: &[Move],
    mut candidates: Vec<CandidateMove>,
) -> Result<Vec<CandidateMove>, EngineError> {
    if candidates.is_empty() {
        return Err(EngineError::NoCandidates { fen: pos.to_fen() });
    }
    for c in &mut candidates {
        let Some(&m) = legal
            .iter()
            .find(|m| m.from == c.mv.from && m.to == c.mv.to && m.promo == c.mv.promo)
        else {
            return Err(EngineError::IllegalMove {
                mv: c.mv.to_string(),
                fen: pos.to_fen(),
            });
        };
        c.mv = m;
        if let Some(first) = c.pv.first_mut() {
            *first = m;
        }
    }
    Ok(candidates)
}

#[cfg(test)]
#[path = "game_tests.rs"]
mod game_tests;
