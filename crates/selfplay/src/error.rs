use std::io;
use std::path::PathBuf;

use chess_core::{EngineError, FenError, RulesError};
use personality::{ProfileError, SelectError};
use thiserror::Error;

use crate::game::AbortReason;

/// Invalid configuration, reported before any game starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("invalid start position: {0}")]
    StartFen(#[from] FenError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Why a single game could not continue.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("engine failure: {0}")]
    Engine(#[from] EngineError),
    #[error("rules violation: {0}")]
    Rules(#[from] RulesError),
    #[error("configuration error: {0}")]
    Config(String),
}

impl GameError {
    pub fn abort_reason(&self) -> AbortReason {
        match self {
            GameError::Engine(_) => AbortReason::EngineFailure,
            GameError::Rules(_) => AbortReason::RulesViolation,
            GameError::Config(_) => AbortReason::Config,
        }
    }
}

impl From<SelectError> for GameError {
    fn from(e: SelectError) -> Self {
        match e {
            // An empty slice can only come from the engine side.
            SelectError::NoCandidates => GameError::Engine(EngineError::Malformed(e.to_string())),
            other => GameError::Config(other.to_string()),
        }
    }
}

/// Problems reading or checking a PGN file.
#[derive(Debug, Error)]
pub enum PgnError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("no game found")]
    Empty,
}

/// Failures that stop a whole batch. Per-game problems end up in the
/// game's own result line instead.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot open results log {path}: {source}")]
    ResultsLog { path: PathBuf, source: io::Error },
    #[error("cannot build worker pool: {0}")]
    Pool(String),
}
