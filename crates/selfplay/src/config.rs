//! Run configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration that plays Stockfish from `PATH` against itself with the
//! built-in `aggressive` and `defensive` profiles.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chess_core::{EngineGateway, Position, SearchLimits};
use classical_engine::ClassicalGateway;
use personality::{PersonalityProfile, ProfileLibrary};
use serde::{Deserialize, Serialize};
use uci_engine::{UciConfig, UciGateway};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelfPlayConfig {
    pub engine: EngineConfig,
    pub game: GameConfig,
    pub profiles: ProfilesConfig,
    pub output: OutputConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// External process speaking UCI.
    #[default]
    Uci,
    /// In-process alpha-beta search.
    Classical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub kind: EngineKind,
    /// Engine binary for `kind = "uci"`.
    pub path: PathBuf,
    pub args: Vec<String>,
    pub depth: u8,
    /// Per-side depth; `depth` when absent.
    pub depth_white: Option<u8>,
    pub depth_black: Option<u8>,
    pub movetime_ms: Option<u64>,
    /// MultiPV width: how many candidates each request asks for.
    pub max_candidates: usize,
    /// Caller-side bound on one request.
    pub timeout_ms: u64,
    /// Extra attempts after a failed request before the game is aborted.
    pub retries: u32,
    pub hash_mb: Option<u32>,
    pub threads: Option<u32>,
    pub skill_level: Option<u8>,
    pub options: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Uci,
            path: PathBuf::from("stockfish"),
            args: Vec::new(),
            depth: 12,
            depth_white: None,
            depth_black: None,
            movetime_ms: None,
            max_candidates: 5,
            timeout_ms: 30_000,
            retries: 2,
            hash_mb: Some(256),
            threads: Some(1),
            skill_level: Some(20),
            options: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Plies after which the game is adjudicated a draw.
    pub max_plies: u32,
    /// Custom start position; the standard one when absent.
    pub start_fen: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_plies: 300,
            start_fen: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilesConfig {
    pub white: String,
    pub black: String,
    /// Directory of extra `.toml`/`.json` profiles.
    pub dir: Option<PathBuf>,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            white: "aggressive".to_string(),
            black: "defensive".to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub pgn_dir: PathBuf,
    /// NDJSON file with one line per finished game.
    pub results_log: Option<PathBuf>,
    /// Add best move, best score, delta and move flags to every comment.
    pub verbose_annotations: bool,
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pgn_dir: PathBuf::from("data"),
            results_log: Some(PathBuf::from("data/results.ndjson")),
            verbose_annotations: true,
            prefix: "selfplay".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub games: u32,
    /// Worker threads; 0 uses one per CPU.
    pub parallelism: usize,
    /// Base seed; game `i` uses `seed + i`. Unseeded games draw from the OS.
    pub seed: Option<u64>,
    /// Swap profiles between colors on every other game.
    pub alternate_colors: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            games: 10,
            parallelism: 1,
            seed: None,
            alternate_colors: true,
        }
    }
}

impl SelfPlayConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.engine.depth == 0 {
            return invalid("engine.depth must be at least 1");
        }
        if self.engine.depth_white == Some(0) || self.engine.depth_black == Some(0) {
            return invalid("engine.depth_white and engine.depth_black must be at least 1");
        }
        if self.engine.max_candidates == 0 {
            return invalid("engine.max_candidates must be at least 1");
        }
        if self.engine.timeout_ms == 0 {
            return invalid("engine.timeout_ms must be positive");
        }
        if self.engine.kind == EngineKind::Uci && self.engine.path.as_os_str().is_empty() {
            return invalid("engine.path is required for a UCI engine");
        }
        if let Some(skill) = self.engine.skill_level
            && skill > 20
        {
            return invalid("engine.skill_level must be between 0 and 20");
        }
        if self.game.max_plies == 0 {
            return invalid("game.max_plies must be at least 1");
        }
        if self.output.prefix.trim().is_empty() {
            return invalid("output.prefix must not be empty");
        }
        self.start_position()?;
        Ok(())
    }

    pub fn start_position(&self) -> Result<Position, ConfigError> {
        match &self.game.start_fen {
            Some(fen) => Ok(Position::from_fen(fen)?),
            None => Ok(Position::startpos()),
        }
    }

    /// Limits for one engine request. Each call returns a fresh clock.
    pub fn search_limits(&self) -> SearchLimits {
        let limits = match self.engine.movetime_ms {
            Some(ms) => SearchLimits::depth_and_time(self.engine.depth, Duration::from_millis(ms)),
            None => SearchLimits::depth(self.engine.depth),
        };
        limits.with_timeout(Duration::from_millis(self.engine.timeout_ms))
    }

    /// Built-in profiles plus those in `profiles.dir`.
    pub fn profile_library(&self) -> Result<ProfileLibrary, ConfigError> {
        let mut lib = ProfileLibrary::builtin()?;
        if let Some(dir) = &self.profiles.dir {
            lib.load_dir(dir)?;
        }
        Ok(lib)
    }

    /// The (white, black) profiles named in the config.
    pub fn side_profiles(
        &self,
        lib: &ProfileLibrary,
    ) -> Result<(Arc<PersonalityProfile>, Arc<PersonalityProfile>), ConfigError> {
        Ok((lib.get(&self.profiles.white)?, lib.get(&self.profiles.black)?))
    }

    /// A fresh gateway as configured. Each game gets its own.
    pub fn build_gateway(&self) -> Box<dyn EngineGateway> {
        match self.engine.kind {
            EngineKind::Classical => Box::new(ClassicalGateway::new()),
            EngineKind::Uci => {
                let mut uci = UciConfig::new(&self.engine.path);
                uci.args = self.engine.args.clone();
                uci.hash_mb = self.engine.hash_mb;
                uci.threads = self.engine.threads;
                uci.skill_level = self.engine.skill_level;
                uci.options = self.engine.options.clone();
                Box::new(UciGateway::new(uci))
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
