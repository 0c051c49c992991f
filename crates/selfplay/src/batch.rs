//! Many games in parallel, each with its own engine.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chess_core::EngineGateway;
use personality::{PersonalityProfile, ProfileLibrary};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{Summary, summarize_record};
use crate::config::SelfPlayConfig;
use crate::error::{BatchError, ConfigError};
use crate::game::{CancelToken, Game, GameSettings, Outcome};
use crate::pgn::PgnWriter;
use crate::record::GameRecord;

/// One line of the results log.
#[derive(Debug, Clone, Serialize)]
pub struct GameResultLine {
    /// 0-based position in the batch.
    pub game: usize,
    pub white_profile: String,
    pub black_profile: String,
    pub engine: String,
    pub seed: u64,
    pub result: String,
    pub outcome: Option<Outcome>,
    pub plies: usize,
    pub pgn: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_detail: Option<String>,
    pub summary: Summary,
}

/// Append-only NDJSON file shared by all workers.
pub struct ResultsLog {
    path: PathBuf,
    out: Mutex<BufWriter<File>>,
}

impl ResultsLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one complete line and flush it.
    pub fn append<T: Serialize>(&self, entry: &T) -> io::Result<()> {
        let line = serde_json::to_string(entry)?;
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}")?;
        out.flush()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub games: Vec<GameResultLine>,
    /// Result token (`1-0`, `0-1`, `1/2-1/2`, `*`) to count.
    pub outcome_counts: BTreeMap<String, usize>,
    pub aborted: usize,
}

impl BatchReport {
    fn new(games: Vec<GameResultLine>) -> Self {
        let mut outcome_counts = BTreeMap::new();
        for g in &games {
            *outcome_counts.entry(g.result.clone()).or_insert(0) += 1;
        }
        let aborted = games
            .iter()
            .filter(|g| g.outcome.is_none_or(Outcome::is_aborted))
            .count();
        Self {
            games,
            outcome_counts,
            aborted,
        }
    }
}

/// Plays `batch.games` games on a rayon pool.
pub struct BatchRunner {
    config: SelfPlayConfig,
    white: Arc<PersonalityProfile>,
    black: Arc<PersonalityProfile>,
    settings: GameSettings,
    writer: PgnWriter,
    cancel: CancelToken,
}

impl BatchRunner {
    pub fn new(config: SelfPlayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let library = config.profile_library()?;
        Self::with_library(config, &library)
    }

    pub fn with_library(config: SelfPlayConfig, library: &ProfileLibrary) -> Result<Self, ConfigError> {
        let (white, black) = config.side_profiles(library)?;
        let settings = GameSettings::from_config(&config)?;
        let writer = PgnWriter::new(config.output.verbose_annotations);
        Ok(Self {
            config,
            white,
            black,
            settings,
            writer,
            cancel: CancelToken::new(),
        })
    }

    /// Token that stops the batch after each running game's current ply.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run with gateways built from the config.
    pub fn run(&self) -> Result<BatchReport, BatchError> {
        self.run_with(|_| self.config.build_gateway())
    }

    /// Run with a gateway from `factory` for each game index.
    pub fn run_with<F>(&self, factory: F) -> Result<BatchReport, BatchError>
    where
        F: Fn(usize) -> Box<dyn EngineGateway> + Sync,
    {
        let log = match &self.config.output.results_log {
            Some(path) => Some(ResultsLog::open(path).map_err(|source| {
                BatchError::ResultsLog {
                    path: path.clone(),
                    source,
                }
            })?),
            None => None,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.batch.parallelism)
            .thread_name(|i| format!("selfplay-{i}"))
            .build()
            .map_err(|e| BatchError::Pool(e.to_string()))?;

        let games = self.config.batch.games as usize;
        info!(
            games,
            threads = pool.current_num_threads(),
            white = %self.white.name(),
            black = %self.black.name(),
            "batch started"
        );

        let lines: Vec<GameResultLine> = pool.install(|| {
            (0..games)
                .into_par_iter()
                .map(|index| {
                    let line = self.play_one(index, factory(index));
                    if let Some(log) = &log
                        && let Err(e) = log.append(&line)
                    {
                        warn!(path = %log.path().display(), error = %e, "cannot append result");
                    }
                    line
                })
                .collect()
        });

        let report = BatchReport::new(lines);
        info!(
            counts = ?report.outcome_counts,
            aborted = report.aborted,
            "batch finished"
        );
        Ok(report)
    }

    fn play_one(&self, index: usize, gateway: Box<dyn EngineGateway>) -> GameResultLine {
        let swap = self.config.batch.alternate_colors && index % 2 == 1;
        let (white, black) = if swap {
            (Arc::clone(&self.black), Arc::clone(&self.white))
        } else {
            (Arc::clone(&self.white), Arc::clone(&self.black))
        };

        let mut settings = self.settings.clone();
        settings.seed = self.config.batch.seed.map(|s| s.wrapping_add(index as u64));
        let record = Game::new(gateway, white, black, settings)
            .with_cancel(self.cancel.clone())
            .play();

        let pgn = match self.writer.save(&record, &self.config.output.pgn_dir, &self.config.output.prefix) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(game = index, error = %e, "cannot save PGN");
                None
            }
        };
        result_line(index, &record, pgn)
    }
}

fn result_line(index: usize, record: &GameRecord, pgn: Option<PathBuf>) -> GameResultLine {
    GameResultLine {
        game: index,
        white_profile: record.metadata.white_profile.clone(),
        black_profile: record.metadata.black_profile.clone(),
        engine: record.metadata.engine.clone(),
        seed: record.metadata.seed,
        result: record.result().to_string(),
        outcome: record.outcome(),
        plies: record.plies().len(),
        pgn,
        abort_detail: record.abort_detail().map(str::to_string),
        summary: summarize_record(record),
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod batch_tests;
