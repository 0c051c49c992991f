//! `EngineGateway` over an external UCI engine.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chess_core::{
    CandidateMove, EngineError, EngineGateway, Move, Position, SearchLimits, parse_uci_move,
};
use tracing::{debug, info, warn};

use crate::info::{InfoLine, parse_bestmove, parse_id_name, parse_info};
use crate::process::EngineProcess;

/// How to launch and configure the engine.
#[derive(Debug, Clone)]
pub struct UciConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    pub hash_mb: Option<u32>,
    pub threads: Option<u32>,
    pub skill_level: Option<u8>,
    /// Extra `setoption` pairs sent after the standard ones.
    pub options: BTreeMap<String, String>,
    /// Bound on `uci`/`isready` round trips.
    pub handshake_timeout: Duration,
}

impl UciConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            hash_mb: None,
            threads: None,
            skill_level: None,
            options: BTreeMap::new(),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    fn setoptions(&self) -> Vec<(String, String)> {
        let mut opts = Vec::new();
        if let Some(hash) = self.hash_mb {
            opts.push(("Hash".to_string(), hash.to_string()));
        }
        if let Some(threads) = self.threads {
            opts.push(("Threads".to_string(), threads.to_string()));
        }
        if let Some(skill) = self.skill_level {
            opts.push(("Skill Level".to_string(), skill.to_string()));
        }
        opts.extend(self.options.iter().map(|(k, v)| (k.clone(), v.clone())));
        opts
    }
}

/// Drives a UCI engine process with MultiPV to obtain scored candidates.
///
/// The process starts lazily on the first request. After a timeout or a
/// crash it is killed, and the next request starts a fresh one, so output
/// from an abandoned search can never be read as the answer to a new one.
pub struct UciGateway {
    config: UciConfig,
    process: Option<EngineProcess>,
    name: String,
    multipv: Option<usize>,
}

impl UciGateway {
    pub fn new(config: UciConfig) -> Self {
        let name = config
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "uci".to_string());
        Self {
            config,
            process: None,
            name,
            multipv: None,
        }
    }

    /// Start the engine now instead of on the first request.
    pub fn connect(&mut self) -> Result<(), EngineError> {
        self.ensure_process().map(|_| ())
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    fn ensure_process(&mut self) -> Result<&mut EngineProcess, EngineError> {
        if self.process.is_none() {
            let (process, name) = self.launch()?;
            if let Some(name) = name {
                self.name = name;
            }
            self.multipv = None;
            self.process = Some(process);
        }
        self.process
            .as_mut()
            .ok_or_else(|| EngineError::Crashed("engine process unavailable".into()))
    }

    fn launch(&self) -> Result<(EngineProcess, Option<String>), EngineError> {
        let mut process = EngineProcess::spawn(&self.config.path, &self.config.args)?;
        let deadline = Some(Instant::now() + self.config.handshake_timeout);
        let handshake = |e: EngineError| match e {
            EngineError::Timeout(_) => EngineError::Handshake(format!(
                "{} did not answer within {:?}",
                self.config.path.display(),
                self.config.handshake_timeout
            )),
            other => other,
        };

        process.send("uci")?;
        let mut name = None;
        process
            .read_until(
                deadline,
                |line| {
                    if let Some(n) = parse_id_name(line) {
                        name = Some(n.to_string());
                    }
                },
                |line| line.trim() == "uciok",
            )
            .map_err(handshake)?;

        for (option, value) in self.config.setoptions() {
            process.send(&format!("setoption name {option} value {value}"))?;
        }
        process.send("isready")?;
        process
            .read_until(deadline, |_| {}, |line| line.trim() == "readyok")
            .map_err(handshake)?;

        info!(engine = name.as_deref().unwrap_or("unknown"), "UCI engine ready");
        Ok((process, name))
    }

    /// Kill the process so the next request starts a fresh one.
    fn discard(&mut self, reason: &EngineError) {
        if let Some(mut process) = self.process.take() {
            warn!(error = %reason, "restarting UCI engine on next request");
            process.kill();
        }
        self.multipv = None;
    }

    fn search(
        &mut self,
        pos: &Position,
        max_candidates: usize,
        limits: &SearchLimits,
    ) -> Result<Vec<CandidateMove>, EngineError> {
        let multipv = max_candidates.max(1);
        let current_multipv = self.multipv;
        let process = self.ensure_process()?;

        if current_multipv != Some(multipv) {
            process.send(&format!("setoption name MultiPV value {multipv}"))?;
        }
        let fen = pos.to_fen();
        process.send(&format!("position fen {fen}"))?;
        let mut go = format!("go depth {}", limits.depth.max(1));
        if let Some(mt) = limits.move_time {
            go.push_str(&format!(" movetime {}", mt.as_millis()));
        }
        process.send(&go)?;

        let deadline = limits.timeout.map(|t| Instant::now() + t);
        let mut lines: BTreeMap<u16, InfoLine> = BTreeMap::new();
        let last = process.read_until(
            deadline,
            |line| {
                if let Some(info) = parse_info(line)
                    && info.is_scored_line()
                {
                    lines.insert(info.multipv, info);
                }
            },
            |line| line.starts_with("bestmove"),
        );
        let last = match last {
            Ok(line) => line,
            Err(EngineError::Timeout(_)) => {
                return Err(EngineError::Timeout(limits.timeout.unwrap_or_default()));
            }
            Err(e) => return Err(e),
        };
        self.multipv = Some(multipv);

        let Some(best) = parse_bestmove(&last) else {
            return Err(EngineError::Malformed(last));
        };
        if best.is_none() || lines.is_empty() {
            return Err(EngineError::NoCandidates { fen });
        }

        let mut candidates = Vec::with_capacity(lines.len());
        for (rank, info) in lines.into_iter().take(multipv) {
            candidates.push(to_candidate(pos, rank, info)?);
        }
        debug!(
            engine = %self.name,
            best = %candidates[0].mv,
            score = %candidates[0].score,
            count = candidates.len(),
            "UCI candidates"
        );
        Ok(candidates)
    }
}

/// Turn a scored MultiPV line into a candidate, checking the whole PV
/// against the rules.
fn to_candidate(pos: &Position, rank: u16, info: InfoLine) -> Result<CandidateMove, EngineError> {
    let mut walk = pos.clone();
    let mut pv: Vec<Move> = Vec::with_capacity(info.pv.len());
    for text in &info.pv {
        match parse_uci_move(&walk, text) {
            Some(mv) => {
                walk.make_move(mv);
                pv.push(mv);
            }
            None if pv.is_empty() => {
                return Err(EngineError::IllegalMove {
                    mv: text.clone(),
                    fen: pos.to_fen(),
                });
            }
            // Only the first move is played; a bad tail is truncated.
            None => break,
        }
    }
    let score = info
        .score
        .ok_or_else(|| EngineError::Malformed(format!("multipv {rank} has no score")))?;
    Ok(CandidateMove {
        mv: pv[0],
        score,
        depth: info.depth.unwrap_or(0),
        rank,
        pv,
    })
}

impl EngineGateway for UciGateway {
    fn candidates(
        &mut self,
        pos: &Position,
        max_candidates: usize,
        limits: &SearchLimits,
    ) -> Result<Vec<CandidateMove>, EngineError> {
        let result = self.search(pos, max_candidates, limits);
        if let Err(
            e @ (EngineError::Timeout(_)
            | EngineError::Crashed(_)
            | EngineError::Io(_)
            | EngineError::Handshake(_)
            | EngineError::Malformed(_)),
        ) = &result
        {
            self.discard(e);
        }
        result
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn new_game(&mut self) -> Result<(), EngineError> {
        let timeout = self.config.handshake_timeout;
        let Some(process) = self.process.as_mut() else {
            return Ok(());
        };
        let result = process.send("ucinewgame").and_then(|()| {
            process.send("isready")?;
            process
                .read_until(
                    Some(Instant::now() + timeout),
                    |_| {},
                    |line| line.trim() == "readyok",
                )
                .map(|_| ())
        });
        if let Err(e) = &result {
            self.discard(e);
        }
        result
    }
}

impl Drop for UciGateway {
    fn drop(&mut self) {
        if let Some(process) = self.process.take() {
            process.shutdown(Duration::from_millis(200));
        }
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod gateway_tests;
