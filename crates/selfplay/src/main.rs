//! Self-play CLI
//!
//! Play personality-biased games and audit the PGN they produce.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use selfplay::config::EngineKind;
use selfplay::{
    BatchRunner, Game, GameSettings, PgnWriter, SelfPlayConfig, check_game, interrupt, move_agreement,
    pgn, summarize,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "selfplay")]
#[command(about = "Personality-biased chess self-play", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game and write its PGN
    Play {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Play many games, writing PGNs and the results log
    Batch {
        #[command(flatten)]
        overrides: Overrides,
        /// Number of games
        #[arg(short, long)]
        games: Option<u32>,
        /// Worker threads (0 = one per CPU)
        #[arg(short, long)]
        parallelism: Option<usize>,
    },
    /// Check a game's annotations; exits 1 when errors are found
    Check { pgn: PathBuf },
    /// Print summary statistics for a game as JSON
    Summary { pgn: PathBuf },
    /// Print how often the chosen move was the engine's best
    Agreement { pgn: PathBuf },
    /// List the available personality profiles
    Profiles,
}

/// Command-line values that take precedence over the config file.
#[derive(Args)]
struct Overrides {
    /// Profile for white
    #[arg(long)]
    white: Option<String>,
    /// Profile for black
    #[arg(long)]
    black: Option<String>,
    /// Search depth
    #[arg(short, long)]
    depth: Option<u8>,
    /// Search depth for white's moves
    #[arg(long)]
    depth_white: Option<u8>,
    /// Search depth for black's moves
    #[arg(long)]
    depth_black: Option<u8>,
    /// Plies before the game is adjudicated a draw
    #[arg(long)]
    max_plies: Option<u32>,
    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,
    /// UCI engine binary
    #[arg(long)]
    engine_path: Option<PathBuf>,
    /// Use the built-in classical engine instead of a UCI binary
    #[arg(long)]
    classical: bool,
}

impl Overrides {
    fn apply(self, config: &mut SelfPlayConfig) {
        if let Some(white) = self.white {
            config.profiles.white = white;
        }
        if let Some(black) = self.black {
            config.profiles.black = black;
        }
        if let Some(depth) = self.depth {
            config.engine.depth = depth;
        }
        if self.depth_white.is_some() {
            config.engine.depth_white = self.depth_white;
        }
        if self.depth_black.is_some() {
            config.engine.depth_black = self.depth_black;
        }
        if let Some(max_plies) = self.max_plies {
            config.game.max_plies = max_plies;
        }
        if let Some(seed) = self.seed {
            config.batch.seed = Some(seed);
        }
        if let Some(path) = self.engine_path {
            config.engine.kind = EngineKind::Uci;
            config.engine.path = path;
        }
        if self.classical {
            config.engine.kind = EngineKind::Classical;
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SelfPlayConfig> {
    match path {
        Some(path) => SelfPlayConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SelfPlayConfig::default()),
    }
}

fn play(mut config: SelfPlayConfig, overrides: Overrides) -> Result<()> {
    overrides.apply(&mut config);
    config.validate()?;
    let library = config.profile_library()?;
    let (white, black) = config.side_profiles(&library)?;
    let settings = GameSettings::from_config(&config)?;

    let record = Game::new(config.build_gateway(), white, black, settings).play();
    let writer = PgnWriter::new(config.output.verbose_annotations);
    let path = writer
        .save(&record, &config.output.pgn_dir, &config.output.prefix)
        .context("saving PGN")?;

    match record.outcome() {
        Some(outcome) => println!("{} ({outcome}, {} plies)", record.result(), record.plies().len()),
        None => println!("{}", record.result()),
    }
    if let Some(detail) = record.abort_detail() {
        println!("aborted: {detail}");
    }
    println!("{}", path.display());
    Ok(())
}

fn batch(
    mut config: SelfPlayConfig,
    overrides: Overrides,
    games: Option<u32>,
    parallelism: Option<usize>,
) -> Result<()> {
    overrides.apply(&mut config);
    if let Some(games) = games {
        config.batch.games = games;
    }
    if let Some(parallelism) = parallelism {
        config.batch.parallelism = parallelism;
    }
    let runner = BatchRunner::new(config)?;
    interrupt::cancel_on_interrupt(runner.cancel_token()).context("installing Ctrl-C handler")?;
    let report = runner.run()?;

    for line in &report.games {
        let pgn = line
            .pgn
            .as_ref()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string());
        println!(
            "Game {}: {} vs {}  {}  ({} plies)  {}",
            line.game + 1,
            line.white_profile,
            line.black_profile,
            line.result,
            line.plies,
            pgn
        );
    }
    println!();
    for (result, count) in &report.outcome_counts {
        println!("{result:>8}: {count}");
    }
    if report.aborted > 0 {
        println!("aborted: {}", report.aborted);
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Play { overrides } => play(load_config(config_path)?, overrides)?,
        Commands::Batch {
            overrides,
            games,
            parallelism,
        } => batch(load_config(config_path)?, overrides, games, parallelism)?,
        Commands::Check { pgn: path } => {
            let game = pgn::load(&path)?;
            let report = check_game(&game);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_ok() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Summary { pgn: path } => {
            let game = pgn::load(&path)?;
            println!("{}", serde_json::to_string_pretty(&summarize(&game))?);
        }
        Commands::Agreement { pgn: path } => {
            let game = pgn::load(&path)?;
            match move_agreement(&game) {
                Some(pct) => println!("Move Agreement: {pct:.2}%"),
                None => println!("Move Agreement: n/a (no best-move annotations)"),
            }
        }
        Commands::Profiles => {
            let config = load_config(config_path)?;
            let library = config.profile_library()?;
            for (profile, source) in library.iter() {
                println!(
                    "{:<14} budget={:<6} temperature={:<5} {}",
                    profile.name(),
                    profile.risk_budget(),
                    profile.temperature(),
                    source
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
