//! Personality-biased self-play.
//!
//! One engine plays both sides. At every ply it proposes scored candidates,
//! and the side to move's personality profile chooses among those within its
//! risk budget. Finished games are written as annotated PGN, and the
//! annotations can be audited and summarized afterwards.
//!
//! # Usage
//!
//! ```bash
//! # One game with the settings in selfplay.toml
//! cargo run -p selfplay -- --config selfplay.toml play
//!
//! # Twenty games on four threads
//! cargo run -p selfplay -- --config selfplay.toml batch --games 20 --parallelism 4
//!
//! # Audit a game's annotations
//! cargo run -p selfplay -- check data/selfplay_20250101-120000.pgn
//! ```

pub mod analysis;
pub mod batch;
pub mod config;
mod error;
pub mod game;
pub mod interrupt;
pub mod pgn;
pub mod record;

pub use analysis::{CheckReport, Summary, check_game, move_agreement, summarize, summarize_record};
pub use batch::{BatchReport, BatchRunner, GameResultLine, ResultsLog};
pub use config::{EngineKind, SelfPlayConfig};
pub use error::{BatchError, ConfigError, GameError, PgnError};
pub use game::{AbortReason, CancelToken, Game, GameSettings, GameState, Outcome};
pub use pgn::{PgnGame, PgnMove, PgnWriter};
pub use record::{GameMetadata, GameRecord, PlyRecord};
