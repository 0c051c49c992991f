//! UCI engine gateway.
//!
//! [`UciGateway`] runs an external engine such as Stockfish and turns its
//! MultiPV output into scored [`chess_core::CandidateMove`]s. The
//! `classical-uci` binary in this crate serves the classical engine over the
//! same protocol.

pub mod gateway;
pub mod info;
mod process;

pub use gateway::{UciConfig, UciGateway};
pub use info::{Bound, InfoLine, parse_bestmove, parse_info};
