//! Ctrl-C handling for batch runs.
//!
//! The first interrupt cancels the batch so games in flight stop at their
//! next ply and still get written. A second interrupt exits at once.

use std::io;
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::game::CancelToken;

/// Exit status for a second interrupt, as shells report SIGINT.
const INTERRUPTED_EXIT: i32 = 130;

/// Cancel `token` on the first Ctrl-C and exit on the second.
pub fn cancel_on_interrupt(token: CancelToken) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;
    Ok(spawn_canceller(
        token,
        move || runtime.block_on(tokio::signal::ctrl_c()),
        || std::process::exit(INTERRUPTED_EXIT),
    ))
}

/// Block on `wait` in its own thread. Its first `Ok` cancels `token`, and a
/// second one runs `on_repeat`. Once the signal handler is installed the
/// default SIGINT action is gone, so the repeat has to be handled here.
pub(crate) fn spawn_canceller<W, R>(token: CancelToken, mut wait: W, on_repeat: R) -> JoinHandle<()>
where
    W: FnMut() -> io::Result<()> + Send + 'static,
    R: FnOnce() + Send + 'static,
{
    thread::spawn(move || {
        if let Err(e) = wait() {
            warn!(error = %e, "cannot listen for Ctrl-C");
            return;
        }
        warn!("interrupted, finishing current plies (Ctrl-C again to quit)");
        token.cancel();
        if wait().is_ok() {
            on_repeat();
        }
    })
}

#[cfg(test)]
#[path = "interrupt_tests.rs"]
mod interrupt_tests;
