//! Search limits handed to engine gateways.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// What a gateway may spend on one request.
///
/// `depth` and `move_time` are forwarded to the engine. `timeout` is the
/// caller's hard bound on the whole request: a gateway that has not answered
/// by then reports `EngineError::Timeout`.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    /// Maximum search depth in plies (half-moves)
    pub depth: u8,
    /// Engine-side time budget for this move (None = depth only)
    pub move_time: Option<Duration>,
    /// Caller-side deadline for the request (None = wait forever)
    pub timeout: Option<Duration>,
    /// Stop flag and clock shared with in-process searches
    pub time_control: TimeControl,
}

impl SearchLimits {
    /// Create limits with only depth constraint (no time limit).
    pub fn depth(depth: u8) -> Self {
        Self {
            depth,
            move_time: None,
            timeout: None,
            time_control: TimeControl::new(None),
        }
    }

    /// Create limits with both depth and time constraints.
    pub fn depth_and_time(depth: u8, move_time: Duration) -> Self {
        Self {
            move_time: Some(move_time),
            time_control: TimeControl::new(Some(move_time)),
            ..Self::depth(depth)
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fresh limits with the same settings and a reset clock.
    pub fn renewed(&self) -> Self {
        let budget = match (self.move_time, self.timeout) {
            (Some(m), Some(t)) => Some(m.min(t)),
            (m, t) => m.or(t),
        };
        Self {
            depth: self.depth,
            move_time: self.move_time,
            timeout: self.timeout,
            time_control: TimeControl::new(budget),
        }
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        self.time_control.is_stopped()
    }

    /// Start the clock. Call this when the request begins.
    pub fn start(&self) {
        self.time_control.start();
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::depth(4)
    }
}

/// Thread-safe stop flag plus clock.
///
/// Cheap to clone; clones share the flag, so another thread can stop a
/// running search.
#[derive(Debug, Clone)]
pub struct TimeControl {
    stopped: Arc<AtomicBool>,
    start_time: Arc<Mutex<Option<Instant>>>,
    time_limit: Option<Duration>,
    /// Clock is consulted every `check_interval` nodes.
    check_interval: u64,
}

impl TimeControl {
    pub fn new(time_limit: Option<Duration>) -> Self {
        Self {
            stopped: Arc::new(AtomicBool::new(false)),
            start_time: Arc::new(Mutex::new(None)),
            time_limit,
            check_interval: 1024,
        }
    }

    pub fn start(&self) {
        *self
            .start_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.stopped.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Check the clock and raise the stop flag once the limit has passed.
    pub fn check_time(&self) -> bool {
        if self.is_stopped() {
            return true;
        }
        if let Some(limit) = self.time_limit
            && self.elapsed() >= limit
        {
            self.stop();
            return true;
        }
        false
    }

    #[inline]
    pub fn should_check_time(&self, nodes: u64) -> bool {
        nodes.is_multiple_of(self.check_interval)
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    pub fn elapsed(&self) -> Duration {
        let start = *self
            .start_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        start.map(|s| s.elapsed()).unwrap_or(Duration::ZERO)
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
#[path = "time_control_tests.rs"]
mod time_control_tests;
