//! A child engine process with line-oriented, deadline-aware I/O.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chess_core::EngineError;
use tracing::{debug, trace};

/// Running engine. Stdout is drained by a reader thread into a channel so
/// reads can give up at a deadline without blocking on the pipe.
pub struct EngineProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    lines: Receiver<String>,
}

impl EngineProcess {
    pub fn spawn(path: &Path, args: &[String]) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Crashed("engine stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Crashed("engine stdout unavailable".into()))?;

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("uci-reader".into())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })?;

        debug!(path = %path.display(), pid = child.id(), "engine process started");
        Ok(Self {
            child,
            stdin: BufWriter::new(stdin),
            lines: rx,
        })
    }

    pub fn send(&mut self, command: &str) -> Result<(), EngineError> {
        trace!(%command, "> engine");
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Next line, or `Timeout` once `deadline` passes. `None` waits forever.
    pub fn read_line(&self, deadline: Option<Instant>) -> Result<String, EngineError> {
        let line = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match self.lines.recv_timeout(remaining) {
                    Ok(line) => line,
                    Err(RecvTimeoutError::Timeout) => return Err(EngineError::Timeout(remaining)),
                    Err(RecvTimeoutError::Disconnected) => return Err(self.exited()),
                }
            }
            None => self.lines.recv().map_err(|_| self.exited())?,
        };
        trace!(%line, "< engine");
        Ok(line)
    }

    /// Read until a line satisfies `done`, passing every line to `seen`.
    pub fn read_until(
        &self,
        deadline: Option<Instant>,
        mut seen: impl FnMut(&str),
        done: impl Fn(&str) -> bool,
    ) -> Result<String, EngineError> {
        loop {
            let line = self.read_line(deadline)?;
            if done(&line) {
                return Ok(line);
            }
            seen(&line);
        }
    }

    fn exited(&self) -> EngineError {
        EngineError::Crashed(format!("pid {} closed its output", self.child.id()))
    }

    /// Ask the engine to quit, then make sure it is gone.
    pub fn shutdown(mut self, grace: Duration) {
        let _ = self.send("quit");
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        self.kill();
    }

    /// Terminate immediately, discarding any pending output.
    pub fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        debug!(pid = self.child.id(), "engine process killed");
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            self.kill();
        }
    }
}
