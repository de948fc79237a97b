//! External command execution with a bounded wait
//!
//! Every query and privileged action kmodctl performs is a short-lived child
//! process. The runner captures stdout/stderr on reader threads, polls the
//! child until it exits or the deadline passes, and always reaps it.
//!
//! Output is collected with a deadline as well: a grandchild (the `modprobe`
//! forked by `sudo`, say) can hold the pipes open after the direct child is
//! killed, and the caller must not wait for it.
use log::{debug, trace, warn};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long output may keep arriving after the child has exited or been killed.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub program: String,
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// First non-empty stderr line, or the exit status when stderr is silent.
    pub fn failure_reason(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        match stderr.lines().map(str::trim).find(|l| !l.is_empty()) {
            Some(line) => line.to_string(),
            None => match self.exit_code {
                Some(code) => format!("{} exited with status {}", self.program, code),
                None => format!("{} terminated by signal", self.program),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `program` with `args`, waiting at most the configured timeout.
    pub fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        debug!("running {} {}", program, args.join(" "));
        let start = Instant::now();

        let mut child = Command::new(program)
            .args(args)
            .env("LC_ALL", "C")
            .env("LANG", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = start + self.timeout;
        let waited = self.wait_with_deadline(&mut child, program, deadline);

        let drain_until = deadline.max(Instant::now()) + DRAIN_GRACE;
        let stdout = collect(stdout, drain_until);
        let stderr = collect(stderr, drain_until);
        let exit_code = waited?;

        let output = CommandOutput {
            program: program.to_string(),
            exit_code,
            stdout,
            stderr,
            duration: start.elapsed(),
        };
        trace!(
            "{} exited with {:?} after {:?}",
            program,
            output.exit_code,
            output.duration
        );
        Ok(output)
    }

    fn wait_with_deadline(
        &self,
        child: &mut Child,
        program: &str,
        deadline: Instant,
    ) -> Result<Option<i32>, CommandError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.code()),
                Ok(None) if Instant::now() >= deadline => {
                    warn!("{} timed out after {:?}, killing", program, self.timeout);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::Timeout {
                        program: program.to_string(),
                        timeout: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::Wait {
                        program: program.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Output read by `until`; a reader still blocked on an inherited pipe is
/// abandoned and its output dropped.
fn collect(output: Option<Receiver<Vec<u8>>>, until: Instant) -> Vec<u8> {
    match output {
        Some(rx) => match rx.recv_timeout(until.saturating_duration_since(Instant::now())) {
            Ok(buf) => buf,
            Err(_) => {
                debug!("output still open at deadline, dropping it");
                Vec::new()
            }
        },
        None => Vec::new(),
    }
}
