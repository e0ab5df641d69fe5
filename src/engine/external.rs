//! Engine adapter for a golang-migrate compatible `migrate` executable.
//!
//! Version tracking and step execution are delegated to the executable;
//! migration files are created natively. Output lines from a run are
//! classified into [`ExecutionEvent`]s and sent from a producer thread.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use super::files::{create_migration_files, find_file, scan_migration_files, MigrationFile};
use super::{AsyncOperation, Direction, ExecutionEvent, MigrationEngine, MigrationFilePair};
use crate::connection::ConnectionDescriptor;
use crate::error::{MigctlError, Result};

pub const DEFAULT_ENGINE_PROGRAM: &str = "migrate";

/// `log.Printf` style prefix the engine puts in front of its lines.
static LOG_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)? ").expect("valid log prefix regex")
});

/// `3/u add_users (12.3ms)`
static STEP_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)/(u|d) (\S+)").expect("valid step line regex"));

/// `5` or `5 (dirty)`
static VERSION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(\s+\(dirty\))?$").expect("valid version line regex"));

#[derive(Debug, Clone)]
pub struct ExternalEngine {
    program: PathBuf,
}

impl ExternalEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    fn command(&self, conn: &ConnectionDescriptor, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-path").arg(&conn.migration_dir).arg("-database").arg(&conn.url).args(args);
        tracing::debug!(
            "engine command: {} -path {} -database {} {}",
            self.program.display(),
            conn.migration_dir,
            conn.redacted_url(),
            args.join(" ")
        );
        cmd
    }
}

impl MigrationEngine for ExternalEngine {
    fn create(&self, conn: &ConnectionDescriptor, name: &str) -> Result<MigrationFilePair> {
        create_migration_files(Path::new(&conn.migration_dir), name)
    }

    fn version(&self, conn: &ConnectionDescriptor) -> Result<u64> {
        let output = self
            .command(conn, &["version".to_string()])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&self.program, &e))?;

        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        parse_version_output(&text, output.status.success())
    }

    fn run_async(
        &self,
        op: AsyncOperation,
        conn: &ConnectionDescriptor,
    ) -> Receiver<ExecutionEvent> {
        let (tx, rx) = mpsc::channel();
        let phases = phases(op);
        if phases.is_empty() {
            tx.send(ExecutionEvent::InfoLine("no change".to_string())).ok();
            return rx;
        }

        let engine = self.clone();
        let conn = conn.clone();
        thread::spawn(move || {
            let files = scan_migration_files(Path::new(&conn.migration_dir)).unwrap_or_else(|e| {
                tracing::debug!("step names will not be resolved: {}", e);
                Vec::new()
            });
            for args in &phases {
                if !engine.run_phase(&conn, args, &files, &tx) {
                    break;
                }
            }
        });
        rx
    }
}

impl ExternalEngine {
    /// Run one engine invocation, forwarding its output. Returns `true` on success.
    fn run_phase(
        &self,
        conn: &ConnectionDescriptor,
        args: &[String],
        files: &[MigrationFile],
        tx: &Sender<ExecutionEvent>,
    ) -> bool {
        let mut child = match self
            .command(conn, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tx.send(ExecutionEvent::Failure(spawn_error(&self.program, &e).to_string())).ok();
                return false;
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        // The engine logs everything to stderr; stdout is forwarded for
        // completeness and is only ordered relative to itself.
        let reported_failure = thread::scope(|scope| {
            let out_tx = tx.clone();
            let out = scope.spawn(move || stdout.map_or(false, |s| forward_lines(s, &out_tx, files)));
            let err = stderr.map_or(false, |s| forward_lines(s, tx, files));
            // a panicked reader counts as a failure
            out.join().unwrap_or(true) || err
        });

        match child.wait() {
            Ok(status) if status.success() => !reported_failure,
            Ok(status) => {
                if !reported_failure {
                    tx.send(ExecutionEvent::Failure(format!("migration engine exited with {}", status)))
                        .ok();
                }
                false
            }
            Err(e) => {
                tx.send(ExecutionEvent::Failure(format!("failed waiting for migration engine: {}", e)))
                    .ok();
                false
            }
        }
    }
}

/// Engine invocations for `op`, run in order until one fails.
fn phases(op: AsyncOperation) -> Vec<Vec<String>> {
    let args = |parts: &[&str]| parts.iter().map(|p| p.to_string()).collect::<Vec<_>>();
    match op {
        AsyncOperation::Up => vec![args(&["up"])],
        AsyncOperation::Down => vec![args(&["down", "-all"])],
        AsyncOperation::Reset => vec![args(&["down", "-all"]), args(&["up"])],
        AsyncOperation::Redo => vec![args(&["down", "1"]), args(&["up", "1"])],
        AsyncOperation::Migrate(0) => Vec::new(),
        AsyncOperation::Migrate(n) if n > 0 => vec![vec!["up".to_string(), n.to_string()]],
        AsyncOperation::Migrate(n) => vec![vec!["down".to_string(), n.unsigned_abs().to_string()]],
    }
}

/// Send one event per output line. Returns whether any line reported an error.
fn forward_lines<R: Read>(reader: R, tx: &Sender<ExecutionEvent>, files: &[MigrationFile]) -> bool {
    let mut saw_failure = false;
    for chunk in BufReader::new(reader).split(b'\n') {
        let Ok(bytes) = chunk else { break };
        let event = match String::from_utf8(bytes) {
            Ok(line) => {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                classify_line(line, files)
            }
            Err(e) => ExecutionEvent::Other(Box::new(RawLine(e.into_bytes()))),
        };
        saw_failure |= matches!(event, ExecutionEvent::Failure(_));
        if tx.send(event).is_err() {
            break;
        }
    }
    saw_failure
}

/// Turn one engine output line into an event.
pub fn classify_line(line: &str, files: &[MigrationFile]) -> ExecutionEvent {
    let text = LOG_PREFIX.replace(line, "");

    if let Some(message) = text.strip_prefix("error:") {
        return ExecutionEvent::Failure(message.trim().to_string());
    }

    if let Some(caps) = STEP_LINE.captures(&text) {
        if let Ok(version) = caps[1].parse::<u64>() {
            let direction = if &caps[2] == "u" { Direction::Up } else { Direction::Down };
            let file_name = find_file(files, version, direction)
                .map(|f| f.file_name.clone())
                .unwrap_or_else(|| format!("{}_{}.{}.sql", version, &caps[3], direction.suffix()));
            return ExecutionEvent::StepApplied { direction, file_name };
        }
    }

    ExecutionEvent::InfoLine(line.to_string())
}

/// Interpret the output of `migrate version`.
pub fn parse_version_output(text: &str, success: bool) -> Result<u64> {
    for line in text.lines() {
        let line = LOG_PREFIX.replace(line.trim(), "");
        if line.contains("no migration") {
            return Ok(0);
        }
        if let Some(caps) = VERSION_LINE.captures(&line) {
            if let Ok(version) = caps[1].parse() {
                if caps.get(2).is_some() {
                    tracing::warn!("database is dirty at version {}", version);
                }
                return Ok(version);
            }
        }
    }

    let message = text
        .lines()
        .map(|l| LOG_PREFIX.replace(l.trim(), "").into_owned())
        .find(|l| !l.is_empty())
        .map(|l| l.trim_start_matches("error:").trim().to_string());
    match (message, success) {
        (Some(message), _) => Err(MigctlError::Engine(message)),
        (None, true) => Err(MigctlError::engine("migration engine reported no version")),
        (None, false) => Err(MigctlError::engine("migration engine failed without output")),
    }
}

fn spawn_error(program: &Path, e: &std::io::Error) -> MigctlError {
    MigctlError::engine(format!("failed to start migration engine '{}': {}", program.display(), e))
}

/// Output that is not valid UTF-8, shown lossily.
struct RawLine(Vec<u8>);

impl fmt::Display for RawLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(String::from_utf8_lossy(&self.0).trim_end())
    }
}
