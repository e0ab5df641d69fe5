//! Migration engine boundary
//!
//! The engine owns migration semantics. This module defines what the tool
//! asks of it: synchronous `create`/`version` calls, and asynchronous runs that
//! report progress as a stream of [`ExecutionEvent`]s over a channel.

use std::fmt;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use crate::connection::ConnectionDescriptor;
use crate::error::Result;

pub mod external;
pub mod files;

pub use external::ExternalEngine;
pub use files::{create_migration_files, scan_migration_files, MigrationFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Marker printed in front of an applied step.
    pub fn marker(self) -> &'static str {
        match self {
            Direction::Up => ">",
            Direction::Down => "<",
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// One progress notification from an asynchronous run.
pub enum ExecutionEvent {
    InfoLine(String),
    Failure(String),
    StepApplied { direction: Direction, file_name: String },
    /// Anything else the engine wants shown, rendered through `Display`.
    Other(Box<dyn fmt::Display + Send>),
}

impl fmt::Debug for ExecutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionEvent::InfoLine(text) => f.debug_tuple("InfoLine").field(text).finish(),
            ExecutionEvent::Failure(text) => f.debug_tuple("Failure").field(text).finish(),
            ExecutionEvent::StepApplied { direction, file_name } => f
                .debug_struct("StepApplied")
                .field("direction", direction)
                .field("file_name", file_name)
                .finish(),
            ExecutionEvent::Other(value) => {
                f.debug_tuple("Other").field(&value.to_string()).finish()
            }
        }
    }
}

/// Operations that run in the background and stream events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncOperation {
    Up,
    Down,
    Reset,
    Redo,
    /// Relative step count: positive applies, negative reverts.
    Migrate(i64),
}

impl fmt::Display for AsyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncOperation::Up => f.write_str("up"),
            AsyncOperation::Down => f.write_str("down"),
            AsyncOperation::Reset => f.write_str("reset"),
            AsyncOperation::Redo => f.write_str("redo"),
            AsyncOperation::Migrate(n) => write!(f, "migrate {}", n),
        }
    }
}

/// The up/down pair written by `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFilePair {
    pub version: u64,
    pub up: MigrationFile,
    pub down: MigrationFile,
}

pub trait MigrationEngine {
    /// Create a paired up/down migration at the next version.
    fn create(&self, conn: &ConnectionDescriptor, name: &str) -> Result<MigrationFilePair>;

    /// Current schema version of the target database.
    fn version(&self, conn: &ConnectionDescriptor) -> Result<u64>;

    /// Start `op` on a background task. The stream closes when the run ends.
    fn run_async(&self, op: AsyncOperation, conn: &ConnectionDescriptor)
        -> Receiver<ExecutionEvent>;
}

/// A started asynchronous run: when it started and where its events arrive.
#[derive(Debug)]
pub struct AsyncRun {
    pub started: Instant,
    pub events: Receiver<ExecutionEvent>,
}

/// Start the timer, then hand `op` to the engine.
pub fn start_async<E>(engine: &E, op: AsyncOperation, conn: &ConnectionDescriptor) -> AsyncRun
where
    E: MigrationEngine + ?Sized,
{
    let started = Instant::now();
    tracing::debug!("starting async '{}' against {}", op, conn.redacted_url());
    let events = engine.run_async(op, conn);
    AsyncRun { started, events }
}
