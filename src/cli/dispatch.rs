//! Sub-command parsing and routing to the migration engine.

use anyhow::Result;
use std::io::Write;

use super::Commands;
use crate::connection::ConnectionDescriptor;
use crate::engine::{start_async, AsyncOperation, MigrationEngine};
use crate::error::MigctlError;
use crate::render::Reporter;

/// A validated request for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create { name: String },
    Version,
    Goto { target: u64 },
    Async(AsyncOperation),
}

impl Operation {
    /// Check positional arguments. `None` means "show usage".
    pub fn from_command(command: Option<&Commands>) -> std::result::Result<Option<Self>, MigctlError> {
        let Some(command) = command else {
            return Ok(None);
        };

        let operation = match command {
            Commands::Create { name } => Operation::Create { name: parse_name(name.as_deref())? },
            Commands::Migrate { n } => {
                Operation::Async(AsyncOperation::Migrate(parse_relative_steps(n.as_deref())?))
            }
            Commands::Up => Operation::Async(AsyncOperation::Up),
            Commands::Down => Operation::Async(AsyncOperation::Down),
            Commands::Reset => Operation::Async(AsyncOperation::Reset),
            Commands::Redo => Operation::Async(AsyncOperation::Redo),
            Commands::Version => Operation::Version,
            Commands::Goto { v } => Operation::Goto { target: parse_target_version(v.as_deref())? },
            Commands::Help | Commands::External(_) => return Ok(None),
        };
        Ok(Some(operation))
    }
}

fn parse_name(name: Option<&str>) -> std::result::Result<String, MigctlError> {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(MigctlError::usage("Please specify name.")),
    }
}

pub fn parse_relative_steps(n: Option<&str>) -> std::result::Result<i64, MigctlError> {
    n.and_then(|n| n.trim().parse().ok())
        .ok_or_else(|| MigctlError::usage("Unable to parse param <n>."))
}

pub fn parse_target_version(v: Option<&str>) -> std::result::Result<u64, MigctlError> {
    v.and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| MigctlError::usage("Unable to parse param <v>."))
}

/// Relative step count that moves `current` to `target`.
pub fn goto_offset(target: u64, current: u64) -> i64 {
    let target = i64::try_from(target).unwrap_or(i64::MAX);
    let current = i64::try_from(current).unwrap_or(i64::MAX);
    target.saturating_sub(current)
}

/// Run `operation` against `engine`, writing progress to `out`.
///
/// Returns whether the operation succeeded. Synchronous engine errors are
/// returned as errors; asynchronous failures only turn the result `false`.
pub fn dispatch<E, W>(
    engine: &E,
    operation: Operation,
    conn: &ConnectionDescriptor,
    mut out: W,
) -> Result<bool>
where
    E: MigrationEngine + ?Sized,
    W: Write,
{
    match operation {
        Operation::Create { name } => {
            let pair = engine.create(conn, &name)?;
            writeln!(out, "Version {} migration files created in {}:", pair.version, conn.migration_dir)?;
            writeln!(out, "{}", pair.up.file_name)?;
            writeln!(out, "{}", pair.down.file_name)?;
            Ok(true)
        }
        Operation::Version => {
            let version = engine.version(conn)?;
            writeln!(out, "{}", version)?;
            Ok(true)
        }
        Operation::Goto { target } => {
            let current = engine.version(conn)?;
            let offset = goto_offset(target, current);
            tracing::debug!("goto {}: current version {}, offset {}", target, current, offset);
            run_reported(engine, AsyncOperation::Migrate(offset), conn, out)
        }
        Operation::Async(op) => run_reported(engine, op, conn, out),
    }
}

fn run_reported<E, W>(
    engine: &E,
    op: AsyncOperation,
    conn: &ConnectionDescriptor,
    out: W,
) -> Result<bool>
where
    E: MigrationEngine + ?Sized,
    W: Write,
{
    let run = start_async(engine, op, conn);
    let outcome = Reporter::new(out).run(run)?;
    Ok(outcome.success)
}
