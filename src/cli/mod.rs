//! Command-line interface for migctl
//!
//! Resolves the connection from layered config, then hands the sub-command to
//! the migration engine.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config;
use crate::connection::ConnectionDescriptor;
use crate::engine::external::DEFAULT_ENGINE_PROGRAM;
use crate::engine::ExternalEngine;

mod dispatch;
mod utils;

pub use dispatch::{dispatch, goto_offset, Operation};
pub use utils::normalize_legacy_flags;

const BANNER_RULE: &str = "--------------------------------";

/// Drive database schema migrations from layered configuration
#[derive(Parser)]
#[command(name = "migctl")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
#[command(
    after_help = "Single-dash long flags such as -def=<path> are accepted for compatibility."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// The default configuration file
    #[arg(long = "def", value_name = "PATH", env = "MIGCTL_DEF", default_value = "env/default.yml")]
    default_config: PathBuf,

    /// The environment configuration file
    #[arg(long = "env", value_name = "PATH", env = "MIGCTL_ENV", default_value = "env/docker.yml")]
    env_config: PathBuf,

    /// The section from the config file
    #[arg(long, value_name = "NAME", env = "MIGCTL_SECTION", default_value = "db")]
    section: String,

    /// Migration engine executable
    #[arg(long, value_name = "PATH", env = "MIGCTL_ENGINE", default_value = DEFAULT_ENGINE_PROGRAM)]
    engine: PathBuf,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new migration
    Create {
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Apply migrations -n|+n
    Migrate {
        #[arg(value_name = "N", allow_hyphen_values = true)]
        n: Option<String>,
    },

    /// Apply all -up- migrations
    Up,

    /// Apply all -down- migrations
    Down,

    /// Down followed by Up
    Reset,

    /// Roll back most recent migration, then apply it again
    Redo,

    /// Show current migration version
    Version,

    /// Migrate to version v
    Goto {
        #[arg(value_name = "V", allow_hyphen_values = true)]
        v: Option<String>,
    },

    /// Show this help
    Help,

    #[command(external_subcommand)]
    External(Vec<String>),
}

pub fn run() -> Result<ExitCode> {
    let cli = match Cli::try_parse_from(normalize_legacy_flags(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            e.print()?;
            return Ok(parse_error_exit_code(e.kind()));
        }
    };

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let Some(operation) = Operation::from_command(cli.command.as_ref())? else {
        if let Some(Commands::External(args)) = &cli.command {
            tracing::debug!("unrecognized command {:?}", args);
        }
        Cli::command().write_help(&mut io::stderr())?;
        return Ok(ExitCode::SUCCESS);
    };

    print_banner(&cli);

    let config = config::resolve(&cli.default_config, &cli.env_config, &cli.section, |key| {
        std::env::var(key).ok()
    })?;
    let conn = ConnectionDescriptor::from_config(&config)?;
    tracing::debug!("connecting with {} from {}", conn.redacted_url(), conn.migration_dir);

    let engine = ExternalEngine::new(cli.engine);
    let success = dispatch(&engine, operation, &conn, io::stdout().lock())?;

    Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Help and version requests succeed; every other parse error is a usage failure.
fn parse_error_exit_code(kind: ErrorKind) -> ExitCode {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn print_banner(cli: &Cli) {
    println!("{}", BANNER_RULE);
    println!("Def config - {}", cli.default_config.display());
    println!("Env config - {}", cli.env_config.display());
    println!("Section - {}", cli.section);
    println!("{}", BANNER_RULE);
    println!();
}
