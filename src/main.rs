//! migctl: drive database schema migrations from layered configuration

use anyhow::Result;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    migctl::cli::run()
}
