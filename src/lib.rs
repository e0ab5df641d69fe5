//! migctl: drive database schema migrations from layered configuration
//!
//! Resolves a connection from a default YAML document, an environment
//! document and process environment variables, then runs migration commands
//! through an external engine while streaming its progress to the terminal.

pub mod cli;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod render;

pub use error::{MigctlError, Result};
