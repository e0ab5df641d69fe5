//! Terminal output for migration runs

pub mod reporter;

pub use reporter::{format_elapsed, Reporter, RunOutcome};
