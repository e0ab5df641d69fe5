//! Layered configuration
//!
//! Resolves one named section from a default document, an optional
//! environment document and process environment variables, with precedence
//! Env vars > Env document > Default document.

pub mod loader;
pub mod overrides;
pub mod section;

pub use loader::{load_section, resolve, ConfigPart, LoadedSection, RawConfigDocument};
pub use overrides::{apply_env_overrides, override_vars, OverrideVars};
pub use section::{ConfigSection, ValidatedConfig};
