//! Config document loading and section resolution

use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use super::overrides::apply_env_overrides;
use super::section::{ConfigSection, ValidatedConfig};
use crate::error::{MigctlError, Result};

/// Which top-level key of the merged document is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPart {
    /// Only the default document was readable.
    Default,
    /// The env document was loaded on top of the defaults.
    Config,
}

impl ConfigPart {
    pub fn key(self) -> &'static str {
        match self {
            ConfigPart::Default => "default",
            ConfigPart::Config => "config",
        }
    }
}

impl fmt::Display for ConfigPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// `configPart -> sectionName -> value`, as parsed from one or two documents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RawConfigDocument {
    parts: BTreeMap<String, Value>,
}

impl RawConfigDocument {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        // Parse to generic value first so an empty document is an empty tree
        let raw: Value = serde_yaml::from_str(content)
            .map_err(|source| MigctlError::ConfigParse { path: path.to_path_buf(), source })?;
        if raw.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(raw)
            .map_err(|source| MigctlError::ConfigParse { path: path.to_path_buf(), source })
    }

    /// Layer `other`'s top-level keys over this document's.
    pub fn layer(mut self, other: RawConfigDocument) -> Self {
        self.parts.extend(other.parts);
        self
    }

    pub fn section(&self, part: ConfigPart, name: &str) -> Option<&Value> {
        self.parts.get(part.key())?.get(name)
    }
}

/// A section as found in the documents, before environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSection {
    pub part: ConfigPart,
    pub section: ConfigSection,
}

/// Read both documents and extract `section_name` from the selected part.
///
/// The default document is mandatory. An unreadable env document only
/// downgrades the lookup to the `default` part.
pub fn load_section(default_path: &Path, env_path: &Path, section_name: &str) -> Result<LoadedSection> {
    let default_content = read_document(default_path)?;
    let mut document = RawConfigDocument::parse(&default_content, default_path)?;

    let part = match fs::read_to_string(env_path) {
        Ok(env_content) => {
            document = document.layer(RawConfigDocument::parse(&env_content, env_path)?);
            ConfigPart::Config
        }
        Err(e) => {
            tracing::warn!(
                "could not read env configuration {}, proceeding with defaults only: {}",
                env_path.display(),
                e
            );
            ConfigPart::Default
        }
    };

    let value = document.section(part, section_name).ok_or_else(|| {
        MigctlError::UndefinedSection { section: section_name.to_string(), part: part.to_string() }
    })?;

    let source_path = match part {
        ConfigPart::Config => env_path,
        ConfigPart::Default => default_path,
    };
    let section = serde_yaml::from_value(value.clone())
        .map_err(|source| MigctlError::ConfigParse { path: source_path.to_path_buf(), source })?;

    Ok(LoadedSection { part, section })
}

/// Load, override and validate one section.
///
/// Document errors are not fatal: the section then starts empty and relies on
/// environment overrides alone. Validation errors are returned.
pub fn resolve<F>(
    default_path: &Path,
    env_path: &Path,
    section_name: &str,
    lookup: F,
) -> Result<ValidatedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut section = match load_section(default_path, env_path, section_name) {
        Ok(loaded) => {
            tracing::debug!("loaded section '{}' from config part '{}'", section_name, loaded.part);
            loaded.section
        }
        Err(e) => {
            tracing::warn!("{}, trying environment variables", e);
            ConfigSection::default()
        }
    };

    apply_env_overrides(&mut section, section_name, lookup);
    section.validate()
}

fn read_document(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|source| MigctlError::ConfigRead { path: path.to_path_buf(), source })
}
