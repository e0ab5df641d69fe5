//! Migration file naming, discovery and creation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use super::{Direction, MigrationFilePair};
use crate::error::{MigctlError, Result};

static MIGRATION_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)_(.+)\.(up|down)\.sql$").expect("valid migration file regex")
});

/// Version numbers are zero-padded to a multiple of this many digits.
const VERSION_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub version: u64,
    pub name: String,
    pub direction: Direction,
    pub file_name: String,
}

impl MigrationFile {
    /// Parse `0007_add_users.up.sql` style names. Other files yield `None`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = MIGRATION_FILE.captures(file_name)?;
        let version = caps[1].parse().ok()?;
        let direction = match &caps[3] {
            "up" => Direction::Up,
            _ => Direction::Down,
        };
        Some(Self { version, name: caps[2].to_string(), direction, file_name: file_name.to_string() })
    }
}

/// List migration files in `dir`, sorted by version then direction.
///
/// A missing directory has no migrations.
pub fn scan_migration_files(dir: &Path) -> Result<Vec<MigrationFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(MigctlError::engine(format!(
                "failed reading migration dir {}: {}",
                dir.display(),
                e
            )))
        }
    };

    let mut files: Vec<MigrationFile> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str().and_then(MigrationFile::parse))
        .collect();
    files.sort_by_key(|f| (f.version, f.direction == Direction::Down));
    Ok(files)
}

/// Find the file for `version` in `direction`.
pub fn find_file(files: &[MigrationFile], version: u64, direction: Direction) -> Option<&MigrationFile> {
    files.iter().find(|f| f.version == version && f.direction == direction)
}

/// Write an empty up/down pair at the version after the highest one in `dir`.
pub fn create_migration_files(dir: &Path, name: &str) -> Result<MigrationFilePair> {
    let name = name.trim().replace(' ', "_");
    if name.is_empty() {
        return Err(MigctlError::usage("Please specify name."));
    }

    let existing = scan_migration_files(dir)?;
    let version = existing.iter().map(|f| f.version).max().unwrap_or(0) + 1;
    let version_str = pad_version(version);

    fs::create_dir_all(dir).map_err(|e| {
        MigctlError::engine(format!("failed creating migration dir {}: {}", dir.display(), e))
    })?;

    let up = write_empty(dir, &version_str, &name, Direction::Up, version)?;
    let down = match write_empty(dir, &version_str, &name, Direction::Down, version) {
        Ok(down) => down,
        Err(e) => {
            // never leave a half-created pair behind
            if let Err(cleanup) = fs::remove_file(dir.join(&up.file_name)) {
                tracing::warn!("failed removing {}: {}", up.file_name, cleanup);
            }
            return Err(e);
        }
    };
    tracing::debug!("created {} and {}", up.file_name, down.file_name);

    Ok(MigrationFilePair { version, up, down })
}

fn pad_version(version: u64) -> String {
    let digits = version.to_string();
    let rem = digits.len() % VERSION_WIDTH;
    if rem == 0 {
        digits
    } else {
        format!("{}{}", "0".repeat(VERSION_WIDTH - rem), digits)
    }
}

fn write_empty(
    dir: &Path,
    version_str: &str,
    name: &str,
    direction: Direction,
    version: u64,
) -> Result<MigrationFile> {
    let file_name = format!("{}_{}.{}.sql", version_str, name, direction.suffix());
    let path = dir.join(&file_name);
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| MigctlError::engine(format!("failed creating {}: {}", path.display(), e)))?;

    Ok(MigrationFile { version, name: name.to_string(), direction, file_name })
}
