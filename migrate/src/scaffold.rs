//! Scaffolding for new migration file pairs.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::core::up_migrations;
use crate::error::Error;
use crate::fileset::{load_files, DirFs};

/// Create the next `NNN_name.up.sql` / `NNN_name.down.sql` pair in `dir`,
/// creating the directory when absent.
///
/// The version is one past the highest existing up-migration; the name is
/// snake-cased. Both files are written empty and logged.
pub fn new_migration(dir: impl AsRef<Path>, name: &str) -> Result<(), Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let files = load_files(&DirFs::new(dir))?;
    let migrations = up_migrations(&files)?;
    let latest = migrations.last().map(|m| m.version).unwrap_or(0);
    let stem = format!("{}_{}", pad(latest + 1), snake(name));

    let up_path = dir.join(format!("{stem}.up.sql"));
    fs::write(&up_path, "")?;
    info!("wrote: {}", up_path.display());

    let down_path = dir.join(format!("{stem}.down.sql"));
    fs::write(&down_path, "")?;
    info!("wrote: {}", down_path.display());

    Ok(())
}

/// Zero-pad to width 3; versions past 999 keep their natural width.
fn pad(version: u32) -> String {
    format!("{version:03}")
}

/// Lowercase the name, mapping runs of non-alphanumerics to single
/// underscores.
fn snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}
