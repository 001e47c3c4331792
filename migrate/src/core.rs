//! Migration files and the rules for turning a file map into ordered work.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Error;

/// Direction a migration script moves the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// The marker the filename must carry, dots included.
    fn marker(self) -> &'static str {
        match self {
            Direction::Up => ".up.",
            Direction::Down => ".down.",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// The unit of work: one versioned SQL script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Normalized relative path, including the `.up.sql` / `.down.sql`
    /// suffix. This is what logs and the version reports print.
    pub name: String,
    /// Trimmed, dedented script body.
    pub code: String,
    pub direction: Direction,
    /// Positive version number parsed from the filename prefix.
    pub version: u32,
}

pub(crate) fn up_migrations(files: &BTreeMap<String, String>) -> Result<Vec<Migration>, Error> {
    to_migrations(files, Direction::Up)
}

pub(crate) fn down_migrations(files: &BTreeMap<String, String>) -> Result<Vec<Migration>, Error> {
    to_migrations(files, Direction::Down)
}

/// Turn a loaded file map into the sorted migration list for one direction.
///
/// Files whose basename carries no version prefix are ignored, so a README
/// next to the scripts is harmless. The resulting versions must form the
/// contiguous sequence 1..=n: the engine locates the migration for version v
/// at index v - 1.
fn to_migrations(
    files: &BTreeMap<String, String>,
    direction: Direction,
) -> Result<Vec<Migration>, Error> {
    let mut migrations = Vec::new();
    for (path, code) in files {
        let base = basename(path);
        let Some(prefix) = version_prefix(base) else {
            continue;
        };
        let version: u32 = prefix
            .parse()
            .map_err(|_| Error::InvalidFilename(path.clone()))?;
        if version == 0 {
            return Err(Error::ZerothMigration);
        }
        if direction_of(base)? != direction {
            continue;
        }
        migrations.push(Migration {
            name: path.clone(),
            code: code.clone(),
            direction,
            version,
        });
    }
    migrations.sort_by_key(|m| m.version);
    for (i, migration) in migrations.iter().enumerate() {
        let expected = i as u32 + 1;
        if migration.version == expected {
            continue;
        }
        if i > 0 && migrations[i - 1].version == migration.version {
            return Err(Error::DuplicateVersion(migration.version));
        }
        return Err(Error::VersionGap {
            expected,
            found: migration.version,
        });
    }
    Ok(migrations)
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The version prefix of a migration basename: three or more decimal digits
/// followed by `_`. Returns the digit run, or `None` for non-migration files.
fn version_prefix(basename: &str) -> Option<&str> {
    let end = basename
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(basename.len());
    if end >= 3 && basename[end..].starts_with('_') {
        Some(&basename[..end])
    } else {
        None
    }
}

fn direction_of(basename: &str) -> Result<Direction, Error> {
    if basename.contains(Direction::Up.marker()) {
        Ok(Direction::Up)
    } else if basename.contains(Direction::Down.marker()) {
        Ok(Direction::Down)
    } else {
        Err(Error::UnknownDirection)
    }
}
