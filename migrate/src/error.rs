use std::fmt;

use crate::core::Migration;

/// Error type for the migrate crate.
///
/// The first three variants are sentinels: callers match on them to tell an
/// empty migration set apart from a genuine failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No migration files were found, or nothing has been applied yet.
    #[error("no migrations")]
    NoMigrations,

    /// A migration file was numbered 000.
    #[error("migrations should start at 001 not 000")]
    ZerothMigration,

    /// The bookkeeping table records more applied versions than the local
    /// migration set holds.
    #[error("remote migration version greater than the number of migrations you have")]
    NotEnoughMigrations,

    /// The version prefix of a migration filename did not parse.
    #[error("invalid migration filename: {0}")]
    InvalidFilename(String),

    /// A versioned file carried neither `.up.` nor `.down.` in its name.
    #[error("filepath must specify the direction up or down (e.g. 001_setup.up.sql)")]
    UnknownDirection,

    /// Two files in the same direction share a version.
    #[error("duplicate migration version: {0}")]
    DuplicateVersion(u32),

    /// Versions must form the sequence 1, 2, 3, ... with no holes; the
    /// engine indexes migrations by `version - 1`.
    #[error("migration versions must be contiguous: expected {expected}, found {found}")]
    VersionGap { expected: u32, found: u32 },

    #[error("migrate doesn't support this url scheme: {0}")]
    UnsupportedScheme(String),

    /// Execution of a specific migration script failed.
    #[error(transparent)]
    Migration(Box<MigrationError>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("{0}")]
    Postgres(#[from] postgres::Error),
}

impl From<MigrationError> for Error {
    fn from(err: MigrationError) -> Self {
        Error::Migration(Box::new(err))
    }
}

/// A migration script failed against the database.
///
/// Carries enough structure to point a human at the offending SQL: the file
/// name, the position the driver reported (when it reported one), a query
/// excerpt, and the underlying driver error.
#[derive(Debug)]
pub struct MigrationError {
    /// Migration file name.
    pub name: String,
    /// 1-based line of the failure, 0 when the driver gave no position.
    pub line: u32,
    /// 1-based column of the failure, 0 when the driver gave no position.
    pub column: u32,
    /// Query excerpt.
    pub query: String,
    /// Human-oriented summary.
    pub message: String,
    /// The underlying driver error.
    pub cause: Box<dyn std::error::Error + Send + Sync>,
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{} in line {}: {}", self.cause, self.line, self.query)
        } else {
            write!(
                f,
                "{} in line {}: {} (details: {})",
                self.message, self.line, self.query, self.cause
            )
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

/// Wrap a driver error raised while executing `migration` into a
/// [MigrationError].
///
/// PostgreSQL reports a character position in its wire protocol; that gets
/// translated into a line and column against the script. Everything else
/// falls through with the raw driver message and the script as the excerpt.
pub(crate) fn format_error(migration: &Migration, err: Error) -> Error {
    #[cfg(feature = "postgres")]
    {
        let positional = match &err {
            Error::Postgres(pg) => pg.as_db_error().map(|db_err| {
                let pos = db_err.position().map(|p| match p {
                    postgres::error::ErrorPosition::Original(p) => *p as usize,
                    postgres::error::ErrorPosition::Internal { position, .. } => {
                        *position as usize
                    }
                });
                let line_col = pos.and_then(|p| compute_line_from_pos(&migration.code, p));
                let mut message = format!("{} failed. {}", migration.name, db_err.message());
                if let Some((_, column)) = line_col {
                    message.push_str(&format!(" on column {column}"));
                }
                if let Some(detail) = db_err.detail() {
                    message.push_str(&format!(", {detail}"));
                }
                (message, line_col.unwrap_or((0, 0)))
            }),
            _ => None,
        };
        if let Some((message, (line, column))) = positional {
            return MigrationError {
                name: migration.name.clone(),
                line,
                column,
                query: String::new(),
                message,
                cause: Box::new(err),
            }
            .into();
        }
    }
    MigrationError {
        name: migration.name.clone(),
        line: 0,
        column: 0,
        query: migration.code.clone(),
        message: "migration failed".to_string(),
        cause: Box::new(err),
    }
    .into()
}

/// Translate a 1-based character position reported by the driver into a
/// (line, column) pair against `code`. Positions are measured in characters,
/// not bytes. Returns `None` when the position falls outside the script.
pub(crate) fn compute_line_from_pos(code: &str, pos: usize) -> Option<(u32, u32)> {
    let normalized = code.replace("\r\n", "\n");
    let chars: Vec<char> = normalized.chars().collect();
    if pos > chars.len() {
        return None;
    }
    let sel = &chars[..pos];
    let line = sel.iter().filter(|&&c| c == '\n').count() as u32 + 1;
    let last_newline = sel
        .iter()
        .rposition(|&c| c == '\n')
        .map(|i| i as isize)
        .unwrap_or(-1);
    let column = (pos as isize - 1 - last_newline) as u32;
    Some((line, column))
}
