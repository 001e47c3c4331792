//! No frills database migration CLI for Postgres & SQLite.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use migrate::{Database, DirFs, Error};
use tracing::info;

#[derive(Parser)]
#[command(name = "migrate", about = "No frills database migration CLI for Postgres & SQLite")]
struct Cli {
    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log: LogLevel,

    /// Migrations directory
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Bookkeeping table name
    #[arg(long, default_value = "migrate")]
    table: String,

    /// Database connection string
    #[arg(long, env = "DATABASE_URL")]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_level(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create a new migration
    New {
        /// Name for the new migration; prompted for when omitted
        name: Option<String>,
    },
    /// Migrate up
    Up {
        /// Go up by n
        n: Option<u32>,
    },
    /// Migrate down
    Down {
        /// Go down by n
        n: Option<u32>,
    },
    /// Reset all migrations
    Reset,
    /// Redo the last migration
    Redo,
    /// Show information about the migrations
    Info,
    /// Print the current version
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log.as_level())
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        dir,
        table,
        db,
        command,
        ..
    } = cli;
    validate_table(&table)?;

    match command {
        Command::New { name } => {
            let name = match name {
                Some(name) => name,
                None => prompt_name()?,
            };
            let dir = dir.unwrap_or_else(|| PathBuf::from("migrate"));
            migrate::new_migration(&dir, &name)?;
        }
        Command::Up { n } => {
            let mut db = dial(db.as_deref())?;
            let fsys = migrate_fs(dir.as_deref())?;
            match n {
                None | Some(0) => migrate::up(db.as_mut(), &fsys, &table)?,
                Some(n) => migrate::up_by(db.as_mut(), &fsys, &table, n)?,
            }
        }
        Command::Down { n } => {
            let mut db = dial(db.as_deref())?;
            let fsys = migrate_fs(dir.as_deref())?;
            match n {
                None | Some(0) => migrate::down(db.as_mut(), &fsys, &table)?,
                Some(n) => migrate::down_by(db.as_mut(), &fsys, &table, n)?,
            }
        }
        Command::Reset => {
            let mut db = dial(db.as_deref())?;
            let fsys = migrate_fs(dir.as_deref())?;
            migrate::reset(db.as_mut(), &fsys, &table)?;
        }
        Command::Redo => {
            let mut db = dial(db.as_deref())?;
            let fsys = migrate_fs(dir.as_deref())?;
            migrate::redo(db.as_mut(), &fsys, &table)?;
        }
        Command::Info => {
            let mut db = dial(db.as_deref())?;
            let fsys = migrate_fs(dir.as_deref())?;
            let local = match migrate::local_version(&fsys) {
                Err(Error::NoMigrations) => return Err("no local migrations yet".into()),
                other => other?,
            };
            let remote = match migrate::remote_version(db.as_mut(), &fsys, &table) {
                Err(Error::NoMigrations) => return Err("no remote migrations yet".into()),
                other => other?,
            };
            info!("local: {local}");
            info!("remote: {remote}");
        }
        Command::Version => {
            println!("v{}", migrate::version());
        }
    }
    Ok(())
}

/// The table name gets spliced into SQL as an identifier, so restrict it
/// before it reaches the engine.
fn validate_table(table: &str) -> Result<(), String> {
    let safe =
        !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if safe {
        Ok(())
    } else {
        Err(format!("invalid table name: {table}"))
    }
}

fn dial(db: Option<&str>) -> Result<Box<dyn Database>, Box<dyn std::error::Error>> {
    match db {
        Some(url) => Ok(migrate::connect(url)?),
        None => Err("missing --db or $DATABASE_URL environment variable".into()),
    }
}

/// Resolve the migrations directory: an explicit `--dir` must exist, and
/// without one the default locations are searched.
fn migrate_fs(dir: Option<&std::path::Path>) -> Result<DirFs, Box<dyn std::error::Error>> {
    if let Some(dir) = dir {
        if dir.is_dir() {
            return Ok(DirFs::new(dir));
        }
        return Err(format!("{}/ directory doesn't exist", dir.display()).into());
    }
    let candidates = ["migrate", "internal/migrate"];
    for candidate in candidates {
        let path = PathBuf::from(candidate);
        if path.is_dir() {
            return Ok(DirFs::new(path));
        }
    }
    Err(format!("unable to find migration directory in {candidates:?}").into())
}

fn prompt_name() -> Result<String, Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    loop {
        print!("Migration name? ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err("missing migration name".into());
        }
        let name = line.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_declaration_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn table_names_are_restricted_to_identifiers() {
        assert!(validate_table("migrate").is_ok());
        assert!(validate_table("schema_history_2").is_ok());
        assert!(validate_table("").is_err());
        assert!(validate_table("nope; drop table users").is_err());
        assert!(validate_table("na-me").is_err());
    }

    #[test]
    fn explicit_missing_dir_is_reported() {
        let err = migrate_fs(Some(std::path::Path::new("no/such/dir"))).unwrap_err();
        assert_eq!(err.to_string(), "no/such/dir/ directory doesn't exist");
    }
}
