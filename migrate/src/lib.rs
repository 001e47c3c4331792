//! No frills database migration library for PostgreSQL & SQLite.
//!
//! Migrations are plain SQL files named `NNN_snake_name.up.sql` /
//! `NNN_snake_name.down.sql`, discovered from a directory (or any
//! [FileSystem]), applied in version order, and recorded in a one-column
//! bookkeeping table (default name `migrate`). Every multi-step operation
//! runs inside a single transaction: it commits whole or rolls back whole.
//!
//! # Example
//!
//! ```no_run
//! use migrate::{connect, DirFs};
//!
//! fn main() -> Result<(), migrate::Error> {
//!     let mut db = connect("postgres://localhost:5432/app")?;
//!     let fsys = DirFs::new("./migrate");
//!     migrate::up(db.as_mut(), &fsys, "migrate")?;
//!     Ok(())
//! }
//! ```
//!
//! Progress is reported through [tracing]; with no subscriber installed the
//! engine is silent.
//!
//! # Database support
//!
//! - SQLite via [rusqlite] — `sqlite` feature flag.
//! - PostgreSQL via [postgres] — `postgres` feature flag.

mod core;
mod db;
mod dedent;
mod engine;
mod error;
mod fileset;
mod repo;
mod scaffold;

#[cfg(all(test, feature = "postgres"))]
mod test_postgres;

pub use crate::core::{Direction, Migration};
pub use crate::db::{connect, Database, Queryable};
pub use crate::engine::{down, down_by, local_version, redo, remote_version, reset, up, up_by};
pub use crate::error::{Error, MigrationError};
pub use crate::fileset::{DirFs, FileSystem, MemoryFs};
pub use crate::scaffold::new_migration;

/// The library version, as reported by the CLI's `version` command.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
