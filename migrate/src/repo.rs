//! Bookkeeping repository: the single-column version table.
//!
//! One row per successfully applied up-migration; the rows always form the
//! prefix {1, 2, ..., k}. The table name is spliced as a SQL identifier
//! (placeholders cannot stand in for identifiers), so callers must restrict
//! it to `[A-Za-z0-9_]` before it gets here.

use crate::db::Queryable;
use crate::error::Error;

/// Create the version table when absent. Idempotent.
pub(crate) fn ensure_table_exists(db: &mut dyn Queryable, table: &str) -> Result<(), Error> {
    db.execute_script(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (version BIGINT NOT NULL PRIMARY KEY);"
    ))
}

/// Highest applied version; 0 when nothing has been applied.
pub(crate) fn get_remote_version(db: &mut dyn Queryable, table: &str) -> Result<u32, Error> {
    let version =
        db.query_version(&format!("SELECT version FROM {table} ORDER BY version DESC LIMIT 1"))?;
    Ok(version.unwrap_or(0))
}

pub(crate) fn insert_version(tx: &mut dyn Queryable, table: &str, version: u32) -> Result<(), Error> {
    tx.execute_version(&format!("INSERT INTO {table} (version) VALUES ($1)"), version)
}

pub(crate) fn delete_version(tx: &mut dyn Queryable, table: &str, version: u32) -> Result<(), Error> {
    tx.execute_version(&format!("DELETE FROM {table} WHERE version=$1"), version)
}
