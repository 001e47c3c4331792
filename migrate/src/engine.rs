//! The migration engine: reconciliation and the transactional step loops.
//!
//! Every multi-step operation runs inside a single transaction. A failing
//! step rolls the whole call back, so the bookkeeping table and the schema
//! move together or not at all.

use tracing::info;

use crate::core::{down_migrations, up_migrations, Migration};
use crate::db::{Database, Queryable};
use crate::error::{format_error, Error};
use crate::fileset::{load_files, FileSystem};
use crate::repo;

/// Migrate the database up to the latest local migration.
pub fn up(db: &mut dyn Database, fsys: &dyn FileSystem, table: &str) -> Result<(), Error> {
    up_by(db, fsys, table, u32::MAX)
}

/// Migrate the database up by at most `n` steps.
pub fn up_by(db: &mut dyn Database, fsys: &dyn FileSystem, table: &str, n: u32) -> Result<(), Error> {
    let files = load_files(fsys)?;
    if files.is_empty() {
        return Err(Error::NoMigrations);
    }
    let migrations = up_migrations(&files)?;
    if migrations.is_empty() {
        return Err(Error::NoMigrations);
    }
    repo::ensure_table_exists(db, table)?;
    let remote = repo::get_remote_version(db, table)?;
    let local = migrations[migrations.len() - 1].version;
    db.transaction(&mut |tx| {
        step_up(tx, &migrations, table, remote, local, n)?;
        Ok(())
    })
}

/// Migrate the database all the way down.
pub fn down(db: &mut dyn Database, fsys: &dyn FileSystem, table: &str) -> Result<(), Error> {
    down_by(db, fsys, table, u32::MAX)
}

/// Migrate the database down by at most `n` steps.
pub fn down_by(db: &mut dyn Database, fsys: &dyn FileSystem, table: &str, n: u32) -> Result<(), Error> {
    let files = load_files(fsys)?;
    if files.is_empty() {
        return Err(Error::NoMigrations);
    }
    let migrations = down_migrations(&files)?;
    if migrations.is_empty() {
        return Err(Error::NoMigrations);
    }
    repo::ensure_table_exists(db, table)?;
    let remote = repo::get_remote_version(db, table)?;
    db.transaction(&mut |tx| {
        step_down(tx, &migrations, table, remote, n)?;
        Ok(())
    })
}

/// Roll the newest applied migration back and forward again.
///
/// Both halves run inside one transaction, so a failing re-up also restores
/// the bookkeeping row the down half removed.
pub fn redo(db: &mut dyn Database, fsys: &dyn FileSystem, table: &str) -> Result<(), Error> {
    let files = load_files(fsys)?;
    if files.is_empty() {
        return Err(Error::NoMigrations);
    }
    let downs = down_migrations(&files)?;
    let ups = up_migrations(&files)?;
    if downs.is_empty() || ups.is_empty() {
        return Err(Error::NoMigrations);
    }
    repo::ensure_table_exists(db, table)?;
    let remote = repo::get_remote_version(db, table)?;
    let local = ups[ups.len() - 1].version;
    db.transaction(&mut |tx| {
        let remote = step_down(tx, &downs, table, remote, 1)?;
        step_up(tx, &ups, table, remote, local, 1)?;
        Ok(())
    })
}

/// Migrate all the way down, then all the way back up.
///
/// Runs as two transactions, so a committed down pass survives even when
/// the up pass fails.
pub fn reset(db: &mut dyn Database, fsys: &dyn FileSystem, table: &str) -> Result<(), Error> {
    down(db, fsys, table)?;
    up(db, fsys, table)
}

/// Name of the highest-numbered local up-migration.
pub fn local_version(fsys: &dyn FileSystem) -> Result<String, Error> {
    let files = load_files(fsys)?;
    let migrations = up_migrations(&files)?;
    match migrations.last() {
        Some(migration) => Ok(migration.name.clone()),
        None => Err(Error::NoMigrations),
    }
}

/// Name of the migration the bookkeeping table says was applied last.
pub fn remote_version(
    db: &mut dyn Database,
    fsys: &dyn FileSystem,
    table: &str,
) -> Result<String, Error> {
    repo::ensure_table_exists(db, table)?;
    let remote = repo::get_remote_version(db, table)?;
    if remote == 0 {
        return Err(Error::NoMigrations);
    }
    let files = load_files(fsys)?;
    let migrations = up_migrations(&files)?;
    if migrations.is_empty() {
        return Err(Error::NoMigrations);
    }
    if migrations.len() < remote as usize {
        return Err(Error::NotEnoughMigrations);
    }
    Ok(migrations[(remote - 1) as usize].name.clone())
}

/// Apply up-steps inside an open transaction: execute the script, record
/// the version, log the name. Returns the new remote version.
fn step_up(
    tx: &mut dyn Queryable,
    migrations: &[Migration],
    table: &str,
    remote: u32,
    local: u32,
    mut n: u32,
) -> Result<u32, Error> {
    let mut next = remote + 1;
    while n > 0 && next <= local {
        let migration = &migrations[(next - 1) as usize];
        if let Err(err) = tx.execute_script(&migration.code) {
            return Err(format_error(migration, err));
        }
        repo::insert_version(tx, table, next)?;
        info!("{}", migration.name);
        n -= 1;
        next += 1;
    }
    Ok(next - 1)
}

/// Apply down-steps inside an open transaction, walking the applied
/// versions downward. Returns the new remote version.
fn step_down(
    tx: &mut dyn Queryable,
    migrations: &[Migration],
    table: &str,
    mut remote: u32,
    mut n: u32,
) -> Result<u32, Error> {
    let earliest = migrations[0].version;
    while n > 0 && remote >= earliest {
        if migrations.len() < remote as usize {
            return Err(Error::NotEnoughMigrations);
        }
        let migration = &migrations[(remote - 1) as usize];
        if let Err(err) = tx.execute_script(&migration.code) {
            return Err(format_error(migration, err));
        }
        repo::delete_version(tx, table, remote)?;
        info!("{}", migration.name);
        n -= 1;
        remote -= 1;
    }
    Ok(remote)
}
