//! Connection capability abstraction over the supported drivers.
//!
//! The engine is polymorphic over two small traits instead of a concrete
//! driver: [Queryable] is the per-round-trip surface, [Database] adds the
//! ability to scope work to a transaction. PostgreSQL and SQLite plug in
//! below; [connect] picks one from a connection URL.

use crate::error::Error;

/// The per-round-trip capability set the engine needs from a connection or
/// an open transaction.
pub trait Queryable {
    /// Execute a SQL script, which may contain multiple statements.
    fn execute_script(&mut self, sql: &str) -> Result<(), Error>;

    /// Run a query returning at most one row holding a single BIGINT
    /// column. `None` when the result set is empty.
    fn query_version(&mut self, sql: &str) -> Result<Option<u32>, Error>;

    /// Execute a statement with a single `$1` version parameter.
    fn execute_version(&mut self, sql: &str, version: u32) -> Result<(), Error>;
}

/// An open connection that can scope work to a transaction.
pub trait Database: Queryable {
    /// Run `f` against an open transaction: commit when it returns `Ok`,
    /// roll everything back on any error path.
    fn transaction(
        &mut self,
        f: &mut dyn FnMut(&mut dyn Queryable) -> Result<(), Error>,
    ) -> Result<(), Error>;
}

/// Open a database handle for a connection URL, picking the driver from the
/// scheme. `postgres://` and `postgresql://` dial PostgreSQL; `sqlite://`
/// and `sqlite3://` open the path after the scheme.
pub fn connect(url: &str) -> Result<Box<dyn Database>, Error> {
    let Some((scheme, path)) = url.split_once("://") else {
        return Err(Error::UnsupportedScheme(url.to_string()));
    };
    match scheme {
        #[cfg(feature = "postgres")]
        "postgres" | "postgresql" => {
            let client = postgres::Client::connect(url, postgres::NoTls)?;
            Ok(Box::new(client))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" | "sqlite3" => {
            let conn = rusqlite::Connection::open(path)?;
            Ok(Box::new(conn))
        }
        other => Err(Error::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use rusqlite::OptionalExtension;

    use super::{Database, Queryable};
    use crate::error::Error;

    impl Queryable for rusqlite::Connection {
        fn execute_script(&mut self, sql: &str) -> Result<(), Error> {
            self.execute_batch(sql)?;
            Ok(())
        }

        fn query_version(&mut self, sql: &str) -> Result<Option<u32>, Error> {
            let version = self
                .query_row(sql, [], |row| row.get::<_, i64>(0))
                .optional()?;
            Ok(version.map(|v| v as u32))
        }

        fn execute_version(&mut self, sql: &str, version: u32) -> Result<(), Error> {
            self.execute(sql, rusqlite::params![i64::from(version)])?;
            Ok(())
        }
    }

    // A rusqlite Transaction derefs to Connection, whose methods take
    // shared references, so the impl reads the same.
    impl Queryable for rusqlite::Transaction<'_> {
        fn execute_script(&mut self, sql: &str) -> Result<(), Error> {
            self.execute_batch(sql)?;
            Ok(())
        }

        fn query_version(&mut self, sql: &str) -> Result<Option<u32>, Error> {
            let version = self
                .query_row(sql, [], |row| row.get::<_, i64>(0))
                .optional()?;
            Ok(version.map(|v| v as u32))
        }

        fn execute_version(&mut self, sql: &str, version: u32) -> Result<(), Error> {
            self.execute(sql, rusqlite::params![i64::from(version)])?;
            Ok(())
        }
    }

    impl Database for rusqlite::Connection {
        fn transaction(
            &mut self,
            f: &mut dyn FnMut(&mut dyn Queryable) -> Result<(), Error>,
        ) -> Result<(), Error> {
            let mut tx = rusqlite::Connection::transaction(self)?;
            // dropping the transaction on the error path rolls it back
            f(&mut tx)?;
            tx.commit()?;
            Ok(())
        }
    }
}

#[cfg(feature = "postgres")]
mod pg {
    use super::{Database, Queryable};
    use crate::error::Error;

    impl Queryable for postgres::Client {
        fn execute_script(&mut self, sql: &str) -> Result<(), Error> {
            self.batch_execute(sql)?;
            Ok(())
        }

        fn query_version(&mut self, sql: &str) -> Result<Option<u32>, Error> {
            let row = self.query_opt(sql, &[])?;
            Ok(row.map(|row| row.get::<_, i64>(0) as u32))
        }

        fn execute_version(&mut self, sql: &str, version: u32) -> Result<(), Error> {
            self.execute(sql, &[&i64::from(version)])?;
            Ok(())
        }
    }

    impl Queryable for postgres::Transaction<'_> {
        fn execute_script(&mut self, sql: &str) -> Result<(), Error> {
            self.batch_execute(sql)?;
            Ok(())
        }

        fn query_version(&mut self, sql: &str) -> Result<Option<u32>, Error> {
            let row = self.query_opt(sql, &[])?;
            Ok(row.map(|row| row.get::<_, i64>(0) as u32))
        }

        fn execute_version(&mut self, sql: &str, version: u32) -> Result<(), Error> {
            self.execute(sql, &[&i64::from(version)])?;
            Ok(())
        }
    }

    impl Database for postgres::Client {
        fn transaction(
            &mut self,
            f: &mut dyn FnMut(&mut dyn Queryable) -> Result<(), Error>,
        ) -> Result<(), Error> {
            let mut tx = postgres::Client::transaction(self)?;
            // dropping the transaction on the error path rolls it back
            f(&mut tx)?;
            tx.commit()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::connect;

    #[test]
    fn connect_rejects_unknown_schemes() {
        let err = connect("mysql://localhost:3306/app").err().unwrap();
        assert_eq!(
            err.to_string(),
            "migrate doesn't support this url scheme: mysql"
        );
    }

    #[test]
    fn connect_rejects_urls_without_a_scheme() {
        let err = connect("localhost:5432").err().unwrap();
        assert_eq!(
            err.to_string(),
            "migrate doesn't support this url scheme: localhost:5432"
        );
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn connect_opens_a_sqlite_path() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("app.db").display());
        let mut db = connect(&url).unwrap();
        db.execute_script("CREATE TABLE t (id integer primary key);")
            .unwrap();
    }
}
