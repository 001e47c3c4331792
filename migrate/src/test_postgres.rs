#![allow(dead_code)]

//! Shared PostgreSQL test infrastructure.
//!
//! Starts a single PostgreSQL testcontainer for the whole test run and
//! hands every test a freshly created database on it.

use std::sync::OnceLock;

use postgres::{Client, NoTls};
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

/// Default credentials for testcontainers-modules postgres
const PG_USER: &str = "postgres";
const PG_PASSWORD: &str = "postgres";
const PG_DB: &str = "postgres";

struct PgServer {
    port: u16,
    // keeps the container management runtime alive for the test run
    _rt: tokio::runtime::Runtime,
}

static SERVER: OnceLock<PgServer> = OnceLock::new();

fn postgres_port() -> u16 {
    SERVER
        .get_or_init(|| {
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            let port = rt.block_on(async {
                let container = Postgres::default()
                    .start()
                    .await
                    .expect("failed to start postgres container");
                let port = container
                    .get_host_port_ipv4(5432)
                    .await
                    .expect("failed to get postgres port");
                // leak the container so it outlives the init scope
                std::mem::forget(container);
                port
            });
            PgServer { port, _rt: rt }
        })
        .port
}

fn url_with_db(db: &str) -> String {
    format!(
        "postgres://{}:{}@127.0.0.1:{}/{}",
        PG_USER,
        PG_PASSWORD,
        postgres_port(),
        db
    )
}

/// Create a fresh database with a unique name and connect to it.
pub fn fresh_postgres_db() -> (Client, String) {
    let admin_url = url_with_db(PG_DB);
    let mut admin = Client::connect(&admin_url, NoTls).expect("failed to connect as admin");

    let db_name = format!("test_{}", Uuid::new_v4().simple());
    admin
        .execute(&format!("CREATE DATABASE \"{}\"", db_name), &[])
        .expect("failed to create test database");
    drop(admin);

    let client =
        Client::connect(&url_with_db(&db_name), NoTls).expect("failed to connect to test database");
    (client, db_name)
}

/// A client connected to a fresh, isolated database.
pub fn get_test_client() -> Client {
    let (client, _db_name) = fresh_postgres_db();
    client
}
