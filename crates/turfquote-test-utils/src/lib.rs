//! Shared PostgreSQL for turfquote integration tests.
//!
//! One server is shared by every test in a binary; each test gets its own
//! freshly migrated database through [`TestDb::create`].
//!
//! When `TURFQUOTE_TEST_PG_URL` is set (e.g. a CI service container) that
//! server is used directly. Otherwise a `postgres` container is started via
//! testcontainers on first use and kept alive for the rest of the process.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use turfquote_db::models::User;
use turfquote_db::pool;
use turfquote_db::queries::users::{self, NewUser};

struct SharedServer {
    /// Server root, without a database name.
    base_url: String,
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED: OnceCell<SharedServer> = OnceCell::const_new();

async fn start_server() -> SharedServer {
    if let Ok(url) = std::env::var("TURFQUOTE_TEST_PG_URL") {
        return SharedServer {
            base_url: url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("failed to start PostgreSQL container");

    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedServer {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

async fn base_url() -> &'static str {
    &SHARED.get_or_init(start_server).await.base_url
}

async fn maintenance_pool() -> PgPool {
    let url = format!("{}/postgres", base_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
        .expect("failed to connect to maintenance database")
}

/// A uniquely named, migrated database. Call [`TestDb::teardown`] at the
/// end of the test to close the pool and drop the database.
pub struct TestDb {
    pub pool: PgPool,
    pub name: String,
    /// Connection URL of this database.
    pub url: String,
}

impl TestDb {
    /// Create a fresh database and apply the embedded migrations.
    pub async fn create() -> Self {
        let name = format!("turfquote_test_{}", Uuid::new_v4().simple());

        let maint = maintenance_pool().await;
        maint
            .execute(format!("CREATE DATABASE {name}").as_str())
            .await
            .unwrap_or_else(|e| panic!("failed to create test database {name}: {e}"));
        maint.close().await;

        let url = format!("{}/{name}", base_url().await);
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await
            .unwrap_or_else(|e| panic!("failed to connect to test database {name}: {e}"));

        pool::run_migrations(&pool)
            .await
            .expect("migrations should succeed");

        Self { pool, name, url }
    }

    /// Insert a user with the given external ID and a derived email.
    pub async fn seed_user(&self, external_id: &str) -> User {
        let new = NewUser {
            external_id: external_id.to_owned(),
            email: format!("{external_id}@example.com"),
            ..NewUser::default()
        };
        users::create_user(&self.pool, &new)
            .await
            .expect("seeding a user should succeed")
    }

    /// Close the pool, terminate stray connections, and drop the database.
    pub async fn teardown(self) {
        self.pool.close().await;

        let maint = maintenance_pool().await;
        let terminate = format!(
            "SELECT pg_terminate_backend(pid) \
             FROM pg_stat_activity \
             WHERE datname = '{}' AND pid <> pg_backend_pid()",
            self.name
        );
        let _ = maint.execute(terminate.as_str()).await;
        let _ = maint
            .execute(format!("DROP DATABASE IF EXISTS {}", self.name).as_str())
            .await;
        maint.close().await;
    }
}
