//! Connection pool and the per-request database context.

use diesel::connection::SimpleConnection;
use diesel::r2d2::ConnectionManager;
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use r2d2::{CustomizeConnection, Pool, PooledConnection};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Applied to every connection as it leaves the pool.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn setup_connection_pool(config: &Config) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(config.database_path());
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;
    info!("Database ready at {}", config.database_path());

    Ok(pool)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Migration(e.to_string()))?;
    for version in applied {
        info!("Applied migration {}", version);
    }
    Ok(())
}

/// Pooled connection checked out for a single request.
///
/// All work a handler does goes through [`Db::run`], which executes it in one
/// transaction on a blocking thread: an `Err` from the closure rolls back
/// every write made during the request.
pub struct Db(DbConnection);

impl Db {
    /// Runs under `BEGIN IMMEDIATE`: the write lock is held from the first
    /// statement, so concurrent requests queue on the busy timeout.
    pub async fn run<T, F>(self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut pooled = self.0;
        rocket::tokio::task::spawn_blocking(move || {
            let conn: &mut SqliteConnection = &mut pooled;
            conn.immediate_transaction(f)
        })
        .await?
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Db {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(pool) = req.rocket().state::<DbPool>() else {
            error!("Database pool is not managed by this instance");
            return Outcome::Error((
                Status::InternalServerError,
                Error::Config("database pool missing".into()),
            ));
        };

        // Checkout blocks until a connection is free.
        let pool = pool.clone();
        match rocket::tokio::task::spawn_blocking(move || pool.get()).await {
            Ok(Ok(conn)) => Outcome::Success(Db(conn)),
            Ok(Err(e)) => {
                error!("Failed to check out database connection: {}", e);
                Outcome::Error((Status::ServiceUnavailable, e.into()))
            }
            Err(e) => {
                error!("Connection checkout task failed: {}", e);
                Outcome::Error((Status::InternalServerError, e.into()))
            }
        }
    }
}

/// Fresh in-memory database with the schema applied.
#[cfg(test)]
pub fn test_connection() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").unwrap();
    conn.batch_execute("PRAGMA foreign_keys = ON;").unwrap();
    run_migrations(&mut conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::prelude::*;

    #[test]
    fn migrations_create_every_table() {
        let mut conn = test_connection();

        #[derive(QueryableByName)]
        struct Name {
            #[diesel(sql_type = diesel::sql_types::Text)]
            name: String,
        }

        let names: Vec<String> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .load::<Name>(&mut conn)
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();

        for table in ["bugs", "devices", "experiences", "tester_devices", "testers"] {
            assert!(names.iter().any(|n| n == table), "missing {}", table);
        }
    }

    #[test]
    fn pool_applies_migrations_to_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let config = Config {
            database_url: path.to_string_lossy().into_owned(),
            pool_size: 2,
            ..Config::default()
        };

        let pool = setup_connection_pool(&config).unwrap();
        let mut conn = pool.get().unwrap();
        let count: i64 = crate::schema::devices::table
            .count()
            .get_result(&mut *conn)
            .unwrap();
        assert_eq!(count, 0);
        assert!(path.exists());
    }
}
