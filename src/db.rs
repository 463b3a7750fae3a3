//! Store connection factory.
//!
//! Handlers receive a [`Db`] through router state and call [`Db::acquire`]
//! once per request. The returned connection goes back to the pool when it
//! is dropped, so every exit path releases it.

use sqlx::{
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool,
};

use crate::{error::Result, schema};

// ---

#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    // ---
    /// Open a pool against `url`, ensuring the schema on every new connection.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        // ---
        let options: SqliteConnectOptions = url.parse()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .after_connect(|conn, _meta| Box::pin(schema::ensure_schema(conn)))
            .connect_with(options.create_if_missing(true))
            .await?;

        Ok(Db { pool })
    }

    /// Single-connection in-memory store; each `Db` is an isolated database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        // ---
        // An in-memory database lives only as long as its one connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .after_connect(|conn, _meta| Box::pin(schema::ensure_schema(conn)))
            .connect("sqlite::memory:")
            .await?;

        Ok(Db { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquire a connection scoped to the current request.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        // ---
        let conn = self.pool.acquire().await?;
        Ok(conn)
    }
}
