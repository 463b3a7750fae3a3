//! Database schema management for `plantation-api`.
//!
//! Ensures the `measurements` and `locations` tables exist. [`ensure_schema`]
//! runs on every new pooled connection; [`create_schema`] is the single
//! startup call from `main.rs`.

use anyhow::Result;
use sqlx::{SqliteConnection, SqlitePool};

// ---

/// Idempotently create both tables and their index on `conn`.
///
/// Safe to call any number of times; every statement is `IF NOT EXISTS`.
pub async fn ensure_schema(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    // ---
    // Append-only: no UPDATE or DELETE is ever issued against this table.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS measurements (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            node          TEXT NOT NULL,
            height        REAL NOT NULL,
            timestamp     TEXT NOT NULL,
            reporter_addr TEXT
        );
        "#,
    )
    .execute(&mut *conn)
    .await?;

    // Coordinates are TEXT so the "unset" sentinel fits in the same column.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            node      TEXT NOT NULL UNIQUE,
            latitude  TEXT NOT NULL,
            longitude TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_measurements_node_timestamp
            ON measurements (node, timestamp);
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Create the database schema once at startup.
///
/// Errors are propagated so a store that cannot be written aborts the process.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // ---
    let mut conn = pool.acquire().await?;
    ensure_schema(&mut conn).await?;
    Ok(())
}
