//! Database initialization and schema migrations.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

/// Durable tables created by the embedded schema.
pub const DURABLE_TABLES: [&str; 6] = [
    "seasons",
    "users",
    "assets",
    "user_assets",
    "orders",
    "season_rankings",
];

/// Open (creating if needed) the SQLite database and apply the schema.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_pragmas(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!(path = %db_path, "Database ready");
    Ok(pool)
}

/// Apply `schema.sql`. Every statement is `IF NOT EXISTS`, so reruns are no-ops.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let schema_sql = include_str!("schema.sql");

    let mut applied = 0usize;
    for statement in schema_sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(pool).await?;
        applied += 1;
    }

    debug!(statements = applied, "Schema applied");
    Ok(())
}

async fn configure_pragmas(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode reports the mode actually in effect
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    debug!(journal_mode = %journal_mode, "SQLite connection configured");

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fresh_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("nested")
            .join("rank.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_init_db_creates_parent_dirs_and_file() {
        let (_pool, temp) = fresh_pool().await;
        assert!(temp.path().join("nested").join("rank.db").exists());
    }

    #[tokio::test]
    async fn test_all_durable_tables_exist() {
        let (pool, _temp) = fresh_pool().await;

        for table in DURABLE_TABLES {
            let found: Option<(String,)> =
                sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name=?")
                    .bind(table)
                    .fetch_optional(&pool)
                    .await
                    .expect("query failed");
            assert!(found.is_some(), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let (pool, _temp) = fresh_pool().await;
        run_migrations(&pool)
            .await
            .expect("second migration run failed");
    }

    #[tokio::test]
    async fn test_window_functions_available() {
        let (pool, _temp) = fresh_pool().await;

        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT v, ROW_NUMBER() OVER (ORDER BY v DESC) FROM (SELECT 5 AS v UNION ALL SELECT 9)",
        )
        .fetch_all(&pool)
        .await
        .expect("window function query failed");
        assert_eq!(rows, vec![(9, 1), (5, 2)]);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (pool, _temp) = fresh_pool().await;

        let result: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result.0, 1);
    }
}
