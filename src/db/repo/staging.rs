//! Staging table operations for the repository.
//!
//! Each run gets its own ordinary table, `ranking_stage_<season>_<run>`, so that
//! every pooled connection sees the same rows. It holds one row per valued
//! participant and exists only for the duration of that run.

use crate::domain::{SeasonId, StagedValuation, StagingKey};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::Repository;

/// Rows per multi-row INSERT; keeps bound parameters well under SQLite's limit.
const INSERT_CHUNK_ROWS: usize = 400;

fn bare_table_name(key: StagingKey) -> String {
    format!(
        "ranking_stage_{}_{}",
        key.season.as_i64(),
        key.run.simple()
    )
}

/// `GLOB` pattern matching every staging table of a season. `_` is literal in GLOB.
fn season_table_pattern(season: SeasonId) -> String {
    format!("ranking_stage_{}_*", season.as_i64())
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quoted identifier of a run's staging table.
pub fn staging_table_name(key: StagingKey) -> String {
    quote(&bare_table_name(key))
}

impl Repository {
    /// Whether any staging table for the season currently exists.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn staging_exists(&self, season: SeasonId) -> Result<bool, sqlx::Error> {
        Ok(!self.staging_tables(season).await?.is_empty())
    }

    /// Names of every staging table of the season, whichever run created it.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn staging_tables(&self, season: SeasonId) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name GLOB ? ORDER BY name",
        )
        .bind(season_table_pattern(season))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    /// Drop staging tables of the season left behind by earlier runs.
    ///
    /// Returns the names dropped.
    ///
    /// # Errors
    /// Returns an error if listing or any drop fails.
    pub async fn drop_leftover_staging(&self, season: SeasonId) -> Result<Vec<String>, sqlx::Error> {
        let leftovers = self.staging_tables(season).await?;
        for name in &leftovers {
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote(name)))
                .execute(&self.pool)
                .await?;
        }
        Ok(leftovers)
    }

    /// Drop the run's staging table if present and create an empty one.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn reset_staging(&self, key: StagingKey) -> Result<(), sqlx::Error> {
        let table = staging_table_name(key);
        let index = quote(&format!("{}_value", bare_table_name(key)));

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "CREATE TABLE {table} (user_id INTEGER PRIMARY KEY, total_value INTEGER NOT NULL)"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "CREATE INDEX {index} ON {table} (total_value DESC, user_id ASC)"
        ))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Insert one page of valuations in a single transaction.
    ///
    /// Any failure (including a duplicate participant) rolls back the whole page.
    ///
    /// # Errors
    /// Returns an error if any insert or the commit fails.
    pub async fn stage_valuations(
        &self,
        key: StagingKey,
        rows: &[StagedValuation],
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let table = staging_table_name(key);
        let mut inserted = 0u64;
        let mut tx = self.pool.begin().await?;

        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut query =
                QueryBuilder::<Sqlite>::new(format!("INSERT INTO {table} (user_id, total_value) "));
            query.push_values(chunk, |mut b, row| {
                b.push_bind(row.participant.as_i64())
                    .push_bind(row.total_value);
            });
            inserted += query.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Number of rows currently staged by the run.
    ///
    /// # Errors
    /// Returns an error if the query fails (including when the table is absent).
    pub async fn count_staged(&self, key: StagingKey) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS n FROM {}",
            staging_table_name(key)
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("n"))
    }

    /// Drop the run's staging table; succeeds when it is already gone.
    ///
    /// # Errors
    /// Returns an error if the statement fails.
    pub async fn drop_staging(&self, key: StagingKey) -> Result<(), sqlx::Error> {
        sqlx::query(&format!(
            "DROP TABLE IF EXISTS {}",
            staging_table_name(key)
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
