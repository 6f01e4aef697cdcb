//! Ranking finalization and reads for the repository.
//!
//! Ranks are a strict 1..N order by `total_value DESC, user_id ASC`. Tiers come from
//! the shared policy in `engine::tier`, rendered into SQL for the set-based path.

use crate::domain::{ParticipantId, RankingRecord, SeasonId, StagingKey, Tier};
use crate::engine::{tier_case_sql, tier_for_rank};
use futures::TryStreamExt;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{staging_table_name, Repository};

const UPSERT_CONFLICT_CLAUSE: &str = r#"
    ON CONFLICT(season_id, user_id) DO UPDATE SET
        total_value = excluded.total_value,
        rank = excluded.rank,
        tier = excluded.tier,
        updated_at = excluded.updated_at
"#;

impl Repository {
    /// Rank the run's whole staging table with one window-function upsert.
    ///
    /// Returns the number of ranking rows written.
    ///
    /// # Errors
    /// Returns an error if the statement fails; nothing is written in that case.
    pub async fn finalize_rankings_windowed(&self, key: StagingKey) -> Result<u64, sqlx::Error> {
        // `WHERE true` disambiguates the upsert clause from a join constraint.
        let sql = format!(
            r#"
            INSERT INTO season_rankings (season_id, user_id, total_value, rank, tier, updated_at)
            SELECT ?, user_id, total_value, rank, {tier}, ?
            FROM (
                SELECT user_id,
                       total_value,
                       ROW_NUMBER() OVER (ORDER BY total_value DESC, user_id ASC) AS rank,
                       COUNT(*) OVER () AS total
                FROM {table}
            ) AS ranked
            WHERE true
            {UPSERT_CONFLICT_CLAUSE}
            "#,
            tier = tier_case_sql("rank", "total"),
            table = staging_table_name(key),
        );

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(&sql)
            .bind(key.season.as_i64())
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }

    /// Rank the staging table by reading it in sorted order and counting.
    ///
    /// Reads `chunk_size` rows at a time with a keyset cursor and upserts each row,
    /// all inside one transaction.
    ///
    /// # Errors
    /// Returns an error if any read or write fails; the transaction is rolled back.
    pub async fn finalize_rankings_streaming(
        &self,
        key: StagingKey,
        chunk_size: i64,
    ) -> Result<u64, sqlx::Error> {
        let table = staging_table_name(key);
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let total: i64 = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
            .fetch_one(&mut *tx)
            .await?
            .get("n");

        let first_chunk_sql = format!(
            "SELECT user_id, total_value FROM {table} \
             ORDER BY total_value DESC, user_id ASC LIMIT ?"
        );
        let next_chunk_sql = format!(
            "SELECT user_id, total_value FROM {table} \
             WHERE total_value < ? OR (total_value = ? AND user_id > ?) \
             ORDER BY total_value DESC, user_id ASC LIMIT ?"
        );
        let upsert_sql = format!(
            "INSERT INTO season_rankings (season_id, user_id, total_value, rank, tier, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) {UPSERT_CONFLICT_CLAUSE}"
        );

        let mut rank = 0i64;
        let mut cursor: Option<(i64, i64)> = None;

        loop {
            let chunk: Vec<(i64, i64)> = {
                let query = match cursor {
                    None => sqlx::query(&first_chunk_sql).bind(chunk_size),
                    Some((last_value, last_user)) => sqlx::query(&next_chunk_sql)
                        .bind(last_value)
                        .bind(last_value)
                        .bind(last_user)
                        .bind(chunk_size),
                };
                let mut rows = query.fetch(&mut *tx);
                let mut chunk = Vec::new();
                while let Some(row) = rows.try_next().await? {
                    chunk.push((row.get("user_id"), row.get("total_value")));
                }
                chunk
            };

            let Some(&(last_user, last_value)) = chunk.last() else {
                break;
            };

            for (user_id, total_value) in chunk {
                rank += 1;
                sqlx::query(&upsert_sql)
                    .bind(key.season.as_i64())
                    .bind(user_id)
                    .bind(total_value)
                    .bind(rank)
                    .bind(i64::from(tier_for_rank(rank, total).as_u8()))
                    .bind(now_ms)
                    .execute(&mut *tx)
                    .await?;
            }
            cursor = Some((last_value, last_user));
        }

        tx.commit().await?;
        Ok(rank as u64)
    }

    /// All ranking records of a season, best first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored tier is out of range.
    pub async fn season_rankings(
        &self,
        season: SeasonId,
    ) -> Result<Vec<RankingRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT season_id, user_id, total_value, rank, tier
            FROM season_rankings
            WHERE season_id = ?
            ORDER BY rank ASC, user_id ASC
            "#,
        )
        .bind(season.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(ranking_from_row).collect()
    }
}

fn ranking_from_row(row: &SqliteRow) -> Result<RankingRecord, sqlx::Error> {
    let raw_tier: i64 = row.get("tier");
    let tier = u8::try_from(raw_tier)
        .ok()
        .and_then(Tier::new)
        .ok_or_else(|| sqlx::Error::Decode(format!("tier out of range: {}", raw_tier).into()))?;

    Ok(RankingRecord {
        season: SeasonId::new(row.get("season_id")),
        participant: ParticipantId::new(row.get("user_id")),
        total_value: row.get("total_value"),
        rank: row.get("rank"),
        tier,
    })
}
