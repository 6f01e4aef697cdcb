//! Season and asset catalog operations for the repository.

use crate::domain::{AssetId, SeasonId};
use sqlx::Row;
use std::collections::HashMap;

use super::{RecordStatus, Repository};

impl Repository {
    /// The season currently in progress (status `PENDING`), if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn current_season(&self) -> Result<Option<SeasonId>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id
            FROM seasons
            WHERE status = 'PENDING'
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SeasonId::new(r.get("id"))))
    }

    /// Market code to asset id for every asset that is not deleted.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn active_asset_symbols(&self) -> Result<HashMap<String, AssetId>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, symbol
            FROM assets
            WHERE is_deleted = 0
            ORDER BY symbol ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<String, _>("symbol"), AssetId::new(row.get("id"))))
            .collect())
    }

    /// Insert a season and return its id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn create_season(
        &self,
        name: &str,
        status: RecordStatus,
    ) -> Result<SeasonId, sqlx::Error> {
        let result = sqlx::query("INSERT INTO seasons (name, status) VALUES (?, ?)")
            .bind(name)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(SeasonId::new(result.last_insert_rowid()))
    }

    /// Insert an asset by market code and return its id.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including a duplicate symbol).
    pub async fn create_asset(&self, symbol: &str) -> Result<AssetId, sqlx::Error> {
        let result = sqlx::query("INSERT INTO assets (symbol) VALUES (?)")
            .bind(symbol)
            .execute(&self.pool)
            .await?;

        Ok(AssetId::new(result.last_insert_rowid()))
    }

    /// Mark an asset as delisted so it drops out of the symbol map.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn delist_asset(&self, asset: AssetId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE assets SET is_deleted = 1 WHERE id = ?")
            .bind(asset.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
