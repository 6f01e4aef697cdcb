//! Participant paging, cash and position reads for the repository.
//!
//! A participant of a season is a user with at least one `COMPLETED` order in it.

use crate::domain::{AssetId, Decimal, ParticipantId, Position, SeasonId};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::collections::HashMap;
use tracing::warn;

use super::{RecordStatus, Repository};

impl Repository {
    /// Number of distinct participants in a season.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn count_participants(&self, season: SeasonId) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(DISTINCT user_id) AS participants
            FROM orders
            WHERE season_id = ? AND status = 'COMPLETED'
            "#,
        )
        .bind(season.as_i64())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("participants"))
    }

    /// One page of participant ids, ascending, starting at `offset`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn page_participants(
        &self,
        season: SeasonId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ParticipantId>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT user_id
            FROM orders
            WHERE season_id = ? AND status = 'COMPLETED'
            ORDER BY user_id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(season.as_i64())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ParticipantId::new(row.get("user_id")))
            .collect())
    }

    /// Cash balances for the given participants.
    ///
    /// Participants without a user row are absent from the result.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn fetch_cash(
        &self,
        participants: &[ParticipantId],
    ) -> Result<HashMap<ParticipantId, i64>, sqlx::Error> {
        if participants.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id, cash FROM users WHERE id IN (");
        push_id_list(&mut query, participants);

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(|row| (ParticipantId::new(row.get("id")), row.get("cash")))
            .collect())
    }

    /// Held positions for the given participants, grouped by participant.
    ///
    /// A quantity that does not parse is logged and treated as zero.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn fetch_positions(
        &self,
        participants: &[ParticipantId],
    ) -> Result<HashMap<ParticipantId, Vec<Position>>, sqlx::Error> {
        if participants.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT user_id, asset_id, quantity FROM user_assets WHERE user_id IN (",
        );
        push_id_list(&mut query, participants);

        let rows = query.build().fetch_all(&self.pool).await?;

        let mut positions: HashMap<ParticipantId, Vec<Position>> = HashMap::new();
        for row in &rows {
            let participant = ParticipantId::new(row.get("user_id"));
            let asset = AssetId::new(row.get("asset_id"));
            let quantity_str: String = row.get("quantity");

            let quantity = Decimal::from_str_canonical(&quantity_str).unwrap_or_else(|e| {
                warn!(
                    participant = %participant,
                    asset = %asset,
                    quantity = %quantity_str,
                    error = %e,
                    "Failed to parse position quantity, using zero"
                );
                Decimal::zero()
            });

            positions
                .entry(participant)
                .or_default()
                .push(Position::new(participant, asset, quantity));
        }

        Ok(positions)
    }

    /// Insert a user with the given cash balance.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn create_participant(&self, cash: i64) -> Result<ParticipantId, sqlx::Error> {
        let result = sqlx::query("INSERT INTO users (cash) VALUES (?)")
            .bind(cash)
            .execute(&self.pool)
            .await?;

        Ok(ParticipantId::new(result.last_insert_rowid()))
    }

    /// Overwrite a participant's cash balance.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn set_cash(&self, participant: ParticipantId, cash: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET cash = ? WHERE id = ?")
            .bind(cash)
            .bind(participant.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a held quantity of an asset.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn add_position(&self, position: &Position) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO user_assets (user_id, asset_id, quantity) VALUES (?, ?, ?)")
            .bind(position.participant.as_i64())
            .bind(position.asset.as_i64())
            .bind(position.quantity.to_canonical_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record an order; `COMPLETED` orders make the user a season participant.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn record_order(
        &self,
        participant: ParticipantId,
        season: SeasonId,
        asset: AssetId,
        status: RecordStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO orders (user_id, season_id, asset_id, status) VALUES (?, ?, ?, ?)")
            .bind(participant.as_i64())
            .bind(season.as_i64())
            .bind(asset.as_i64())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Append `?, ?, ...)` binding every id, closing the `IN (` list.
fn push_id_list(query: &mut QueryBuilder<'_, Sqlite>, ids: &[ParticipantId]) {
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.as_i64());
    }
    separated.push_unseparated(")");
}
