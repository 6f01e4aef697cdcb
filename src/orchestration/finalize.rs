//! Turning a fully staged season into durable ranking records.

use crate::config::FinalizeStrategy;
use crate::db::Repository;
use crate::error::{RankingError, StoreOp};
use crate::orchestration::store_call;
use crate::orchestration::StagingTable;
use std::sync::Arc;

pub struct Finalizer {
    repo: Arc<Repository>,
    strategy: FinalizeStrategy,
    chunk_size: i64,
}

impl Finalizer {
    /// `chunk_size` bounds the rows held in memory by the streaming strategy.
    pub fn new(repo: Arc<Repository>, strategy: FinalizeStrategy, chunk_size: i64) -> Self {
        Self {
            repo,
            strategy,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Rank every staged row and upsert the results in one transaction.
    ///
    /// Returns the number of ranking rows written. An empty staging table writes
    /// nothing.
    pub async fn finalize(&self, staging: &StagingTable) -> Result<u64, RankingError> {
        let season = staging.season();
        let key = staging.key();
        let staged = staging.count().await?;
        if staged == 0 {
            tracing::info!(season = %season, "Nothing staged, skipping finalization");
            return Ok(0);
        }

        let written = match self.strategy {
            FinalizeStrategy::Window => {
                store_call(
                    StoreOp::Finalize,
                    self.repo.finalize_rankings_windowed(key),
                )
                .await?
            }
            FinalizeStrategy::Streaming => {
                store_call(
                    StoreOp::Finalize,
                    self.repo
                        .finalize_rankings_streaming(key, self.chunk_size),
                )
                .await?
            }
        };

        if written != staged as u64 {
            tracing::warn!(
                season = %season,
                staged,
                written,
                "Finalized row count differs from staged row count"
            );
        }

        tracing::info!(
            season = %season,
            written,
            strategy = ?self.strategy,
            "Rankings finalized"
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::db::repo::RecordStatus;
    use crate::domain::{SeasonId, StagedValuation, StagingKey};
    use uuid::Uuid;

    async fn staged_season(
        repo: &Arc<Repository>,
        values: &[i64],
    ) -> (SeasonId, StagingTable) {
        let season = repo
            .create_season("Season 1", RecordStatus::Pending)
            .await
            .unwrap();
        let mut rows = Vec::new();
        for &total_value in values {
            let participant = repo.create_participant(0).await.unwrap();
            rows.push(StagedValuation {
                participant,
                total_value,
            });
        }
        let staging = StagingTable::create(repo.clone(), StagingKey::new(season, Uuid::new_v4()))
            .await
            .unwrap();
        staging.stage(0, &rows).await.unwrap();
        (season, staging)
    }

    #[tokio::test]
    async fn test_strategies_agree() {
        let values = [500, 900, 100, 900, 0, 250, 250, 7];

        let (window_repo, _t1) = setup_test_db().await;
        let window_repo = Arc::new(window_repo);
        let (season, staging) = staged_season(&window_repo, &values).await;
        let written = Finalizer::new(window_repo.clone(), FinalizeStrategy::Window, 3)
            .finalize(&staging)
            .await
            .unwrap();
        assert_eq!(written, values.len() as u64);
        staging.release().await;
        let windowed = window_repo.season_rankings(season).await.unwrap();

        let (stream_repo, _t2) = setup_test_db().await;
        let stream_repo = Arc::new(stream_repo);
        let (season, staging) = staged_season(&stream_repo, &values).await;
        Finalizer::new(stream_repo.clone(), FinalizeStrategy::Streaming, 3)
            .finalize(&staging)
            .await
            .unwrap();
        staging.release().await;
        let streamed = stream_repo.season_rankings(season).await.unwrap();

        assert_eq!(windowed, streamed);
    }

    #[tokio::test]
    async fn test_empty_staging_writes_nothing() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let (season, staging) = staged_season(&repo, &[]).await;

        let written = Finalizer::new(repo.clone(), FinalizeStrategy::Window, 100)
            .finalize(&staging)
            .await
            .unwrap();
        assert_eq!(written, 0);
        staging.release().await;
        assert!(repo.season_rankings(season).await.unwrap().is_empty());
    }
}
