//! Lifecycle of the per-run staging table.
//!
//! The table is created empty at the start of a run and must be gone when the run
//! ends, whatever the outcome. `release` is the normal path; dropping an unreleased
//! guard schedules a best-effort drop on the current runtime.
//!
//! The guard exists before any DDL runs, so a run cancelled while its table is
//! being created still cleans up after itself.

use crate::db::Repository;
use crate::domain::{SeasonId, StagedValuation, StagingKey};
use crate::error::{RankingError, StoreOp};
use crate::orchestration::store_call;
use std::sync::Arc;

pub struct StagingTable {
    repo: Arc<Repository>,
    key: StagingKey,
    released: bool,
}

impl StagingTable {
    /// Guard for the run's staging table. Does no I/O; call [`prepare`](Self::prepare)
    /// before staging rows.
    pub fn new(repo: Arc<Repository>, key: StagingKey) -> Self {
        Self {
            repo,
            key,
            released: false,
        }
    }

    /// Guard plus an empty staging table, in one step.
    ///
    /// On failure the partial table is dropped before the error is returned.
    pub async fn create(repo: Arc<Repository>, key: StagingKey) -> Result<Self, RankingError> {
        let staging = Self::new(repo, key);
        match staging.prepare().await {
            Ok(()) => Ok(staging),
            Err(e) => {
                staging.release().await;
                Err(e)
            }
        }
    }

    /// Remove tables left by earlier runs of the season and create this run's.
    pub async fn prepare(&self) -> Result<(), RankingError> {
        let season = self.key.season;
        let leftovers = store_call(
            StoreOp::ResetStaging,
            self.repo.drop_leftover_staging(season),
        )
        .await?;
        if !leftovers.is_empty() {
            tracing::warn!(
                season = %season,
                tables = ?leftovers,
                "Dropped leftover staging tables from earlier runs"
            );
        }

        store_call(StoreOp::ResetStaging, self.repo.reset_staging(self.key)).await?;
        tracing::debug!(season = %season, run_id = %self.key.run, "Staging table ready");
        Ok(())
    }

    pub fn key(&self) -> StagingKey {
        self.key
    }

    pub fn season(&self) -> SeasonId {
        self.key.season
    }

    /// Append one page of valuations; the page is written atomically.
    pub async fn stage(&self, offset: i64, rows: &[StagedValuation]) -> Result<u64, RankingError> {
        store_call(
            StoreOp::Stage { offset },
            self.repo.stage_valuations(self.key, rows),
        )
        .await
    }

    pub async fn count(&self) -> Result<i64, RankingError> {
        store_call(StoreOp::CountStaged, self.repo.count_staged(self.key)).await
    }

    /// Drop the table. Failures are logged, never returned, so they cannot mask
    /// the outcome of the run.
    pub async fn release(mut self) {
        self.released = true;
        let season = self.key.season;
        match store_call(StoreOp::DropStaging, self.repo.drop_staging(self.key)).await {
            Ok(()) => tracing::debug!(season = %season, "Staging table dropped"),
            Err(e) => tracing::error!(
                season = %season,
                error = %e,
                "Failed to drop staging table"
            ),
        }
    }
}

impl Drop for StagingTable {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let repo = Arc::clone(&self.repo);
        let key = self.key;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(season = %key.season, "Staging table not released, dropping in background");
                handle.spawn(async move {
                    if let Err(e) = store_call(StoreOp::DropStaging, repo.drop_staging(key)).await
                    {
                        tracing::error!(
                            season = %key.season,
                            error = %e,
                            "Background staging drop failed"
                        );
                    }
                });
            }
            Err(_) => tracing::error!(
                season = %key.season,
                "Staging table not released and no runtime available to drop it"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::ParticipantId;
    use std::task::Poll;
    use std::time::Duration;
    use uuid::Uuid;

    fn row(id: i64, value: i64) -> StagedValuation {
        StagedValuation {
            participant: ParticipantId::new(id),
            total_value: value,
        }
    }

    fn key(season: SeasonId) -> StagingKey {
        StagingKey::new(season, Uuid::new_v4())
    }

    async fn wait_until_gone(repo: &Repository, season: SeasonId) -> bool {
        for _ in 0..50 {
            if !repo.staging_exists(season).await.unwrap() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_create_stage_release() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let season = SeasonId::new(1);
        let key = key(season);

        let staging = StagingTable::create(repo.clone(), key).await.unwrap();
        assert_eq!(staging.season(), season);
        assert_eq!(staging.key(), key);
        assert_eq!(staging.stage(0, &[row(1, 10), row(2, 20)]).await.unwrap(), 2);
        assert_eq!(staging.count().await.unwrap(), 2);

        staging.release().await;
        assert!(!repo.staging_exists(season).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_drops_leftover_tables() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let season = SeasonId::new(1);

        let stale = key(season);
        repo.reset_staging(stale).await.unwrap();
        repo.stage_valuations(stale, &[row(9, 99)]).await.unwrap();

        let staging = StagingTable::create(repo.clone(), key(season)).await.unwrap();
        assert_eq!(staging.count().await.unwrap(), 0);
        assert_eq!(repo.staging_tables(season).await.unwrap().len(), 1);
        assert!(repo.count_staged(stale).await.is_err());
        staging.release().await;
    }

    #[tokio::test]
    async fn test_failed_page_reports_offset() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let staging = StagingTable::create(repo, key(SeasonId::new(1)))
            .await
            .unwrap();

        staging.stage(0, &[row(1, 10)]).await.unwrap();
        let err = staging.stage(1000, &[row(1, 11)]).await.unwrap_err();
        assert!(matches!(
            err,
            RankingError::Store {
                operation: StoreOp::Stage { offset: 1000 },
                ..
            }
        ));
        assert_eq!(staging.count().await.unwrap(), 1);
        staging.release().await;
    }

    #[tokio::test]
    async fn test_unreleased_guard_drops_in_background() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let season = SeasonId::new(3);

        {
            let _staging = StagingTable::create(repo.clone(), key(season)).await.unwrap();
        }

        assert!(
            wait_until_gone(&repo, season).await,
            "staging table should be dropped by the guard"
        );
    }

    #[tokio::test]
    async fn test_unprepared_guard_drop_is_harmless() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let season = SeasonId::new(3);

        drop(StagingTable::new(repo.clone(), key(season)));
        StagingTable::new(repo.clone(), key(season)).release().await;

        assert!(wait_until_gone(&repo, season).await);
    }

    #[tokio::test]
    async fn test_create_cancelled_after_table_committed_leaves_nothing() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let season = SeasonId::new(4);

        // Poll `create` by hand and abandon it as soon as its table is visible while
        // the future is still pending. Retry until that window is observed.
        let mut cancelled = false;
        for _ in 0..200 {
            let mut create = Box::pin(StagingTable::create(repo.clone(), key(season)));
            let finished = loop {
                if let Poll::Ready(result) = futures::poll!(create.as_mut()) {
                    break Some(result);
                }
                if repo.staging_exists(season).await.unwrap() {
                    break None;
                }
                tokio::task::yield_now().await;
            };
            drop(create);

            match finished {
                Some(result) => result.unwrap().release().await,
                None => cancelled = true,
            }
            assert!(
                wait_until_gone(&repo, season).await,
                "staging table leaked after cancelled create"
            );
            if cancelled {
                break;
            }
        }
        assert!(cancelled, "never observed a committed table under a pending create");
    }

    #[tokio::test]
    async fn test_late_drop_from_earlier_run_spares_next_run() {
        let (repo, _temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let season = SeasonId::new(6);

        let earlier = key(season);
        StagingTable::create(repo.clone(), earlier)
            .await
            .unwrap()
            .release()
            .await;

        let current = StagingTable::create(repo.clone(), key(season)).await.unwrap();
        // Background cleanup of the earlier run lands after the current reset.
        repo.drop_staging(earlier).await.unwrap();

        assert_eq!(current.stage(0, &[row(1, 10)]).await.unwrap(), 1);
        assert_eq!(current.count().await.unwrap(), 1);
        current.release().await;
    }
}
