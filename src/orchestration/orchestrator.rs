use crate::config::{Config, FinalizeStrategy, DEFAULT_BATCH_SIZE};
use crate::db::Repository;
use crate::domain::{PriceSnapshot, SeasonId, StagingKey};
use crate::engine::value_page;
use crate::error::{RankingError, StoreOp};
use crate::orchestration::{store_call, Finalizer, ParticipantCursor, StagingTable};
use crate::prices::PriceSource;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Pages between progress log lines.
const PROGRESS_EVERY_PAGES: u64 = 5;

/// Position of a run in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    CountingParticipants,
    Paging { offset: i64 },
    Finalizing,
    CleaningUp,
    Done,
    Aborted,
}

/// Knobs of a single run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub batch_size: i64,
    pub run_timeout: Duration,
    pub finalize_strategy: FinalizeStrategy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            run_timeout: Duration::from_secs(300),
            finalize_strategy: FinalizeStrategy::Window,
        }
    }
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            run_timeout: config.run_timeout,
            finalize_strategy: config.finalize_strategy,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub season: SeasonId,
    /// Participant count taken at the start of the run.
    pub participants: i64,
    pub pages: u64,
    pub staged: u64,
    pub finalized: u64,
    pub elapsed: Duration,
    pub missing_cash: usize,
    pub unpriced_positions: usize,
    pub price_feed_failed: bool,
    /// Phases visited, with consecutive pages collapsed into the last one read.
    pub phases: Vec<RunPhase>,
}

impl RunSummary {
    fn new(run_id: Uuid, season: SeasonId) -> Self {
        Self {
            run_id,
            season,
            participants: 0,
            pages: 0,
            staged: 0,
            finalized: 0,
            elapsed: Duration::ZERO,
            missing_cash: 0,
            unpriced_positions: 0,
            price_feed_failed: false,
            phases: vec![RunPhase::Idle],
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::debug!(from = ?self.phase(), to = ?phase, "Phase transition");
        if let (Some(RunPhase::Paging { .. }), RunPhase::Paging { .. }) =
            (self.phases.last(), phase)
        {
            self.phases.pop();
        }
        self.phases.push(phase);
    }

    pub fn phase(&self) -> RunPhase {
        self.phases.last().copied().unwrap_or(RunPhase::Idle)
    }
}

/// Computes and persists a season's rankings in bounded-size pages.
pub struct RankingOrchestrator {
    repo: Arc<Repository>,
    prices: Arc<dyn PriceSource>,
    settings: RunSettings,
}

impl RankingOrchestrator {
    pub fn new(repo: Arc<Repository>, prices: Arc<dyn PriceSource>, settings: RunSettings) -> Self {
        Self {
            repo,
            prices,
            settings,
        }
    }

    /// Run one full ranking pass for the season.
    ///
    /// Staging state never outlives the call. On error no ranking rows have been
    /// written, and re-running is safe.
    pub async fn run(&self, season: SeasonId) -> Result<RunSummary, RankingError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("ranking_run", run_id = %run_id, season = %season);
        self.run_inner(run_id, season).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, season: SeasonId) -> Result<RunSummary, RankingError> {
        let started = Instant::now();
        let deadline = started + self.settings.run_timeout;
        let mut summary = RunSummary::new(run_id, season);

        tracing::info!(batch_size = self.settings.batch_size, "Starting ranking run");

        let result = self.execute(season, deadline, &mut summary).await;
        summary.elapsed = started.elapsed();

        match result {
            Ok(()) => {
                summary.enter(RunPhase::Done);
                tracing::info!(
                    participants = summary.participants,
                    pages = summary.pages,
                    staged = summary.staged,
                    finalized = summary.finalized,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "Ranking run complete"
                );
                Ok(summary)
            }
            Err(e) => {
                let failed_in = summary.phase();
                summary.enter(RunPhase::Aborted);
                tracing::error!(
                    phase = ?failed_in,
                    error = %e,
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "Ranking run aborted"
                );
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        season: SeasonId,
        deadline: Instant,
        summary: &mut RunSummary,
    ) -> Result<(), RankingError> {
        summary.enter(RunPhase::CountingParticipants);
        let total = self
            .before_deadline(
                deadline,
                store_call(
                    StoreOp::CountParticipants,
                    self.repo.count_participants(season),
                ),
            )
            .await?;
        summary.participants = total;

        if total == 0 {
            tracing::info!("No participants in season, nothing to rank");
            return Ok(());
        }

        // The guard exists before any DDL, so a deadline that fires mid-creation
        // still drops the table.
        let staging = StagingTable::new(
            Arc::clone(&self.repo),
            StagingKey::new(season, summary.run_id),
        );

        let result = self
            .before_deadline(deadline, async {
                staging.prepare().await?;
                let prices = self.fetch_prices(&mut *summary).await?;
                self.stage_and_finalize(&staging, total, &prices, &mut *summary)
                    .await
            })
            .await;

        summary.enter(RunPhase::CleaningUp);
        staging.release().await;
        result
    }

    async fn fetch_prices(&self, summary: &mut RunSummary) -> Result<PriceSnapshot, RankingError> {
        match self.prices.fetch_prices().await {
            Ok(snapshot) => {
                tracing::info!(assets = snapshot.len(), "Fetched price snapshot");
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Price feed failed, valuing all positions at zero");
                summary.price_feed_failed = true;
                Ok(PriceSnapshot::empty())
            }
        }
    }

    async fn stage_and_finalize(
        &self,
        staging: &StagingTable,
        total: i64,
        prices: &PriceSnapshot,
        summary: &mut RunSummary,
    ) -> Result<(), RankingError> {
        let season = staging.season();
        let mut cursor =
            ParticipantCursor::new(&self.repo, season, self.settings.batch_size, total);

        summary.enter(RunPhase::Paging { offset: 0 });
        while let Some(page) = cursor.next_page().await? {
            let offset = page.offset;
            summary.enter(RunPhase::Paging { offset });

            let (cash, positions) = tokio::try_join!(
                store_call(
                    StoreOp::FetchCash { offset },
                    self.repo.fetch_cash(&page.participants)
                ),
                store_call(
                    StoreOp::FetchPositions { offset },
                    self.repo.fetch_positions(&page.participants)
                ),
            )?;

            let valued = value_page(&page.participants, &cash, &positions, prices)?;
            if valued.missing_cash > 0 {
                tracing::warn!(
                    offset,
                    missing = valued.missing_cash,
                    "Participants without a cash row, valued with zero cash"
                );
            }
            summary.missing_cash += valued.missing_cash;
            summary.unpriced_positions += valued.unpriced_positions;

            summary.staged += staging.stage(offset, &valued.rows).await?;
            summary.pages += 1;

            if summary.pages % PROGRESS_EVERY_PAGES == 0 {
                let processed = (offset + page.participants.len() as i64).min(total);
                tracing::info!(processed, total, "Ranking progress");
            }
        }

        if summary.staged == 0 {
            return Err(RankingError::Invariant(format!(
                "counted {} participants but staged none",
                total
            )));
        }
        if summary.unpriced_positions > 0 {
            tracing::warn!(
                unpriced = summary.unpriced_positions,
                "Positions without a price contributed zero"
            );
        }

        summary.enter(RunPhase::Finalizing);
        let finalizer = Finalizer::new(
            Arc::clone(&self.repo),
            self.settings.finalize_strategy,
            self.settings.batch_size,
        );
        summary.finalized = finalizer.finalize(staging).await?;

        Ok(())
    }

    async fn before_deadline<T, F>(&self, deadline: Instant, fut: F) -> Result<T, RankingError>
    where
        F: Future<Output = Result<T, RankingError>>,
    {
        tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| RankingError::DeadlineExceeded(self.settings.run_timeout))?
    }
}
