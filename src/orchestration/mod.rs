//! Sequencing of a ranking run: paging, valuation, staging, finalization, cleanup.

pub mod cursor;
pub mod finalize;
pub mod orchestrator;
pub mod staging;

pub use cursor::{Page, ParticipantCursor};
pub use finalize::Finalizer;
pub use orchestrator::{RankingOrchestrator, RunPhase, RunSettings, RunSummary};
pub use staging::StagingTable;

use crate::error::{RankingError, StoreOp};
use std::future::Future;

/// Await a store call under its per-operation timeout, tagging any failure.
pub(crate) async fn store_call<T, F>(operation: StoreOp, call: F) -> Result<T, RankingError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let limit = operation.timeout();
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(RankingError::Store { operation, source }),
        Err(_) => Err(RankingError::StoreTimeout { operation, limit }),
    }
}
