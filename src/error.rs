use crate::config::ConfigError;
use crate::engine::ValuationError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Store call made during a ranking run, with the page offset where relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    CountParticipants,
    PageParticipants { offset: i64 },
    FetchCash { offset: i64 },
    FetchPositions { offset: i64 },
    ResetStaging,
    Stage { offset: i64 },
    CountStaged,
    Finalize,
    DropStaging,
}

impl StoreOp {
    /// Upper bound for a single call of this kind.
    pub fn timeout(&self) -> Duration {
        match self {
            StoreOp::Stage { .. } => Duration::from_secs(30),
            StoreOp::Finalize => Duration::from_secs(60),
            StoreOp::DropStaging => Duration::from_secs(5),
            _ => Duration::from_secs(10),
        }
    }
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::CountParticipants => write!(f, "count participants"),
            StoreOp::PageParticipants { offset } => write!(f, "page participants (offset {})", offset),
            StoreOp::FetchCash { offset } => write!(f, "fetch cash (offset {})", offset),
            StoreOp::FetchPositions { offset } => write!(f, "fetch positions (offset {})", offset),
            StoreOp::ResetStaging => write!(f, "reset staging table"),
            StoreOp::Stage { offset } => write!(f, "stage valuations (offset {})", offset),
            StoreOp::CountStaged => write!(f, "count staged rows"),
            StoreOp::Finalize => write!(f, "finalize rankings"),
            StoreOp::DropStaging => write!(f, "drop staging table"),
        }
    }
}

/// Failure of a ranking run. Every variant aborts the run; none is retried.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("{operation} failed: {source}")]
    Store {
        operation: StoreOp,
        #[source]
        source: sqlx::Error,
    },
    #[error("{operation} timed out after {limit:?}")]
    StoreTimeout { operation: StoreOp, limit: Duration },
    #[error(transparent)]
    Valuation(#[from] ValuationError),
    #[error("Invariant violated: {0}")]
    Invariant(String),
    #[error("Ranking run exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// Top-level error of the ranking binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("No season is currently in progress")]
    NoActiveSeason,
    #[error("Ranking failed: {0}")]
    Ranking(#[from] RankingError),
}
