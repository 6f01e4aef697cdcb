//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by concern:
//! - `catalog.rs` - Seasons and tradable assets
//! - `participants.rs` - Participant paging, cash, positions and orders
//! - `staging.rs` - Per-run staging table lifecycle and writes
//! - `rankings.rs` - Set-based finalization into `season_rankings` and reads

mod catalog;
mod participants;
mod rankings;
mod staging;

pub use staging::staging_table_name;

use sqlx::sqlite::SqlitePool;

/// Season status values stored in `seasons.status` and `orders.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Pending,
    Completed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "PENDING",
            RecordStatus::Completed => "COMPLETED",
        }
    }
}

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
