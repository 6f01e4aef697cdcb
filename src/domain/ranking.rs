//! Staged valuations and durable ranking records.

use crate::domain::{ParticipantId, SeasonId, Tier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner of one staging table: the season being ranked and the run doing it.
///
/// Each run stages into its own table, so a late cleanup from an earlier run of
/// the same season can never touch the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StagingKey {
    pub season: SeasonId,
    pub run: Uuid,
}

impl StagingKey {
    pub fn new(season: SeasonId, run: Uuid) -> Self {
        Self { season, run }
    }
}

/// One participant's truncated total value, written to the staging table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedValuation {
    pub participant: ParticipantId,
    /// Total value in minor currency units.
    pub total_value: i64,
}

/// Finalized standing of a participant within a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRecord {
    pub season: SeasonId,
    pub participant: ParticipantId,
    pub total_value: i64,
    /// 1-based position; unique within a season.
    pub rank: i64,
    pub tier: Tier,
}
