pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod prices;

pub use config::{Config, FinalizeStrategy, LogFormat};
pub use db::{init_db, Repository};
pub use domain::{
    AssetId, Decimal, ParticipantId, Position, PriceSnapshot, RankingRecord, SeasonId,
    StagedValuation, StagingKey, Tier,
};
pub use error::{AppError, RankingError};
pub use orchestration::{RankingOrchestrator, RunPhase, RunSettings, RunSummary};
pub use prices::{PriceSource, PriceSourceError, StaticPriceSource, UpbitPriceSource};
