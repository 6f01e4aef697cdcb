//! Domain types for season ranking.
//!
//! This module provides:
//! - Typed identifiers: SeasonId, ParticipantId, AssetId
//! - Tier bucket type
//! - Exact decimal arithmetic via a rust_decimal wrapper
//! - Positions, price snapshots, staged valuations and ranking records

pub mod decimal;
pub mod position;
pub mod price;
pub mod primitives;
pub mod ranking;

pub use decimal::Decimal;
pub use position::Position;
pub use price::PriceSnapshot;
pub use primitives::{AssetId, ParticipantId, SeasonId, Tier};
pub use ranking::{RankingRecord, StagedValuation, StagingKey};
