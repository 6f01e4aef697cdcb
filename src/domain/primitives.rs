//! Domain primitives: SeasonId, ParticipantId, AssetId, Tier.

use serde::{Deserialize, Serialize};

/// Identifier of a competition season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeasonId(pub i64);

impl SeasonId {
    /// Create a SeasonId from its database key.
    pub fn new(id: i64) -> Self {
        SeasonId(id)
    }

    /// Get the underlying database key.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SeasonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a participant (a user row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub i64);

impl ParticipantId {
    /// Create a ParticipantId from its database key.
    pub fn new(id: i64) -> Self {
        ParticipantId(id)
    }

    /// Get the underlying database key.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a tradable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub i64);

impl AssetId {
    /// Create an AssetId from its database key.
    pub fn new(id: i64) -> Self {
        AssetId(id)
    }

    /// Get the underlying database key.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reward/display bucket derived from rank, 1 (lowest) to 7 (the winner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tier(u8);

impl Tier {
    pub const LOWEST: Tier = Tier(1);
    pub const CHAMPION: Tier = Tier(7);

    /// Create a Tier, returning None outside 1..=7.
    pub fn new(value: u8) -> Option<Self> {
        (Self::LOWEST.0..=Self::CHAMPION.0)
            .contains(&value)
            .then_some(Tier(value))
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
